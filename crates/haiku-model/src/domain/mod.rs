mod labels;
pub use labels::Labels;

mod constants;
pub use constants::{LABEL_ENVIRONMENT, LABEL_MANAGED_BY, LABEL_SERVICE, MANAGED_BY};

mod names;
pub use names::sanitize_segment;

mod request_id;
pub use request_id::RequestId;

mod resource;
pub use resource::{ResourceId, ResourceKind};
