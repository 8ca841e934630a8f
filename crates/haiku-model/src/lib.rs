mod domain;
pub use domain::{
    LABEL_ENVIRONMENT, LABEL_MANAGED_BY, LABEL_SERVICE, Labels, MANAGED_BY, RequestId,
    ResourceId, ResourceKind, sanitize_segment,
};

mod error;
pub use error::{ModelError, ModelResult};

mod deploy;
pub use deploy::{CredentialSpec, DeployOutcome, DeploySpec, ServiceSource};

mod watch;
pub use watch::{
    Condition, ConditionStatus, ObjectMeta, ResourceSnapshot, ResourceStatus, ResultEntry,
    SUCCEEDED_CONDITION, URL_RESULT, WatchEvent, WatchEventKind, WatchFailure,
};

mod progress;
pub use progress::{FILLER_MESSAGE, ProgressUpdate, STAGES, Stage};

mod upload;
pub use upload::{UploadKey, UploadUrl};
