pub mod control;
pub mod deploy;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod progress;
pub mod provision;
pub mod request;
pub mod upload;

pub use control::{ControlPlane, ControlPlaneError, CreateResource, Subscription, WatchFeed};
pub use deploy::{DeployConfig, DeployEvent, Deployer};
pub use error::CoreError;
pub use metrics::{DeployResult, MetricsBackend, MetricsHandle, NoOpMetrics, noop_metrics};
pub use progress::{ChannelSink, LogSink, Observation, ProgressSink, ProgressTracker, SinkClosed};
pub use provision::Provisioner;
pub use request::{CallContext, IdGenerator, REQUEST_ID_HEADER, UlidGenerator, resolve_request_id};
pub use upload::{MAX_UPLOAD_TTL, ObjectStore, ObjectStoreError, UploadConfig, UploadIssuer};

pub mod prelude {
    pub use crate::control::{ControlPlane, Subscription};
    pub use crate::deploy::{DeployEvent, Deployer};
    pub use crate::error::CoreError;
    pub use crate::provision::Provisioner;
    pub use crate::request::CallContext;
    pub use crate::upload::UploadIssuer;
}
