//! gRPC surface of haiku.
//!
//! [`CliApiService`] implements the generated `CliService` trait on top of an
//! [`ApiHandler`]. [`RequestIdInterceptor`] must wrap the service so that every
//! call carries a [`haiku_core::CallContext`].
pub mod proto {
    tonic::include_proto!("haiku.v1");
}

mod adapter;
mod convert;
mod error;
mod grpc;
mod handler;
mod request_id;

pub use adapter::CoreApiAdapter;
pub use error::ApiError;
pub use grpc::CliApiService;
pub use handler::ApiHandler;
pub use proto::cli_service_server::CliServiceServer;
pub use request_id::{RequestIdInterceptor, call_context, parse_grpc_timeout};
