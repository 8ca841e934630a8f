use std::{sync::Arc, time::Duration};

use tonic::{
    Request, Response, Status,
    metadata::{MetadataMap, MetadataValue},
    service::Interceptor,
};

use tokio_util::sync::CancellationToken;

use haiku_core::{CallContext, IdGenerator, REQUEST_ID_HEADER, UlidGenerator, resolve_request_id};
use haiku_model::RequestId;

const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

/// Resolves the correlation id of every inbound call and stores a
/// [`CallContext`] in the request extensions before the handler runs.
#[derive(Clone)]
pub struct RequestIdInterceptor {
    generator: Arc<dyn IdGenerator>,
    shutdown: Option<CancellationToken>,
}

impl RequestIdInterceptor {
    pub fn new(generator: Arc<dyn IdGenerator>) -> Self {
        Self {
            generator,
            shutdown: None,
        }
    }

    /// Cancel every in-flight call once `shutdown` is cancelled.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = Some(shutdown);
        self
    }
}

impl Default for RequestIdInterceptor {
    fn default() -> Self {
        Self::new(Arc::new(UlidGenerator))
    }
}

impl Interceptor for RequestIdInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let mut ctx = context_from_metadata(request.metadata(), self.generator.as_ref());
        if let Some(shutdown) = &self.shutdown {
            ctx = ctx.with_cancellation(shutdown.child_token());
        }
        request.extensions_mut().insert(ctx);
        Ok(request)
    }
}

fn context_from_metadata(metadata: &MetadataMap, generator: &dyn IdGenerator) -> CallContext {
    let incoming = metadata
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok());
    let ctx = CallContext::new(resolve_request_id(incoming, generator));

    match metadata
        .get(GRPC_TIMEOUT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_grpc_timeout)
    {
        Some(timeout) => ctx.with_timeout(timeout),
        None => ctx,
    }
}

/// Context stored by [`RequestIdInterceptor`]; resolved on the spot when the
/// interceptor is not installed.
pub fn call_context<T>(request: &Request<T>) -> CallContext {
    request
        .extensions()
        .get::<CallContext>()
        .cloned()
        .unwrap_or_else(|| context_from_metadata(request.metadata(), &UlidGenerator))
}

/// Parse a `grpc-timeout` header value: up to 8 digits and a unit letter.
pub fn parse_grpc_timeout(raw: &str) -> Option<Duration> {
    if raw.len() < 2 || raw.len() > 9 {
        return None;
    }
    let (digits, unit) = raw.split_at(raw.len() - 1);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u64 = digits.parse().ok()?;
    Some(match unit {
        "H" => Duration::from_secs(value * 3600),
        "M" => Duration::from_secs(value * 60),
        "S" => Duration::from_secs(value),
        "m" => Duration::from_millis(value),
        "u" => Duration::from_micros(value),
        "n" => Duration::from_nanos(value),
        _ => return None,
    })
}

fn request_id_value(id: &RequestId) -> Option<MetadataValue<tonic::metadata::Ascii>> {
    if id.is_empty() {
        return None;
    }
    id.as_str().parse().ok()
}

/// Attach the correlation id to a successful response.
pub(crate) fn stamp_response<T>(mut response: Response<T>, id: &RequestId) -> Response<T> {
    if let Some(value) = request_id_value(id) {
        response.metadata_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Attach the correlation id to an error status.
pub(crate) fn stamp_status(mut status: Status, id: &RequestId) -> Status {
    if let Some(value) = request_id_value(id) {
        status.metadata_mut().insert(REQUEST_ID_HEADER, value);
    }
    status
}
