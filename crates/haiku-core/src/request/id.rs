use ulid::Ulid;

use haiku_model::RequestId;

/// Source of fresh correlation ids.
///
/// Implementations are shared by all concurrent calls and must not need a lock.
pub trait IdGenerator: Send + Sync + 'static {
    fn generate(&self) -> RequestId;
}

impl<F> IdGenerator for F
where
    F: Fn() -> String + Send + Sync + 'static,
{
    fn generate(&self) -> RequestId {
        RequestId::from(self())
    }
}

/// Default generator: ULIDs are time-sortable and carry 80 random bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct UlidGenerator;

impl IdGenerator for UlidGenerator {
    fn generate(&self) -> RequestId {
        RequestId::from(Ulid::new().to_string())
    }
}

/// Reuse the inbound id when it is present and non-empty, otherwise mint one.
pub fn resolve_request_id(incoming: Option<&str>, generator: &dyn IdGenerator) -> RequestId {
    match incoming {
        Some(id) if !id.is_empty() => RequestId::from(id),
        _ => generator.generate(),
    }
}
