use std::{fmt, time::Duration};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use haiku_model::RequestId;

/// Execution context of one inbound call.
///
/// Carries the correlation id together with the caller's cancellation signal
/// and optional deadline. Clones share cancellation; [`CallContext::with_request_id`]
/// derives a context that differs only in its id.
#[derive(Clone)]
pub struct CallContext {
    request_id: RequestId,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Context with no id, no deadline and its own cancellation.
    pub fn background() -> Self {
        Self::new(RequestId::empty())
    }

    /// Correlation id of this call; empty when none was assigned.
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Derived context with another id, sharing cancellation and deadline.
    pub fn with_request_id(&self, request_id: RequestId) -> Self {
        Self {
            request_id,
            cancel: self.cancel.clone(),
            deadline: self.deadline,
        }
    }

    /// Bind cancellation to an externally owned token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Apply a caller deadline `timeout` from now. An earlier existing deadline wins.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves once the call is canceled or its deadline passes.
    pub async fn cancelled(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.cancel.cancelled().await,
        }
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("request_id", &self.request_id.as_str())
            .field("cancelled", &self.cancel.is_cancelled())
            .field("deadline", &self.deadline)
            .finish()
    }
}
