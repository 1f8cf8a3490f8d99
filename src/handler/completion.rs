//! Single-shot completion and the invocation adapter.
//!
//! # Responsibilities
//! - Turn the handler's completion callback into one awaited result
//! - Accept completion before or after `Handler::call` returns
//! - Honor only the first resolution; later ones are no-ops
//! - Detect handlers that drop their completion without resolving

use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;

use crate::event::{InvocationContext, InvocationEvent};
use crate::handler::{HandlerError, HandlerRef, InvocationResult};

#[derive(Debug)]
enum Resolution {
    Success(InvocationResult),
    Failure(HandlerError),
    Threw(HandlerError),
    Panicked(String),
}

/// The completion callback handed to a handler.
///
/// Cloneable so it can be moved into background work; all clones share one
/// slot, and only the first `succeed`/`fail` across them takes effect.
#[derive(Debug, Clone)]
pub struct Completion {
    slot: Arc<Mutex<Option<oneshot::Sender<Resolution>>>>,
}

impl Completion {
    fn channel() -> (Self, oneshot::Receiver<Resolution>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                slot: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// Complete with a result. Returns `false` if already resolved.
    pub fn succeed(&self, result: InvocationResult) -> bool {
        self.resolve(Resolution::Success(result))
    }

    /// Complete with an error. Returns `false` if already resolved.
    pub fn fail(&self, error: HandlerError) -> bool {
        self.resolve(Resolution::Failure(error))
    }

    /// Whether some clone of this completion has already been resolved.
    pub fn is_resolved(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn resolve(&self, resolution: Resolution) -> bool {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match sender {
            // The receiver may be gone if the adapter already gave up; the
            // call still counts as the first resolution.
            Some(tx) => {
                let _ = tx.send(resolution);
                true
            }
            None => {
                tracing::debug!(?resolution, "Ignoring repeated handler completion");
                false
            }
        }
    }
}

/// Why an invocation produced no usable result.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InvocationError {
    /// The handler returned an error from `call` before completing.
    #[error("handler threw: {0}")]
    Threw(HandlerError),

    /// The handler reported failure through its completion.
    #[error("handler failed: {0}")]
    Failed(HandlerError),

    #[error("handler panicked: {0}")]
    Panicked(String),

    /// Every completion was dropped without being resolved.
    #[error("handler returned without completing the invocation")]
    Abandoned,

    /// The result could not be mapped onto an HTTP response.
    #[error("handler returned a malformed result: {0}")]
    MalformedResult(String),
}

impl InvocationError {
    /// Descriptive text for the diagnostic page.
    pub fn trace_text(&self) -> String {
        match self {
            InvocationError::Threw(e) | InvocationError::Failed(e) => e.trace_text().to_string(),
            other => other.to_string(),
        }
    }
}

/// Invoke `handler` once and wait for its first resolution.
pub async fn invoke(
    handler: HandlerRef,
    event: InvocationEvent,
    context: InvocationContext,
) -> Result<InvocationResult, InvocationError> {
    let (done, rx) = Completion::channel();
    let handler_done = done.clone();

    let returned = tokio::task::spawn_blocking(move || handler.call(event, context, handler_done)).await;

    match returned {
        Ok(Ok(())) => {}
        Ok(Err(thrown)) => {
            if !done.resolve(Resolution::Threw(thrown)) {
                tracing::debug!("Handler error raised after completion was ignored");
            }
        }
        Err(join_error) => {
            let message = match join_error.try_into_panic() {
                Ok(payload) => panic_message(payload),
                Err(e) => e.to_string(),
            };
            done.resolve(Resolution::Panicked(message));
        }
    }
    // Only the handler's own clones keep the slot alive from here on.
    drop(done);

    match rx.await {
        Ok(Resolution::Success(result)) => Ok(result),
        Ok(Resolution::Failure(e)) => Err(InvocationError::Failed(e)),
        Ok(Resolution::Threw(e)) => Err(InvocationError::Threw(e)),
        Ok(Resolution::Panicked(msg)) => Err(InvocationError::Panicked(msg)),
        Err(_) => Err(InvocationError::Abandoned),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FunctionConfig;
    use crate::event::to_invocation_context;
    use crate::handler::handler_fn;
    use std::time::Duration;

    fn inputs() -> (InvocationEvent, InvocationContext) {
        (
            InvocationEvent::literal("/"),
            to_invocation_context(&FunctionConfig::default()),
        )
    }

    #[tokio::test]
    async fn test_synchronous_completion() {
        let handler = handler_fn(|event, _ctx, done| {
            done.succeed(InvocationResult::ok(format!("path={}", event.path)));
            Ok(())
        });
        let (event, ctx) = inputs();
        let result = invoke(handler, event, ctx).await.unwrap();
        assert_eq!(result.body.as_deref(), Some("path=/"));
    }

    #[tokio::test]
    async fn test_asynchronous_completion() {
        let handler = handler_fn(|_event, _ctx, done| {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                done.succeed(InvocationResult::ok("later"));
            });
            Ok(())
        });
        let (event, ctx) = inputs();
        let result = invoke(handler, event, ctx).await.unwrap();
        assert_eq!(result.body.as_deref(), Some("later"));
    }

    #[tokio::test]
    async fn test_first_resolution_wins() {
        let handler = handler_fn(|_event, _ctx, done| {
            assert!(done.succeed(InvocationResult::ok("first")));
            assert!(!done.fail(HandlerError::new("second")));
            assert!(done.is_resolved());
            Ok(())
        });
        let (event, ctx) = inputs();
        let result = invoke(handler, event, ctx).await.unwrap();
        assert_eq!(result.body.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_failure_then_success_keeps_failure() {
        let handler = handler_fn(|_event, _ctx, done| {
            done.fail(HandlerError::new("boom"));
            done.succeed(InvocationResult::ok("too late"));
            Ok(())
        });
        let (event, ctx) = inputs();
        match invoke(handler, event, ctx).await {
            Err(InvocationError::Failed(e)) => assert_eq!(e.message, "boom"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_throw_is_a_failure() {
        let handler = handler_fn(|_event, _ctx, _done| {
            Err(HandlerError::with_trace("bad input", "Error: bad input\n    at handler (index.js:1)"))
        });
        let (event, ctx) = inputs();
        let err = invoke(handler, event, ctx).await.unwrap_err();
        assert!(matches!(err, InvocationError::Threw(_)));
        assert!(err.trace_text().contains("at handler"));
    }

    #[tokio::test]
    async fn test_throw_after_completion_is_ignored() {
        let handler = handler_fn(|_event, _ctx, done| {
            done.succeed(InvocationResult::default());
            Err(HandlerError::new("ignored"))
        });
        let (event, ctx) = inputs();
        let result = invoke(handler, event, ctx).await.unwrap();
        assert_eq!(result.status_or_default(), 200);
    }

    #[tokio::test]
    async fn test_abandoned_completion() {
        let handler = handler_fn(|_event, _ctx, _done| Ok(()));
        let (event, ctx) = inputs();
        let err = invoke(handler, event, ctx).await.unwrap_err();
        assert!(matches!(err, InvocationError::Abandoned));
    }

    #[tokio::test]
    async fn test_panic_is_reported() {
        let handler = handler_fn(|_event, _ctx, _done| panic!("handler exploded"));
        let (event, ctx) = inputs();
        match invoke(handler, event, ctx).await {
            Err(InvocationError::Panicked(msg)) => assert_eq!(msg, "handler exploded"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
