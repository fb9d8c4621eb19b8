//! Deadline race between a handler and a timer.
//!
//! A timed handler runs on its own task. When the timer wins, the call is
//! answered with a deadline error and the context is marked expired, but the
//! handler task is left running: it is detached, runs to completion, and its
//! result is dropped. Handlers that must stop early should watch
//! [`CallContext::expired`].
//!
//! A panicking handler, timed or not, resolves as
//! [`JsonRpcProcessingError::HandlerPanicked`].

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tracing::warn;

use crate::error::JsonRpcProcessingError;
use crate::r#async::{CallContext, JsonRpcHandler, JsonRpcResult};

/// Run `handler`, racing it against the context deadline if there is one.
///
/// Without a deadline the handler's own outcome is returned unmodified.
pub async fn run_with_deadline(
    handler: Arc<dyn JsonRpcHandler>,
    ctx: CallContext,
    params: Value,
) -> JsonRpcResult<Value> {
    let Some(deadline) = ctx.deadline() else {
        return guarded(handler, ctx, params).await;
    };

    let expiry = ctx.expiry().clone();
    let method = ctx.method.clone();
    let mut task = tokio::spawn(guarded(handler, ctx, params));

    tokio::select! {
        // a handler that is ready when the timer fires still wins
        biased;
        joined = &mut task => match joined {
            Ok(outcome) => outcome,
            Err(err) => Err(JsonRpcProcessingError::handler(err.to_string())),
        },
        _ = tokio::time::sleep_until(deadline) => {
            expiry.expire();
            warn!("Handler for '{}' exceeded its deadline", method);
            Err(JsonRpcProcessingError::DeadlineExceeded)
        }
    }
}

/// Invoke the handler, turning a panic into an error
async fn guarded(
    handler: Arc<dyn JsonRpcHandler>,
    ctx: CallContext,
    params: Value,
) -> JsonRpcResult<Value> {
    let method = ctx.method.clone();
    match AssertUnwindSafe(handler.handle(ctx, params)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = panic_message(payload);
            warn!("Handler for '{}' panicked: {}", method, message);
            Err(JsonRpcProcessingError::HandlerPanicked(message))
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
