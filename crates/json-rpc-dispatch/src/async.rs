use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::{error::JsonRpcProcessingError, types::RequestId};

/// Result type returned by handlers
pub type JsonRpcResult<T> = Result<T, JsonRpcProcessingError>;

/// Expiry flag shared between the dispatcher and a running handler.
///
/// Wraps a `tokio::sync::watch` channel. Expiring is idempotent and does not
/// stop the handler; it only lets a handler that checks the flag bail out.
#[derive(Debug, Clone)]
pub struct ExpirySignal {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl ExpirySignal {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx, rx }
    }

    pub fn expire(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_expired(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the call is marked expired.
    ///
    /// Returns immediately if it already is.
    pub async fn expired(&self) {
        let mut rx = self.rx.clone();
        if *rx.borrow() {
            return;
        }
        loop {
            if rx.changed().await.is_err() {
                // every sender dropped, the flag can no longer change
                return;
            }
            if *rx.borrow() {
                return;
            }
        }
    }
}

impl Default for ExpirySignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Execution context handed to every handler invocation
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Id of the originating call, `None` for notifications
    pub request_id: Option<RequestId>,
    /// Method being invoked
    pub method: String,
    deadline: Option<Instant>,
    expiry: ExpirySignal,
}

impl CallContext {
    pub fn new(request_id: Option<RequestId>, method: impl Into<String>) -> Self {
        Self {
            request_id,
            method: method.into(),
            deadline: None,
            expiry: ExpirySignal::new(),
        }
    }

    /// Attach a deadline `timeout` from now; a zero timeout leaves the call unbounded
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = if timeout.is_zero() {
            None
        } else {
            Some(Instant::now() + timeout)
        };
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_notification(&self) -> bool {
        self.request_id.is_none()
    }

    /// Whether the dispatcher has already given up on this call
    pub fn is_expired(&self) -> bool {
        self.expiry.is_expired()
    }

    /// Resolves once the dispatcher gives up on this call
    pub async fn expired(&self) {
        self.expiry.expired().await
    }

    pub(crate) fn expiry(&self) -> &ExpirySignal {
        &self.expiry
    }
}

/// Trait for handling JSON-RPC method calls
#[async_trait]
pub trait JsonRpcHandler: Send + Sync {
    /// Handle one call. `params` is passed through exactly as received
    /// (`null` when the call had none).
    async fn handle(&self, ctx: CallContext, params: Value) -> JsonRpcResult<Value>;
}

/// A simple function-based handler
pub struct FunctionHandler<F> {
    handler_fn: F,
}

impl<F, Fut> FunctionHandler<F>
where
    F: Fn(CallContext, Value) -> Fut + Send + Sync,
    Fut: Future<Output = JsonRpcResult<Value>> + Send,
{
    pub fn new(handler_fn: F) -> Self {
        Self { handler_fn }
    }
}

#[async_trait]
impl<F, Fut> JsonRpcHandler for FunctionHandler<F>
where
    F: Fn(CallContext, Value) -> Fut + Send + Sync,
    Fut: Future<Output = JsonRpcResult<Value>> + Send,
{
    async fn handle(&self, ctx: CallContext, params: Value) -> JsonRpcResult<Value> {
        (self.handler_fn)(ctx, params).await
    }
}

/// Dispatch table mapping method names to handlers.
///
/// Populated before serving. While a server is serving, it only reads from the
/// table; see `JsonRpcServer` for how registration stays out of the way of
/// in-flight calls.
#[derive(Clone, Default)]
pub struct JsonRpcDispatcher {
    handlers: HashMap<String, Arc<dyn JsonRpcHandler>>,
}

impl JsonRpcDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a specific method, replacing any previous one
    pub fn register_method<H>(&mut self, method: impl Into<String>, handler: H)
    where
        H: JsonRpcHandler + 'static,
    {
        self.handlers.insert(method.into(), Arc::new(handler));
    }

    pub fn get(&self, method: &str) -> Option<Arc<dyn JsonRpcHandler>> {
        self.handlers.get(method).cloned()
    }

    pub fn contains_method(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for JsonRpcDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonRpcDispatcher")
            .field("methods", &self.handlers.len())
            .finish()
    }
}
