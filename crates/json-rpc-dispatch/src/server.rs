//! Transport-independent JSON-RPC server.
//!
//! [`JsonRpcServer::serve`] takes one raw payload (a single call or a batch) and
//! returns the serialized response, or `None` when nothing must be written back.
//!
//! # Timeouts
//!
//! With a non-zero default timeout every handler is raced against a timer. A
//! handler that loses the race is not aborted: it keeps running on its own task
//! and its result is discarded. Handlers are expected not to rely on being
//! stopped; long-running ones can watch [`CallContext::expired`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::{
    codec,
    dispatch::{self, JsonRpcMessageResult},
    r#async::{CallContext, FunctionHandler, JsonRpcDispatcher, JsonRpcHandler, JsonRpcResult},
    request::JsonRpcCall,
    response::{JsonRpcError, JsonRpcMessage},
    timeout,
    types::RequestId,
};

/// Configuration for the JSON-RPC server
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Deadline budget applied to every call; zero means unbounded
    pub default_timeout: Duration,
}

/// Builder for a JSON-RPC server
#[derive(Debug, Default)]
pub struct JsonRpcServerBuilder {
    config: ServerConfig,
    dispatcher: JsonRpcDispatcher,
}

impl JsonRpcServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the deadline applied to every call (zero disables it)
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = timeout;
        self
    }

    /// Register a handler for a method
    pub fn handler<H>(mut self, method: impl Into<String>, handler: H) -> Self
    where
        H: JsonRpcHandler + 'static,
    {
        self.dispatcher.register_method(method, handler);
        self
    }

    /// Register an async closure for a method
    pub fn method<F, Fut>(self, method: impl Into<String>, handler_fn: F) -> Self
    where
        F: Fn(CallContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = JsonRpcResult<Value>> + Send + 'static,
    {
        self.handler(method, FunctionHandler::new(handler_fn))
    }

    pub fn build(self) -> JsonRpcServer {
        JsonRpcServer {
            config: Arc::new(self.config),
            dispatcher: Arc::new(self.dispatcher),
        }
    }
}

/// JSON-RPC 2.0 server.
///
/// Cloning is cheap and every clone shares the same dispatch table. Registration
/// through `&mut self` is copy-on-write: calls already in flight on another
/// clone keep the table they started with.
#[derive(Debug, Clone, Default)]
pub struct JsonRpcServer {
    config: Arc<ServerConfig>,
    dispatcher: Arc<JsonRpcDispatcher>,
}

impl JsonRpcServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> JsonRpcServerBuilder {
        JsonRpcServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn set_default_timeout(&mut self, timeout: Duration) {
        Arc::make_mut(&mut self.config).default_timeout = timeout;
    }

    /// Register or replace the handler for `method`
    pub fn define_method<H>(&mut self, method: impl Into<String>, handler: H)
    where
        H: JsonRpcHandler + 'static,
    {
        Arc::make_mut(&mut self.dispatcher).register_method(method, handler);
    }

    /// Register or replace an async closure for `method`
    pub fn define_fn<F, Fut>(&mut self, method: impl Into<String>, handler_fn: F)
    where
        F: Fn(CallContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = JsonRpcResult<Value>> + Send + 'static,
    {
        self.define_method(method, FunctionHandler::new(handler_fn));
    }

    /// Serve one payload: a single call or a batch.
    ///
    /// `None` means nothing must be written back (notifications, or a batch made
    /// only of notifications). This never fails; every problem is reported as a
    /// JSON-RPC error response.
    pub async fn serve(&self, payload: &[u8]) -> Option<Bytes> {
        match serde_json::from_slice::<Vec<Value>>(payload) {
            Ok(calls) if calls.is_empty() => {
                warn!("Received empty JSON-RPC batch");
                Some(codec::encode(&JsonRpcError::invalid_request()))
            }
            Ok(calls) => self.serve_batch(calls).await,
            Err(_) => self.serve_single(payload).await.to_bytes(),
        }
    }

    /// Convenience wrapper for text transports
    pub async fn serve_str(&self, payload: &str) -> Option<String> {
        self.serve(payload.as_bytes())
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn serve_single(&self, payload: &[u8]) -> JsonRpcMessageResult {
        match dispatch::parse_call_bytes(payload) {
            Ok(call) => self.execute_call(call).await,
            Err(err) => {
                warn!("Rejected JSON-RPC payload: {}", err);
                JsonRpcMessageResult::Error(err)
            }
        }
    }

    /// Run every element of a batch on its own task and collect the responses
    /// in input order.
    async fn serve_batch(&self, calls: Vec<Value>) -> Option<Bytes> {
        debug!("Processing JSON-RPC batch of {} calls", calls.len());

        let tasks: Vec<_> = calls
            .into_iter()
            .map(|value| {
                let server = self.clone();
                tokio::spawn(async move { server.execute_one(value).await })
            })
            .collect();

        let mut messages: Vec<JsonRpcMessage> = Vec::with_capacity(tasks.len());
        for joined in futures::future::join_all(tasks).await {
            let result = match joined {
                Ok(result) => result,
                Err(err) => {
                    error!("Batch element failed to complete: {}", err);
                    JsonRpcMessageResult::Error(JsonRpcError::internal(
                        RequestId::Null,
                        err.to_string(),
                    ))
                }
            };
            if let Some(message) = result.into_message() {
                messages.push(message);
            }
        }

        codec::encode_batch(&messages)
    }

    /// Process one already-parsed JSON value as a single call
    pub async fn execute_one(&self, value: Value) -> JsonRpcMessageResult {
        match dispatch::parse_call(value) {
            Ok(call) => self.execute_call(call).await,
            Err(err) => {
                warn!("Rejected JSON-RPC call: {}", err);
                JsonRpcMessageResult::Error(err)
            }
        }
    }

    /// Dispatch a validated call and shape its outcome
    async fn execute_call(&self, call: JsonRpcCall) -> JsonRpcMessageResult {
        let Some(handler) = self.dispatcher.get(&call.method) else {
            debug!("Method not found: {}", call.method);
            if call.is_notification() {
                return JsonRpcMessageResult::NoResponse;
            }
            return JsonRpcMessageResult::Error(JsonRpcError::method_not_found(
                call.response_id(),
            ));
        };

        debug!(
            "Dispatching JSON-RPC {}: method={}",
            if call.is_notification() { "notification" } else { "call" },
            call.method
        );

        let ctx = CallContext::new(call.id.clone(), call.method.clone())
            .with_timeout(self.config.default_timeout);
        let outcome = timeout::run_with_deadline(handler, ctx, call.params.clone()).await;

        if let (true, Err(err)) = (call.is_notification(), &outcome) {
            debug!("Notification '{}' failed: {}", call.method, err);
        }
        dispatch::finish_call(&call, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JsonRpcProcessingError;
    use serde_json::json;

    fn echo_server() -> JsonRpcServer {
        JsonRpcServer::builder()
            .method("echo", |_ctx, params| async move { Ok(params) })
            .method("fail", |_ctx, _params| async move {
                Err(JsonRpcProcessingError::handler("it broke"))
            })
            .build()
    }

    async fn serve_json(server: &JsonRpcServer, payload: &str) -> Option<Value> {
        server
            .serve(payload.as_bytes())
            .await
            .map(|bytes| serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_echo_bytes_exact() {
        let server = echo_server();
        let rsp = server
            .serve_str(r#"{"jsonrpc":"2.0","method":"echo","params":"hi","id":1}"#)
            .await;
        assert_eq!(rsp.as_deref(), Some(r#"{"id":1,"jsonrpc":"2.0","result":"hi"}"#));
    }

    #[tokio::test]
    async fn test_execute_one_classifies() {
        let server = echo_server();

        let result = server.execute_one(json!({"jsonrpc": "2.0", "method": "echo", "id": "a"})).await;
        assert_eq!(
            result.into_message().map(|m| m.id().clone()),
            Some(RequestId::from("a"))
        );

        let result = server.execute_one(json!("not a call")).await;
        assert!(result.is_error());

        let result = server.execute_one(json!({"jsonrpc": "2.0", "method": "echo"})).await;
        assert!(!result.needs_response());
    }

    #[tokio::test]
    async fn test_handler_failure_maps_to_internal_error() {
        let server = echo_server();
        let rsp = serve_json(&server, r#"{"jsonrpc": "2.0", "method": "fail", "id": 3}"#).await;
        assert_eq!(
            rsp,
            Some(json!({
                "id": 3,
                "jsonrpc": "2.0",
                "error": {"code": -32000, "message": "it broke"}
            }))
        );
    }

    #[tokio::test]
    async fn test_notification_to_missing_method_is_silent() {
        let server = echo_server();
        let rsp = serve_json(&server, r#"{"jsonrpc": "2.0", "method": "missing"}"#).await;
        assert_eq!(rsp, None);
    }

    #[tokio::test]
    async fn test_define_method_after_clone_is_copy_on_write() {
        let mut server = echo_server();
        let serving = server.clone();

        server.define_fn("late", |_ctx, _params| async move { Ok(json!("late")) });
        server.set_default_timeout(Duration::from_millis(10));

        let rsp = serve_json(&serving, r#"{"jsonrpc": "2.0", "method": "late", "id": 1}"#).await;
        assert_eq!(rsp.unwrap()["error"]["code"], json!(-32601));
        assert_eq!(serving.config().default_timeout, Duration::ZERO);

        let rsp = serve_json(&server, r#"{"jsonrpc": "2.0", "method": "late", "id": 1}"#).await;
        assert_eq!(rsp.unwrap()["result"], json!("late"));
        assert_eq!(server.config().default_timeout, Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_context_carries_call_details() {
        let server = JsonRpcServer::builder()
            .method("whoami", |ctx: CallContext, _params| async move {
                Ok(json!({"method": ctx.method, "id": ctx.request_id}))
            })
            .build();
        let rsp = serve_json(&server, r#"{"jsonrpc": "2.0", "method": "whoami", "id": "x"}"#).await;
        assert_eq!(rsp.unwrap()["result"], json!({"method": "whoami", "id": "x"}));
    }
}
