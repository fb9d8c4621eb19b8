//! # JSON-RPC 2.0 Dispatcher
//!
//! A transport-agnostic JSON-RPC 2.0 server core. It takes raw payloads (a single
//! call or a batch), dispatches them to registered handlers and produces the
//! serialized response, or nothing for notifications. Transports (HTTP, stdio,
//! sockets) only move bytes in and out of [`JsonRpcServer::serve`].
//!
//! ## Features
//! - JSON-RPC 2.0 calls, notifications and batches
//! - Concurrent batch execution with input-order responses
//! - Per-call deadlines with cooperative expiry
//! - Uniform error mapping for handler failures
//!
//! ```no_run
//! use json_rpc_dispatch::JsonRpcServer;
//!
//! # async fn run() {
//! let server = JsonRpcServer::builder()
//!     .method("echo", |_ctx, params| async move { Ok(params) })
//!     .build();
//!
//! let rsp = server
//!     .serve(br#"{"jsonrpc": "2.0", "method": "echo", "params": "hi", "id": 1}"#)
//!     .await;
//! # let _ = rsp;
//! # }
//! ```

pub mod codec;
pub mod dispatch;
pub mod error;
pub mod prelude;
pub mod request;
pub mod response;
pub mod server;
pub mod timeout;
pub mod types;

pub mod r#async;

// Re-export main types
pub use dispatch::JsonRpcMessageResult;
pub use error::{JsonRpcErrorCode, JsonRpcErrorObject, JsonRpcProcessingError, ToJsonRpcError};
pub use r#async::{CallContext, FunctionHandler, JsonRpcDispatcher, JsonRpcHandler, JsonRpcResult};
pub use request::{JsonRpcCall, decode_params};
pub use response::{JsonRpcError, JsonRpcMessage, JsonRpcResponse};
pub use server::{JsonRpcServer, JsonRpcServerBuilder, ServerConfig};
pub use types::{JsonRpcVersion, RequestId};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;

    /// Default server error: timeouts and handler failures without their own code
    pub const INTERNAL_ERROR: i64 = -32000;
}
