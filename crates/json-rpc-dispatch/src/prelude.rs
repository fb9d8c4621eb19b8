//! # JSON-RPC Dispatcher Prelude
//!
//! Convenient re-exports of the types most handlers and transports need.
//!
//! ```rust
//! use json_rpc_dispatch::prelude::*;
//! ```

pub use crate::error::{JsonRpcErrorCode, JsonRpcErrorObject, JsonRpcProcessingError, ToJsonRpcError};
pub use crate::r#async::{CallContext, JsonRpcHandler, JsonRpcResult};
pub use crate::request::{JsonRpcCall, decode_params};
pub use crate::response::{JsonRpcError, JsonRpcMessage, JsonRpcResponse};
pub use crate::server::{JsonRpcServer, JsonRpcServerBuilder, ServerConfig};
pub use crate::types::{JsonRpcVersion, RequestId};

// Standard error codes
pub use crate::error_codes::*;
