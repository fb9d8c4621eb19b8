use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{JsonRpcErrorObject, ToJsonRpcError};
use crate::types::{JsonRpcVersion, RequestId};

/// A successful JSON-RPC response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub id: RequestId,
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub result: Value,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            id,
            version: JsonRpcVersion::V2_0,
            result,
        }
    }
}

/// An error JSON-RPC response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub id: RequestId,
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub error: JsonRpcErrorObject,
}

impl JsonRpcError {
    pub fn new(id: RequestId, error: JsonRpcErrorObject) -> Self {
        Self {
            id,
            version: JsonRpcVersion::V2_0,
            error,
        }
    }

    /// Build from anything exposing a code and message
    pub fn from_error<E: ToJsonRpcError + ?Sized>(id: RequestId, error: &E) -> Self {
        Self::new(id, error.to_error_object())
    }

    /// The payload could not be decoded, so the id is unknown
    pub fn parse_error() -> Self {
        Self::new(RequestId::Null, JsonRpcErrorObject::parse_error())
    }

    /// An invalid request's id cannot be trusted and is always reported as `null`
    pub fn invalid_request() -> Self {
        Self::new(RequestId::Null, JsonRpcErrorObject::invalid_request())
    }

    pub fn method_not_found(id: RequestId) -> Self {
        Self::new(id, JsonRpcErrorObject::method_not_found())
    }

    pub fn internal(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(id, JsonRpcErrorObject::internal(message))
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JSON-RPC Error {}: {}",
            self.error.code, self.error.message
        )
    }
}

impl std::error::Error for JsonRpcError {}

/// Union type that represents either a successful response or an error response.
/// Keeping the two shapes apart guarantees `result` and `error` never appear together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    /// Successful response with result field
    Response(JsonRpcResponse),
    /// Error response with error field
    Error(JsonRpcError),
}

impl JsonRpcMessage {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self::Response(JsonRpcResponse::success(id, result))
    }

    pub fn error(error: JsonRpcError) -> Self {
        Self::Error(error)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, JsonRpcMessage::Error(_))
    }

    pub fn id(&self) -> &RequestId {
        match self {
            JsonRpcMessage::Response(resp) => &resp.id,
            JsonRpcMessage::Error(err) => &err.id,
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            JsonRpcMessage::Response(resp) => Some(&resp.result),
            JsonRpcMessage::Error(_) => None,
        }
    }

    pub fn error_object(&self) -> Option<&JsonRpcErrorObject> {
        match self {
            JsonRpcMessage::Response(_) => None,
            JsonRpcMessage::Error(err) => Some(&err.error),
        }
    }
}

impl From<JsonRpcResponse> for JsonRpcMessage {
    fn from(response: JsonRpcResponse) -> Self {
        Self::Response(response)
    }
}

impl From<JsonRpcError> for JsonRpcMessage {
    fn from(error: JsonRpcError) -> Self {
        Self::Error(error)
    }
}
