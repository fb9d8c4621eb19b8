use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::error_codes;

/// Message used when a call runs past its deadline.
pub const DEADLINE_EXCEEDED_MESSAGE: &str = "context deadline exceeded";

/// Anything that can be reported as a JSON-RPC error carries a code and a message.
pub trait ToJsonRpcError {
    fn code(&self) -> i64;

    fn message(&self) -> String;

    /// Build the wire error object for this error
    fn to_error_object(&self) -> JsonRpcErrorObject {
        JsonRpcErrorObject::new(self.code(), self.message())
    }
}

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    /// Default server error, also used for timeouts
    InternalError,
    Custom(i64),
}

impl JsonRpcErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => error_codes::PARSE_ERROR,
            JsonRpcErrorCode::InvalidRequest => error_codes::INVALID_REQUEST,
            JsonRpcErrorCode::MethodNotFound => error_codes::METHOD_NOT_FOUND,
            JsonRpcErrorCode::InvalidParams => error_codes::INVALID_PARAMS,
            JsonRpcErrorCode::InternalError => error_codes::INTERNAL_ERROR,
            JsonRpcErrorCode::Custom(code) => *code,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            JsonRpcErrorCode::ParseError => "Parse error",
            JsonRpcErrorCode::InvalidRequest => "Invalid request",
            JsonRpcErrorCode::MethodNotFound => "Method not found",
            JsonRpcErrorCode::InvalidParams => "Invalid Params",
            JsonRpcErrorCode::InternalError => "Internal error",
            JsonRpcErrorCode::Custom(_) => "Server error",
        }
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl ToJsonRpcError for JsonRpcErrorCode {
    fn code(&self) -> i64 {
        JsonRpcErrorCode::code(self)
    }

    fn message(&self) -> String {
        JsonRpcErrorCode::message(self).to_string()
    }
}

/// JSON-RPC Error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    /// Build an error with an arbitrary code and message
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn from_code(code: JsonRpcErrorCode) -> Self {
        Self::new(code.code(), code.message())
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error() -> Self {
        Self::from_code(JsonRpcErrorCode::ParseError)
    }

    pub fn invalid_request() -> Self {
        Self::from_code(JsonRpcErrorCode::InvalidRequest)
    }

    pub fn method_not_found() -> Self {
        Self::from_code(JsonRpcErrorCode::MethodNotFound)
    }

    pub fn invalid_params() -> Self {
        Self::from_code(JsonRpcErrorCode::InvalidParams)
    }

    /// Wrap a plain failure message with the default server error code
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(error_codes::INTERNAL_ERROR, message)
    }

    pub fn deadline_exceeded() -> Self {
        Self::internal(DEADLINE_EXCEEDED_MESSAGE)
    }
}

impl fmt::Display for JsonRpcErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcErrorObject {}

impl ToJsonRpcError for JsonRpcErrorObject {
    fn code(&self) -> i64 {
        self.code
    }

    fn message(&self) -> String {
        self.message.clone()
    }

    fn to_error_object(&self) -> JsonRpcErrorObject {
        self.clone()
    }
}

impl From<JsonRpcErrorCode> for JsonRpcErrorObject {
    fn from(code: JsonRpcErrorCode) -> Self {
        Self::from_code(code)
    }
}

/// Failure of a handler invocation.
///
/// Plain failures carry only a message and are reported with the default server
/// code. `RpcError` already carries a code and is passed through verbatim.
#[derive(Debug, Clone, Error)]
pub enum JsonRpcProcessingError {
    #[error("{0}")]
    HandlerError(String),

    #[error("{0}")]
    RpcError(JsonRpcErrorObject),

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error("handler panicked: {0}")]
    HandlerPanicked(String),
}

impl JsonRpcProcessingError {
    pub fn handler(message: impl Into<String>) -> Self {
        Self::HandlerError(message.into())
    }

    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        Self::RpcError(JsonRpcErrorObject::new(code, message))
    }

    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded)
    }
}

impl ToJsonRpcError for JsonRpcProcessingError {
    fn code(&self) -> i64 {
        match self {
            Self::RpcError(obj) => obj.code,
            _ => error_codes::INTERNAL_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::RpcError(obj) => obj.message.clone(),
            other => other.to_string(),
        }
    }

    fn to_error_object(&self) -> JsonRpcErrorObject {
        match self {
            Self::RpcError(obj) => obj.clone(),
            other => JsonRpcErrorObject::internal(other.to_string()),
        }
    }
}

impl From<JsonRpcErrorObject> for JsonRpcProcessingError {
    fn from(obj: JsonRpcErrorObject) -> Self {
        Self::RpcError(obj)
    }
}

impl From<JsonRpcErrorCode> for JsonRpcProcessingError {
    fn from(code: JsonRpcErrorCode) -> Self {
        Self::RpcError(code.into())
    }
}

impl From<serde_json::Error> for JsonRpcProcessingError {
    fn from(err: serde_json::Error) -> Self {
        Self::HandlerError(err.to_string())
    }
}

impl From<String> for JsonRpcProcessingError {
    fn from(message: String) -> Self {
        Self::HandlerError(message)
    }
}

impl From<&str> for JsonRpcProcessingError {
    fn from(message: &str) -> Self {
        Self::HandlerError(message.to_string())
    }
}
