use bytes::Bytes;
use serde_json::Value;

use crate::{
    codec,
    error::ToJsonRpcError,
    request::JsonRpcCall,
    response::{JsonRpcError, JsonRpcMessage, JsonRpcResponse},
    types::RequestId,
};

/// Result of processing one call
#[derive(Debug, Clone, PartialEq)]
pub enum JsonRpcMessageResult {
    /// A response to a request
    Response(JsonRpcResponse),
    /// An error response
    Error(JsonRpcError),
    /// No response needed (for notifications)
    NoResponse,
}

impl JsonRpcMessageResult {
    /// Serialize if there's a response to send
    pub fn to_bytes(&self) -> Option<Bytes> {
        match self {
            JsonRpcMessageResult::Response(response) => Some(codec::encode(response)),
            JsonRpcMessageResult::Error(error) => Some(codec::encode(error)),
            JsonRpcMessageResult::NoResponse => None,
        }
    }

    /// Convert into the wire message, if any
    pub fn into_message(self) -> Option<JsonRpcMessage> {
        match self {
            JsonRpcMessageResult::Response(response) => Some(JsonRpcMessage::Response(response)),
            JsonRpcMessageResult::Error(error) => Some(JsonRpcMessage::Error(error)),
            JsonRpcMessageResult::NoResponse => None,
        }
    }

    /// Check if this result represents an error
    pub fn is_error(&self) -> bool {
        matches!(self, JsonRpcMessageResult::Error(_))
    }

    /// Check if this result needs a response
    pub fn needs_response(&self) -> bool {
        !matches!(self, JsonRpcMessageResult::NoResponse)
    }
}

impl From<JsonRpcMessage> for JsonRpcMessageResult {
    fn from(message: JsonRpcMessage) -> Self {
        match message {
            JsonRpcMessage::Response(response) => JsonRpcMessageResult::Response(response),
            JsonRpcMessage::Error(error) => JsonRpcMessageResult::Error(error),
        }
    }
}

/// Decode one JSON value into a validated call.
///
/// Anything that is not a JSON object, or does not have the shape of a call
/// object, is a parse error. A well-shaped call with the wrong version or an
/// empty method is an invalid request; in both cases the id is reported as `null`.
pub fn parse_call(value: Value) -> Result<JsonRpcCall, JsonRpcError> {
    // a derived struct decoder would also accept a positional array
    if !value.is_object() {
        return Err(JsonRpcError::parse_error());
    }
    let call: JsonRpcCall =
        serde_json::from_value(value).map_err(|_| JsonRpcError::parse_error())?;
    call.validate()
        .map_err(|err| JsonRpcError::new(RequestId::Null, err))?;
    Ok(call)
}

/// Decode raw bytes into a validated call
pub fn parse_call_bytes(payload: &[u8]) -> Result<JsonRpcCall, JsonRpcError> {
    let value: Value = serde_json::from_slice(payload).map_err(|_| JsonRpcError::parse_error())?;
    parse_call(value)
}

/// Build the result for a processed call, suppressing it for notifications
pub fn finish_call<E>(call: &JsonRpcCall, outcome: Result<Value, E>) -> JsonRpcMessageResult
where
    E: ToJsonRpcError,
{
    if call.is_notification() {
        return JsonRpcMessageResult::NoResponse;
    }
    let id = call.response_id();
    match outcome {
        Ok(result) => JsonRpcMessageResult::Response(JsonRpcResponse::success(id, result)),
        Err(err) => JsonRpcMessageResult::Error(JsonRpcError::from_error(id, &err)),
    }
}
