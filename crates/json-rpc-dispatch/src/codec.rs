//! Response encoding.
//!
//! Encoding never fails from the caller's point of view: every type that goes
//! through here is built by this crate, so a serializer error is logged and
//! turned into an empty payload. "No response" is represented by `None` at the
//! call sites, never by an empty buffer.

use bytes::Bytes;
use serde::Serialize;
use tracing::error;

use crate::response::JsonRpcMessage;

/// Serialize a response (or anything else produced by the dispatcher)
pub fn encode<T>(value: &T) -> Bytes
where
    T: Serialize + ?Sized,
{
    match serde_json::to_vec(value) {
        Ok(buf) => Bytes::from(buf),
        Err(err) => {
            error!("Failed to serialize JSON-RPC response: {}", err);
            Bytes::new()
        }
    }
}

/// Serialize batch responses as a JSON array; an empty batch yields no payload
pub fn encode_batch(messages: &[JsonRpcMessage]) -> Option<Bytes> {
    if messages.is_empty() {
        return None;
    }
    Some(encode(messages))
}
