use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{JsonRpcErrorObject, JsonRpcProcessingError};
use crate::types::{JsonRpcVersion, RequestId};

/// One decoded JSON-RPC call.
///
/// `version` and `method` are kept as raw strings so that a payload with the
/// right shape but the wrong content decodes successfully and is rejected by
/// [`JsonRpcCall::validate`] as an invalid request instead of a parse error.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct JsonRpcCall {
    /// `None` when the `id` member is absent (a notification).
    /// An explicit `"id": null` decodes to `Some(RequestId::Null)`.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RequestId>,
    #[serde(rename = "jsonrpc", default, deserialize_with = "deserialize_nullable")]
    pub version: String,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub method: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

/// Distinguishes a member that is present (even as `null`) from one that is absent.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<RequestId>, D::Error>
where
    D: Deserializer<'de>,
{
    RequestId::deserialize(deserializer).map(Some)
}

/// Reads an explicit `null` as an empty string, which validation then rejects.
fn deserialize_nullable<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl JsonRpcCall {
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Value) -> Self {
        Self {
            id: Some(id.into()),
            version: JsonRpcVersion::V2_0.as_str().to_string(),
            method: method.into(),
            params,
        }
    }

    /// Create a call without an id
    pub fn notification(method: impl Into<String>, params: Value) -> Self {
        Self {
            id: None,
            version: JsonRpcVersion::V2_0.as_str().to_string(),
            method: method.into(),
            params,
        }
    }

    /// Structural validation: the version must be "2.0" and the method non-empty.
    pub fn validate(&self) -> Result<(), JsonRpcErrorObject> {
        if !JsonRpcVersion::V2_0.matches(&self.version) {
            return Err(JsonRpcErrorObject::invalid_request());
        }
        if self.method.is_empty() {
            return Err(JsonRpcErrorObject::invalid_request());
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// A valid call without an id never gets a response
    pub fn is_notification(&self) -> bool {
        self.id.is_none() && self.is_valid()
    }

    /// The id to echo back, `null` for notifications
    pub fn response_id(&self) -> RequestId {
        self.id.clone().unwrap_or(RequestId::Null)
    }
}

/// Decode handler params into a typed value, reporting failures as invalid params.
///
/// The dispatcher never inspects params itself; handlers opt into this check.
pub fn decode_params<T>(params: Value) -> Result<T, JsonRpcProcessingError>
where
    T: DeserializeOwned,
{
    serde_json::from_value(params).map_err(|err| {
        JsonRpcProcessingError::RpcError(
            JsonRpcErrorObject::invalid_params().with_data(Value::String(err.to_string())),
        )
    })
}
