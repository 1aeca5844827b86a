//! Wire protocol: framing and message types
//!
//! Every message is one frame: a 2-byte unsigned big-endian length prefix
//! followed by that many bytes of UTF-8 JSON. A connection carries exactly
//! one request frame and one response frame, then closes.
//!
//! Requests: `{"type":"get"|"set"|"delete"|"exit", "key": <str|[str]>,
//! "value": <json>}` with `key`/`value` optional where the operation allows.
//! Responses: `{"response":"OK"|"ERROR", "value"?, "reason"?}`; absent
//! fields are omitted.

use crate::document::Value;
use crate::path::Key;
use serde::{Deserialize, Serialize};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest payload a 2-byte length prefix can describe.
pub const MAX_FRAME_LEN: usize = u16::MAX as usize;

pub mod reason {
    pub const KEY_REQUIRED: &str = "Key is required";
    pub const VALUE_REQUIRED: &str = "Value is required for set";
    pub const NO_SUCH_KEY: &str = "No such key";
    pub const UNKNOWN_TYPE: &str = "Unknown request type";
    pub const MALFORMED: &str = "Malformed request";
}

/// Why a payload could not be decoded into a [`Request`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Not JSON, or no string `type` field; there is no request to answer
    /// and the connection is closed without a response.
    #[error("request type is not determinable: {0}")]
    Unreadable(String),
    /// The `type` was readable but `key` has the wrong shape; the client
    /// gets a framed error.
    #[error("malformed request")]
    WrongShape,
}

/// One client request.
///
/// The request type stays a free-form string through decoding so an
/// unrecognized type can still be answered with a framed error instead of a
/// dropped connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Request {
    pub fn new(kind: impl Into<String>, key: Option<Key>, value: Option<Value>) -> Self {
        Self {
            kind: kind.into(),
            key,
            value,
        }
    }

    pub fn exit() -> Self {
        Self::new("exit", None, None)
    }

    /// Decode a frame payload in two stages: first as a plain JSON value to
    /// pin down the request type, then field by field. This way a request
    /// with a wrong-shaped `key` still gets a framed error instead of a
    /// dropped connection; only a payload whose type cannot be determined
    /// at all is unanswerable.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let raw: Value =
            serde_json::from_slice(payload).map_err(|e| DecodeError::Unreadable(e.to_string()))?;
        let Value::Object(mut fields) = raw else {
            return Err(DecodeError::Unreadable("payload is not an object".into()));
        };
        let kind = match fields.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            _ => return Err(DecodeError::Unreadable("no string `type` field".into())),
        };

        let key = match fields.remove("key") {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(Key::Field(name)),
            Some(Value::Array(items)) => {
                let mut segments = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(segment) => segments.push(segment),
                        _ => return Err(DecodeError::WrongShape),
                    }
                }
                Some(Key::Path(segments))
            }
            Some(_) => return Err(DecodeError::WrongShape),
        };

        // an explicit null value reads the same as an absent one
        let value = match fields.remove("value") {
            None | Some(Value::Null) => None,
            value => value,
        };

        Ok(Self { kind, key, value })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ERROR")]
    Error,
}

/// One server response. Exactly one of `value`/`reason` is populated on the
/// interesting paths; OK responses to set/delete carry neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub response: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            response: Status::Ok,
            value: None,
            reason: None,
        }
    }

    pub fn ok_value(value: Value) -> Self {
        Self {
            response: Status::Ok,
            value: Some(value),
            reason: None,
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            response: Status::Error,
            value: None,
            reason: Some(reason.into()),
        }
    }
}

/// Read one length-prefixed frame.
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u16().await? as usize;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

/// Write one length-prefixed frame.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame payload of {} bytes exceeds {}", payload.len(), MAX_FRAME_LEN),
        ));
    }
    writer.write_u16(payload.len() as u16).await?;
    writer.write_all(payload).await?;
    writer.flush().await
}
