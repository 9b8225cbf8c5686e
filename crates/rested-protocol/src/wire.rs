//! Envelope and payload types for the socket binding.
//!
//! Payload bodies travel as codec text inside the JSON envelope, so the
//! envelope format stays independent of the payload codec.

use rested_core::{DEFAULT_CONTENT_TYPE, Object, Serializer, serializer_for};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::PROTOCOL_VERSION;
use crate::error::{ProtocolError, ProtocolResult};
use crate::header::{RequestMethod, StatusCode};
use crate::message::{Reply, Request};
use crate::uri::Uri;

/// Message envelope wrapping all frames.
///
/// Carries the protocol version and a request id used to match replies to
/// requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub protocol_version: String,
    pub request_id: String,
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn new(request_id: impl Into<String>, payload: T) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            request_id: request_id.into(),
            payload,
        }
    }

    /// Wraps `payload` under a fresh random request id.
    pub fn with_new_id(payload: T) -> Self {
        Self::new(Uuid::new_v4().to_string(), payload)
    }

    /// Wraps a reply under the id of the request it answers.
    pub fn reply_to<R>(request: &Envelope<R>, payload: T) -> Self {
        Self::new(request.request_id.clone(), payload)
    }

    pub fn is_compatible(&self) -> bool {
        self.protocol_version == PROTOCOL_VERSION
    }

    /// # Errors
    ///
    /// Returns [`ProtocolError::UnsupportedVersion`] for another version.
    pub fn check_version(&self) -> ProtocolResult<()> {
        if self.is_compatible() {
            Ok(())
        } else {
            Err(ProtocolError::UnsupportedVersion(
                self.protocol_version.clone(),
            ))
        }
    }
}

fn decode_body(content_type: &str, text: &str) -> ProtocolResult<Object> {
    Ok(serializer_for(content_type).deserialize(text)?)
}

/// A request as sent over the socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRequest {
    pub method: RequestMethod,
    pub uri: String,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl WireRequest {
    pub fn new(method: RequestMethod, uri: impl Into<String>, body: Option<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            body,
        }
    }

    /// Serializes `request` with `codec`.
    pub fn from_request(request: &Request, codec: &dyn Serializer) -> Self {
        Self {
            method: request.method(),
            uri: request.uri().to_string(),
            content_type: codec.content_type().to_string(),
            body: request.serialize_with(codec),
        }
    }

    /// Parses the body with the codec for its content type.
    pub fn decode_object(&self) -> ProtocolResult<Option<Object>> {
        self.body
            .as_deref()
            .map(|text| decode_body(&self.content_type, text))
            .transpose()
    }

    /// Rebuilds an owned [`Request`].
    ///
    /// # Errors
    ///
    /// Fails on an invalid URI or a malformed body.
    pub fn into_request(self) -> ProtocolResult<Request> {
        let object = self.decode_object()?;
        let uri = Uri::parse(&self.uri)?;
        Ok(Request::new(self.method, uri, object))
    }
}

/// What a reply carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ReplyBody {
    #[default]
    Empty,
    /// A serialized object.
    Object(String),
    /// Text supplied verbatim by the handler.
    Binary(String),
    Redirect { location: String },
}

/// A reply as sent over the socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireReply {
    pub status: u16,
    pub uri: String,
    pub content_type: String,
    pub body: ReplyBody,
}

impl WireReply {
    pub fn new(status: StatusCode, uri: &Uri, body: ReplyBody) -> Self {
        Self {
            status: status.as_u16(),
            uri: uri.to_string(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            body,
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn status_code(&self) -> ProtocolResult<StatusCode> {
        StatusCode::try_from(self.status)
    }

    /// Rebuilds an owned [`Reply`].
    ///
    /// Object and binary bodies are parsed with the codec for the content
    /// type. A redirect becomes a reply whose URI is the target location.
    ///
    /// # Errors
    ///
    /// Fails on an unknown status, an invalid URI or a malformed body.
    pub fn into_reply(self) -> ProtocolResult<Reply> {
        let status = self.status_code()?;
        match self.body {
            ReplyBody::Empty => Ok(Reply::new(Uri::parse(&self.uri)?, status, None)),
            ReplyBody::Binary(text) if text.trim().is_empty() => {
                Ok(Reply::new(Uri::parse(&self.uri)?, status, None))
            }
            ReplyBody::Object(text) | ReplyBody::Binary(text) => {
                let object = decode_body(&self.content_type, &text)?;
                Ok(Reply::new(Uri::parse(&self.uri)?, status, object))
            }
            ReplyBody::Redirect { location } => {
                Ok(Reply::new(Uri::parse(&location)?, status, None))
            }
        }
    }
}
