//! Client-side request and reply messages.
//!
//! Both own their payload. They are not `Clone`: a caller that wants to keep
//! a payload while handing it to a message clones the [`Object`] itself.

use rested_core::{Object, Serializer};

use crate::header::{ReplyHeader, RequestHeader, RequestMethod, StatusCode};
use crate::uri::Uri;

/// A request and its optional payload.
#[derive(Debug, PartialEq)]
pub struct Request {
    header: RequestHeader,
    object: Option<Object>,
}

impl Request {
    /// Creates a request, taking ownership of `object`.
    ///
    /// ```rust
    /// use rested_core::Object;
    /// use rested_protocol::{Request, RequestMethod, Uri};
    ///
    /// let uri = Uri::parse("http://localhost:8080/items").unwrap();
    /// let request = Request::new(RequestMethod::Post, uri, Object::new().with_field("id", 7));
    /// assert!(request.has_object());
    ///
    /// let uri = Uri::parse("http://localhost:8080/items").unwrap();
    /// let request = Request::new(RequestMethod::Get, uri, None);
    /// assert!(!request.has_object());
    /// ```
    pub fn new(method: RequestMethod, uri: Uri, object: impl Into<Option<Object>>) -> Self {
        Self {
            header: RequestHeader::new(method, uri),
            object: object.into(),
        }
    }

    pub fn header(&self) -> &RequestHeader {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut RequestHeader {
        &mut self.header
    }

    pub fn method(&self) -> RequestMethod {
        self.header.method()
    }

    pub fn uri(&self) -> &Uri {
        self.header.uri()
    }

    pub fn has_object(&self) -> bool {
        self.object.is_some()
    }

    pub fn object(&self) -> Option<&Object> {
        self.object.as_ref()
    }

    pub fn object_mut(&mut self) -> Option<&mut Object> {
        self.object.as_mut()
    }

    /// Replaces the payload, returning the previous one.
    pub fn replace_object(&mut self, object: Object) -> Option<Object> {
        self.object.replace(object)
    }

    /// Moves the payload out of the request.
    pub fn release_object(&mut self) -> Option<Object> {
        self.object.take()
    }

    /// Serializes the payload. The request keeps its payload.
    pub fn release_binary(&self) -> Option<String> {
        self.object.as_ref().map(Object::serialize)
    }

    /// Serializes the payload with `codec`.
    pub fn serialize_with(&self, codec: &dyn Serializer) -> Option<String> {
        self.object.as_ref().map(|o| codec.serialize_object(o))
    }

    pub fn into_parts(self) -> (RequestHeader, Option<Object>) {
        (self.header, self.object)
    }
}

/// A reply and its optional payload.
#[derive(Debug, Default, PartialEq)]
pub struct Reply {
    header: ReplyHeader,
    object: Option<Object>,
}

impl Reply {
    pub fn new(uri: Uri, status: StatusCode, object: impl Into<Option<Object>>) -> Self {
        Self {
            header: ReplyHeader::new(uri, status),
            object: object.into(),
        }
    }

    pub fn header(&self) -> &ReplyHeader {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut ReplyHeader {
        &mut self.header
    }

    pub fn status(&self) -> StatusCode {
        self.header.status()
    }

    pub fn uri(&self) -> &Uri {
        self.header.uri()
    }

    pub fn has_object(&self) -> bool {
        self.object.is_some()
    }

    pub fn object(&self) -> Option<&Object> {
        self.object.as_ref()
    }

    /// Moves the payload out of the reply.
    pub fn release_object(&mut self) -> Option<Object> {
        self.object.take()
    }

    /// Serializes the payload. The reply keeps its payload.
    pub fn release_binary(&self) -> Option<String> {
        self.object.as_ref().map(Object::serialize)
    }

    pub fn into_parts(self) -> (ReplyHeader, Option<Object>) {
        (self.header, self.object)
    }
}
