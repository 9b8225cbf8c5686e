//! Requests as seen by a request handler, and the reply handle that answers them.

use rested_core::{Object, serializer_for};
use rested_protocol::{
    ReplyBody, ReplyHeader, Request, RequestHeader, RequestMethod, StatusCode, Uri, WireReply,
};
use tokio::sync::oneshot;
use tracing::warn;

use crate::error::{ServerError, ServerResult};

/// An incoming request.
///
/// The request owns its payload and cannot be copied. A handler that needs
/// the payload after releasing it clones the [`Object`].
#[derive(Debug, PartialEq)]
pub struct ServerRequest {
    header: RequestHeader,
    object: Option<Object>,
}

impl ServerRequest {
    pub fn new(method: RequestMethod, uri: Uri, object: impl Into<Option<Object>>) -> Self {
        Self {
            header: RequestHeader::new(method, uri),
            object: object.into(),
        }
    }

    pub fn header(&self) -> &RequestHeader {
        &self.header
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

    /// Takes the payload out of the request.
    pub fn release_object(&mut self) -> Option<Object> {
        self.object.take()
    }

    /// The payload rendered as a JSON document.
    pub fn release_binary(&self) -> Option<String> {
        self.object.as_ref().map(Object::serialize)
    }
}

impl From<Request> for ServerRequest {
    fn from(request: Request) -> Self {
        let (header, object) = request.into_parts();
        Self { header, object }
    }
}

/// A reply on its way to the connection.
#[derive(Debug)]
struct Outgoing {
    reply: WireReply,
    ack: oneshot::Sender<ServerResult<()>>,
}

/// Handle used by a request handler to answer exactly once.
///
/// The terminal methods (`send`, `send_empty`, `send_binary`, `redirect`)
/// consume the handle and resolve once the reply has been written. A handle
/// dropped without answering produces a `500 Internal Server Error`.
#[derive(Debug)]
pub struct ServerReply {
    header: ReplyHeader,
    content_type: String,
    outlet: Option<oneshot::Sender<Outgoing>>,
}

impl ServerReply {
    /// Creates a reply for a request to `uri`, and the receiving end a
    /// binding uses to pick it up.
    pub fn new(uri: Uri, content_type: impl Into<String>) -> (Self, PendingReply) {
        let (tx, rx) = oneshot::channel();
        let reply = Self {
            header: ReplyHeader::new(uri, StatusCode::Ok),
            content_type: content_type.into(),
            outlet: Some(tx),
        };
        (reply, PendingReply { rx })
    }

    pub fn header(&self) -> &ReplyHeader {
        &self.header
    }

    pub fn status(&self) -> StatusCode {
        self.header.status()
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.header.set_status(status);
    }

    /// Answers with a document.
    pub async fn send(self, object: Object) -> ServerResult<()> {
        let body = serializer_for(&self.content_type).serialize_object(&object);
        self.deliver(ReplyBody::Object(body)).await
    }

    /// Answers with the status only.
    pub async fn send_empty(self) -> ServerResult<()> {
        self.deliver(ReplyBody::Empty).await
    }

    /// Answers with pre-rendered text, passed through untouched.
    pub async fn send_binary(self, text: impl Into<String>) -> ServerResult<()> {
        self.deliver(ReplyBody::Binary(text.into())).await
    }

    /// Points the client at `location`. A non-redirect status becomes `302 Found`.
    pub async fn redirect(mut self, location: Uri) -> ServerResult<()> {
        if !self.header.status().is_redirection() {
            self.header.set_status(StatusCode::Found);
        }
        let location = location.to_string();
        self.deliver(ReplyBody::Redirect { location }).await
    }

    async fn deliver(mut self, body: ReplyBody) -> ServerResult<()> {
        let Some(outlet) = self.outlet.take() else {
            return Err(ServerError::ReplyDropped);
        };
        let reply = WireReply::new(self.header.status(), self.header.uri(), body)
            .with_content_type(self.content_type.as_str());

        let (ack, done) = oneshot::channel();
        outlet
            .send(Outgoing { reply, ack })
            .map_err(|_| ServerError::ReplyDropped)?;
        done.await.map_err(|_| ServerError::ReplyDropped)?
    }
}

impl Drop for ServerReply {
    fn drop(&mut self) {
        let Some(outlet) = self.outlet.take() else {
            return;
        };
        warn!(uri = %self.header.uri(), "reply dropped without an answer");
        let (ack, _) = oneshot::channel();
        let reply = WireReply::new(
            StatusCode::InternalServerError,
            self.header.uri(),
            ReplyBody::Empty,
        );
        let _ = outlet.send(Outgoing { reply, ack });
    }
}

/// Receiving end of a [`ServerReply`], held by the binding.
#[derive(Debug)]
pub struct PendingReply {
    rx: oneshot::Receiver<Outgoing>,
}

impl PendingReply {
    /// Waits for the handler's answer.
    ///
    /// Returns `None` if the reply vanished without producing one.
    pub async fn recv(self) -> Option<(WireReply, ReplyAck)> {
        let Outgoing { reply, ack } = self.rx.await.ok()?;
        Some((reply, ReplyAck { tx: ack }))
    }
}

/// Tells the handler how writing its reply went.
#[derive(Debug)]
pub struct ReplyAck {
    tx: oneshot::Sender<ServerResult<()>>,
}

impl ReplyAck {
    pub fn complete(self, result: ServerResult<()>) {
        let _ = self.tx.send(result);
    }
}
