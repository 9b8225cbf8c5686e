//! Server side of a subscription.

use std::fmt;

use rested_core::Object;
use rested_protocol::{ErrorCode, StateHandler, SubscriptionState, Uri};
use tracing::{debug, warn};

use crate::error::{ServerError, ServerResult};

/// An event source a client subscribed to.
///
/// Notifications are accepted while the subscription is live. No transport
/// carries them to subscribers yet, so an accepted notification is logged
/// and dropped.
#[derive(Clone)]
pub struct ServerEvent {
    uri: Uri,
    state: SubscriptionState,
    state_handler: Option<StateHandler>,
}

impl ServerEvent {
    pub fn new(uri: Uri) -> Self {
        Self {
            uri,
            state: SubscriptionState::Subscribed,
            state_handler: None,
        }
    }

    /// Calls `handler` on every state change.
    #[must_use]
    pub fn with_state_handler(mut self, handler: StateHandler) -> Self {
        self.state_handler = Some(handler);
        self
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    pub fn set_subscription_state(&mut self, state: SubscriptionState) -> ServerResult<()> {
        let from = self.state;
        self.state = from.transition(state)?;
        if from != self.state {
            debug!(uri = %self.uri, %from, to = %self.state, "subscription state changed");
            if let Some(handler) = &self.state_handler {
                handler(&self.uri, self.state);
            }
        }
        Ok(())
    }

    /// Publishes a document to the subscriber.
    pub async fn notify(&self, object: Object) -> ServerResult<()> {
        self.ensure_live()?;
        debug!(uri = %self.uri, fields = object.len(), "notification accepted");
        Ok(())
    }

    /// Publishes an empty notification.
    pub async fn notify_empty(&self) -> ServerResult<()> {
        self.ensure_live()?;
        debug!(uri = %self.uri, "empty notification accepted");
        Ok(())
    }

    /// Tells the subscriber the event source failed.
    pub fn send_error(&self, code: ErrorCode, message: &str) {
        warn!(uri = %self.uri, code = %code, detail = message, "event source error");
    }

    fn ensure_live(&self) -> ServerResult<()> {
        if self.state.is_canceled() {
            return Err(ServerError::SubscriptionCanceled {
                uri: self.uri.clone(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for ServerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerEvent")
            .field("uri", &self.uri)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn event() -> ServerEvent {
        ServerEvent::new(Uri::parse("http://localhost/feeds/news").unwrap())
    }

    #[tokio::test]
    async fn notify_while_subscribed() {
        let event = event();
        assert_eq!(event.state(), SubscriptionState::Subscribed);
        event.notify(Object::new().with_field("headline", "hi")).await.unwrap();
        event.notify_empty().await.unwrap();
    }

    #[tokio::test]
    async fn canceled_event_rejects_notifications() {
        let mut event = event();
        event.set_subscription_state(SubscriptionState::Canceled).unwrap();

        let err = event.notify_empty().await.unwrap_err();
        assert!(matches!(err, ServerError::SubscriptionCanceled { .. }));
        assert_eq!(err.code(), ErrorCode::Rejected);

        let err = event
            .set_subscription_state(SubscriptionState::Subscribed)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Rejected);
    }

    #[test]
    fn state_handler_sees_changes_only() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut event = event().with_state_handler(Arc::new(move |_uri: &Uri, state: SubscriptionState| {
            sink.lock().unwrap().push(state);
        }));

        event.set_subscription_state(SubscriptionState::Subscribed).unwrap();
        event.set_subscription_state(SubscriptionState::Resubscribe).unwrap();
        event.set_subscription_state(SubscriptionState::Canceled).unwrap();
        event.set_subscription_state(SubscriptionState::Canceled).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            [SubscriptionState::Resubscribe, SubscriptionState::Canceled]
        );
    }
}
