//! Client-side event subscriptions.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::debug;

use crate::error::ProtocolResult;
use crate::policy::{EventPolicy, SubscriptionState};
use crate::uri::Uri;

/// Callback invoked after every successful state change.
pub type StateHandler = Arc<dyn Fn(&Uri, SubscriptionState) + Send + Sync>;

/// A subscription to the resource at a URI.
///
/// Events compare and order by URI only.
#[derive(Clone)]
pub struct Event {
    uri: Uri,
    policy: EventPolicy,
    state: SubscriptionState,
    state_handler: Option<StateHandler>,
}

impl Event {
    /// Creates a subscribed event.
    pub fn new(uri: Uri, policy: EventPolicy) -> Self {
        Self {
            uri,
            policy,
            state: SubscriptionState::Subscribed,
            state_handler: None,
        }
    }

    #[must_use]
    pub fn with_state_handler(
        mut self,
        handler: impl Fn(&Uri, SubscriptionState) + Send + Sync + 'static,
    ) -> Self {
        self.state_handler = Some(Arc::new(handler));
        self
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn policy(&self) -> EventPolicy {
        self.policy
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    pub fn is_subscribed(&self) -> bool {
        self.state == SubscriptionState::Subscribed
    }

    /// Cancels the subscription. Returns false if it was already canceled.
    pub fn unsubscribe(&mut self) -> ProtocolResult<bool> {
        if self.state.is_canceled() {
            return Ok(false);
        }
        self.set_subscription_state(SubscriptionState::Canceled)?;
        Ok(true)
    }

    /// Asks for the subscription to be renewed.
    ///
    /// # Errors
    ///
    /// Fails with `SubscriptionStateViolation` once canceled.
    pub fn resubscribe(&mut self) -> ProtocolResult<()> {
        self.set_subscription_state(SubscriptionState::Resubscribe)
    }

    /// Moves to `state`. Leaving `Canceled` is rejected.
    pub fn set_subscription_state(&mut self, state: SubscriptionState) -> ProtocolResult<()> {
        let previous = self.state;
        self.state = previous.transition(state)?;
        if previous != self.state {
            debug!(uri = %self.uri, from = %previous, to = %self.state, "subscription state changed");
            if let Some(handler) = &self.state_handler {
                handler(&self.uri, self.state);
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("uri", &self.uri)
            .field("policy", &self.policy)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.uri.cmp(&other.uri)
    }
}

impl Hash for Event {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolError;
    use std::sync::Mutex;

    fn event(path: &str) -> Event {
        Event::new(
            Uri::parse(&format!("http://h{path}")).unwrap(),
            EventPolicy::Triggered,
        )
    }

    #[test]
    fn unsubscribe_is_terminal_and_idempotent() {
        let mut event = event("/a");
        assert!(event.is_subscribed());
        assert!(event.unsubscribe().unwrap());
        assert!(!event.unsubscribe().unwrap());
        assert_eq!(event.state(), SubscriptionState::Canceled);

        let err = event.resubscribe().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::SubscriptionStateViolation {
                from: SubscriptionState::Canceled,
                to: SubscriptionState::Resubscribe,
            }
        ));
        assert!(event
            .set_subscription_state(SubscriptionState::Subscribed)
            .is_err());
        assert_eq!(event.state(), SubscriptionState::Canceled);
    }

    #[test]
    fn resubscribe_before_cancel() {
        let mut event = event("/a");
        event.resubscribe().unwrap();
        assert_eq!(event.state(), SubscriptionState::Resubscribe);
        event
            .set_subscription_state(SubscriptionState::Subscribed)
            .unwrap();
        assert!(event.is_subscribed());
    }

    #[test]
    fn handler_sees_transitions() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut event = event("/a").with_state_handler(move |_, state| {
            sink.lock().unwrap().push(state);
        });

        event.resubscribe().unwrap();
        event.resubscribe().unwrap();
        event.unsubscribe().unwrap();
        let _ = event.resubscribe();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![SubscriptionState::Resubscribe, SubscriptionState::Canceled]
        );
    }

    #[test]
    fn identity_is_the_uri() {
        let mut a = event("/a");
        let b = event("/a");
        a.unsubscribe().unwrap();
        assert_eq!(a, b);
        assert!(event("/a") < event("/b"));
    }
}
