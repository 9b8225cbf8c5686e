//! Subscription, event, startup and shutdown policies.

use std::fmt;

use crate::error::{ProtocolError, ProtocolResult};

/// Lifecycle of an event subscription.
///
/// `Canceled` is terminal: once reached, only `Canceled` may be set again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionState {
    Subscribed,
    Canceled,
    Resubscribe,
    Invalid,
}

impl SubscriptionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subscribed => "subscribed",
            Self::Canceled => "canceled",
            Self::Resubscribe => "resubscribe",
            Self::Invalid => "invalid",
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Validates a move from `self` to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::SubscriptionStateViolation`] when leaving
    /// `Canceled`.
    pub fn transition(self, to: Self) -> ProtocolResult<Self> {
        match (self, to) {
            (Self::Canceled, Self::Canceled) => Ok(to),
            (Self::Canceled, _) => Err(ProtocolError::SubscriptionStateViolation { from: self, to }),
            _ => Ok(to),
        }
    }
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When notifications for an event are delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EventPolicy {
    /// On each change of the observed resource.
    #[default]
    Triggered,
    /// On a fixed interval.
    Periodic,
}

/// How a binder stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ShutdownPolicy {
    /// Abort in-flight work.
    Forced,
    /// Reject new work and let in-flight work finish.
    #[default]
    Graceful,
}

/// Whether `start` returns once serving or blocks until stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StartupPolicy {
    #[default]
    Detached,
    Attached,
}
