//! Transport error classification and observation.
//!
//! Every binder owns an [`ErrorSlot`]. Failures are reported into it once and
//! become visible both through [`ErrorSlot::last`] and to every registered
//! observer, so the pull and push channels never disagree.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Could not reach the peer.
    ConnectionFailed,
    Timeout,
    /// The binder is not running.
    NotRunning,
    /// The listen address is taken.
    AddressInUse,
    Io,
    /// A payload could not be parsed.
    MalformedDocument,
    /// Frame or envelope level violation.
    Protocol,
    /// The operation was refused, e.g. a shutdown in progress.
    Rejected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectionFailed => "connection_failed",
            Self::Timeout => "timeout",
            Self::NotRunning => "not_running",
            Self::AddressInUse => "address_in_use",
            Self::Io => "io",
            Self::MalformedDocument => "malformed_document",
            Self::Protocol => "protocol",
            Self::Rejected => "rejected",
        }
    }

    /// Returns true if retrying the same operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed | Self::Timeout | Self::NotRunning | Self::AddressInUse
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback invoked with every reported error.
pub type ErrorHandler = Arc<dyn Fn(ErrorCode) + Send + Sync>;

#[derive(Default)]
struct SlotInner {
    last: Option<ErrorCode>,
    observers: Vec<ErrorHandler>,
}

/// Shared latest-error state with observers.
#[derive(Clone, Default)]
pub struct ErrorSlot {
    inner: Arc<Mutex<SlotInner>>,
}

impl ErrorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `code` and notifies every observer.
    pub fn report(&self, code: ErrorCode) {
        let observers = {
            let mut inner = self.lock();
            inner.last = Some(code);
            inner.observers.clone()
        };
        debug!(%code, observers = observers.len(), "transport error reported");
        for observer in observers {
            observer(code);
        }
    }

    /// Returns the most recently reported error.
    pub fn last(&self) -> Option<ErrorCode> {
        self.lock().last
    }

    /// Registers a callback for future reports.
    pub fn observe(&self, handler: impl Fn(ErrorCode) + Send + Sync + 'static) {
        self.observe_shared(Arc::new(handler));
    }

    /// Registers an already shared callback, so one handler can watch several slots.
    pub fn observe_shared(&self, handler: ErrorHandler) {
        self.lock().observers.push(handler);
    }

    /// Forgets the last error. Observers stay registered.
    pub fn clear(&self) {
        self.lock().last = None;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SlotInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ErrorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("ErrorSlot")
            .field("last", &inner.last)
            .field("observers", &inner.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn pull_and_push_agree() {
        let slot = ErrorSlot::new();
        assert_eq!(slot.last(), None);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        slot.observe(move |code| sink.lock().unwrap().push(code));

        slot.report(ErrorCode::Timeout);
        slot.report(ErrorCode::ConnectionFailed);

        assert_eq!(slot.last(), Some(ErrorCode::ConnectionFailed));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![ErrorCode::Timeout, ErrorCode::ConnectionFailed]
        );
    }

    #[test]
    fn clones_share_state() {
        let slot = ErrorSlot::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        slot.clone()
            .observe(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        slot.report(ErrorCode::Io);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        slot.clear();
        assert_eq!(slot.last(), None);
    }

    #[test]
    fn observer_may_read_slot() {
        let slot = ErrorSlot::new();
        let inner = slot.clone();
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        slot.observe(move |_| *sink.lock().unwrap() = inner.last());

        slot.report(ErrorCode::Protocol);
        assert_eq!(*seen.lock().unwrap(), Some(ErrorCode::Protocol));
    }

    #[test]
    fn display_and_retry() {
        assert_eq!(ErrorCode::AddressInUse.to_string(), "address_in_use");
        assert!(ErrorCode::Timeout.is_retryable());
        assert!(!ErrorCode::MalformedDocument.is_retryable());
    }
}
