//! Binder state machine and shutdown signalling.
//!
//! ```text
//! Created -> Starting -> Running -> Stopping -> Stopped
//!               |                                  |
//!               +---------> Stopped <--------------+--> Starting
//! ```
//!
//! State lives in a watch channel so any task can wait for a binder to stop
//! without holding a lock the stopping side needs.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::error::{ProtocolError, ProtocolResult};
use crate::policy::ShutdownPolicy;

/// Where a binder is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BinderState {
    #[default]
    Created,
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl BinderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }

    /// True between the start of `start` and the end of `stop`.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Starting | Self::Running | Self::Stopping)
    }
}

impl fmt::Display for BinderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared lifecycle state of one binder.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    tx: Arc<watch::Sender<BinderState>>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(BinderState::Created);
        Self { tx: Arc::new(tx) }
    }

    pub fn state(&self) -> BinderState {
        *self.tx.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state() == BinderState::Running
    }

    /// `Created | Stopped -> Starting`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidTransition`] from any other state.
    pub fn begin_start(&self) -> ProtocolResult<()> {
        let mut current = BinderState::Created;
        let started = self.tx.send_if_modified(|state| {
            current = *state;
            match *state {
                BinderState::Created | BinderState::Stopped => {
                    *state = BinderState::Starting;
                    true
                }
                _ => false,
            }
        });
        if started {
            debug!(from = %current, "binder starting");
            Ok(())
        } else {
            Err(ProtocolError::InvalidTransition {
                state: current,
                action: "start",
            })
        }
    }

    /// `Starting -> Running`. Returns false if a stop raced ahead.
    pub fn mark_running(&self) -> bool {
        self.transition(BinderState::Starting, BinderState::Running)
    }

    /// `Starting -> Stopped`, after a failed start.
    pub fn abort_start(&self) -> bool {
        self.transition(BinderState::Starting, BinderState::Stopped)
    }

    /// `Starting | Running -> Stopping`.
    ///
    /// Returns false when there is nothing to stop or another caller is
    /// already stopping; that caller owns the shutdown.
    pub fn begin_stop(&self) -> bool {
        self.tx.send_if_modified(|state| match *state {
            BinderState::Starting | BinderState::Running => {
                *state = BinderState::Stopping;
                true
            }
            _ => false,
        })
    }

    /// `Stopping -> Stopped`.
    pub fn mark_stopped(&self) -> bool {
        self.transition(BinderState::Stopping, BinderState::Stopped)
    }

    /// Suspends until the binder is no longer active.
    pub async fn wait_stopped(&self) {
        let mut rx = self.tx.subscribe();
        // the sender lives in `self`, so the channel cannot close here
        let _ = rx.wait_for(|state| !state.is_active()).await;
    }

    /// Receives every state change.
    pub fn subscribe(&self) -> watch::Receiver<BinderState> {
        self.tx.subscribe()
    }

    fn transition(&self, from: BinderState, to: BinderState) -> bool {
        let changed = self.tx.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        });
        if changed {
            debug!(%from, %to, "binder state changed");
        }
        changed
    }
}

/// Broadcasts a stop request to in-flight work.
///
/// A forced request is never downgraded by a later graceful one.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<Option<ShutdownPolicy>>>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn trigger(&self, policy: ShutdownPolicy) {
        self.tx.send_if_modified(|current| {
            if *current == Some(ShutdownPolicy::Forced) || *current == Some(policy) {
                return false;
            }
            *current = Some(policy);
            true
        });
    }

    pub fn policy(&self) -> Option<ShutdownPolicy> {
        *self.tx.borrow()
    }

    pub fn is_shutdown(&self) -> bool {
        self.policy().is_some()
    }

    pub fn is_forced(&self) -> bool {
        self.policy() == Some(ShutdownPolicy::Forced)
    }

    /// Clears any previous request so the owner can start again.
    pub fn rearm(&self) {
        self.tx.send_replace(None);
    }

    /// Completes on any stop request.
    pub fn wait(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
            forced_only: false,
        }
    }

    /// Completes only on a forced stop request.
    pub fn wait_forced(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
            forced_only: true,
        }
    }
}

/// A future-producing token that completes when shutdown is requested.
pub struct ShutdownSignal {
    rx: watch::Receiver<Option<ShutdownPolicy>>,
    forced_only: bool,
}

impl ShutdownSignal {
    /// Waits for the request and returns its policy.
    ///
    /// If every handle is dropped the wait ends as a forced shutdown.
    pub async fn wait(mut self) -> ShutdownPolicy {
        let forced_only = self.forced_only;
        let result = self.rx.wait_for(|policy| match policy {
            Some(ShutdownPolicy::Forced) => true,
            Some(ShutdownPolicy::Graceful) => !forced_only,
            None => false,
        });
        match result.await {
            Ok(policy) => (*policy).unwrap_or(ShutdownPolicy::Forced),
            Err(_) => ShutdownPolicy::Forced,
        }
    }
}
