//! Unix signal handling for a serving process.
//!
//! - SIGTERM/SIGINT: graceful stop
//! - a second SIGTERM/SIGINT while stopping: forced stop

use rested_protocol::{ShutdownHandle, ShutdownPolicy, ShutdownSignal};
use tracing::{debug, error, info};

/// Turns process signals into shutdown requests.
#[derive(Debug, Clone, Default)]
pub struct SignalHandler {
    shutdown: ShutdownHandle,
}

impl SignalHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns the signal listener task.
    #[cfg(unix)]
    pub fn spawn_listener(&self) {
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            use tokio::signal::unix::{SignalKind, signal};

            let (mut sigterm, mut sigint) =
                match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                    (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                    (Err(e), _) | (_, Err(e)) => {
                        error!(error = %e, "failed to install signal handlers");
                        return;
                    }
                };

            loop {
                let name = tokio::select! {
                    _ = sigterm.recv() => "SIGTERM",
                    _ = sigint.recv() => "SIGINT",
                };
                if shutdown.is_shutdown() {
                    info!(signal = name, "received second signal, forcing shutdown");
                    shutdown.trigger(ShutdownPolicy::Forced);
                    break;
                }
                info!(signal = name, "received signal, initiating shutdown");
                shutdown.trigger(ShutdownPolicy::Graceful);
            }

            debug!("signal listener stopped");
        });
    }

    /// Handles Ctrl+C only.
    #[cfg(not(unix))]
    pub fn spawn_listener(&self) {
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if shutdown.is_shutdown() {
                    info!("received second Ctrl+C, forcing shutdown");
                    shutdown.trigger(ShutdownPolicy::Forced);
                    break;
                }
                info!("received Ctrl+C, initiating shutdown");
                shutdown.trigger(ShutdownPolicy::Graceful);
            }
        });
    }

    /// Completes on the first shutdown request.
    pub fn shutdown(&self) -> ShutdownSignal {
        self.shutdown.wait()
    }

    /// Completes once a forced shutdown is requested.
    pub fn forced(&self) -> ShutdownSignal {
        self.shutdown.wait_forced()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_shutdown()
    }

    /// Requests a shutdown without a signal.
    pub fn trigger(&self, policy: ShutdownPolicy) {
        self.shutdown.trigger(policy);
    }

    /// A handle sharing this handler's shutdown state.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn programmatic_shutdown() {
        let handler = SignalHandler::new();
        assert!(!handler.is_shutdown());

        let signal = handler.shutdown();
        let handle = handler.shutdown_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.trigger(ShutdownPolicy::Graceful);
        });

        let policy = tokio::time::timeout(Duration::from_secs(1), signal.wait())
            .await
            .unwrap();
        assert_eq!(policy, ShutdownPolicy::Graceful);
        assert!(handler.is_shutdown());
    }

    #[tokio::test]
    async fn forced_waits_for_escalation() {
        let handler = SignalHandler::new();
        handler.trigger(ShutdownPolicy::Graceful);

        let forced = tokio::spawn(handler.forced().wait());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!forced.is_finished());

        handler.trigger(ShutdownPolicy::Forced);
        assert_eq!(forced.await.unwrap(), ShutdownPolicy::Forced);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn listener_spawns() {
        let handler = SignalHandler::new();
        handler.spawn_listener();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handler.is_shutdown());
    }
}
