//! The server facade.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::future::join_all;
use rested_protocol::{
    BinderState, ErrorCode, ShutdownPolicy, StartupPolicy, SubscriptionState, Uri,
};
use tracing::{error, info};

use crate::binder::{RequestHandler, ServerProtocolBinder};
use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::event::ServerEvent;
use crate::signals::SignalHandler;
use crate::socket::SocketServerBinder;

/// A named server that fans lifecycle calls out to its bindings.
pub struct Server {
    instance_id: String,
    bindings: Vec<Box<dyn ServerProtocolBinder>>,
}

impl Server {
    /// Creates a server with one socket binding on the default address.
    pub fn new(instance_id: impl Into<String>, handler: RequestHandler) -> Self {
        Self::with_config(instance_id, ServerConfig::default(), handler)
    }

    pub fn with_config(
        instance_id: impl Into<String>,
        config: ServerConfig,
        handler: RequestHandler,
    ) -> Self {
        Self::with_bindings(
            instance_id,
            vec![Box::new(SocketServerBinder::new(config, handler))],
        )
    }

    pub fn with_bindings(
        instance_id: impl Into<String>,
        bindings: Vec<Box<dyn ServerProtocolBinder>>,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            bindings,
        }
    }

    pub fn add_binding(&mut self, binding: impl ServerProtocolBinder + 'static) {
        self.bindings.push(Box::new(binding));
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn states(&self) -> Vec<BinderState> {
        self.bindings.iter().map(|b| b.state()).collect()
    }

    /// Addresses of the bindings that are listening.
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.bindings.iter().filter_map(|b| b.local_addr()).collect()
    }

    /// Starts every binding.
    ///
    /// If any binding fails, the ones that started are stopped again and the
    /// first error is returned. With [`StartupPolicy::Attached`] this returns
    /// once every binding has stopped.
    pub async fn start(&self, policy: StartupPolicy) -> ServerResult<()> {
        info!(instance = %self.instance_id, bindings = self.bindings.len(), "starting server");

        let mut results = join_all(
            self.bindings
                .iter()
                .map(|b| b.start(StartupPolicy::Detached)),
        )
        .await;

        if let Some(position) = results.iter().position(Result::is_err) {
            error!(instance = %self.instance_id, "server failed to start, rolling back");
            join_all(self.bindings.iter().map(|b| b.stop(ShutdownPolicy::Forced))).await;
            return results.swap_remove(position);
        }

        if policy == StartupPolicy::Attached {
            join_all(self.bindings.iter().map(|b| b.stopped())).await;
        }
        Ok(())
    }

    /// Stops every binding, returning the first error.
    pub async fn stop(&self, policy: ShutdownPolicy) -> ServerResult<()> {
        info!(instance = %self.instance_id, ?policy, "stopping server");
        join_all(self.bindings.iter().map(|b| b.stop(policy)))
            .await
            .into_iter()
            .collect()
    }

    /// Starts the server and serves until SIGTERM or SIGINT.
    pub async fn serve_until_signal(&self) -> ServerResult<()> {
        let signals = SignalHandler::new();
        signals.spawn_listener();
        self.serve_until(signals).await
    }

    async fn serve_until(&self, signals: SignalHandler) -> ServerResult<()> {
        self.start(StartupPolicy::Detached).await?;
        let policy = signals.shutdown().wait().await;
        let forced = signals.forced();

        tokio::select! {
            result = self.stop(policy) => result,
            _ = forced.wait() => self.stop(ShutdownPolicy::Forced).await,
        }
    }

    /// The last error of the first binding, in registration order, that has
    /// reported one. Errors are not ordered across bindings.
    pub fn error(&self) -> Option<ErrorCode> {
        self.bindings.iter().find_map(|b| b.error())
    }

    pub fn observe_error(&self, handler: impl Fn(ErrorCode) + Send + Sync + 'static) {
        let handler = Arc::new(handler);
        for binding in &self.bindings {
            binding.observe_error(handler.clone());
        }
    }

    /// Registers callbacks for new subscriptions and their state changes.
    pub fn observe_subscriptions(
        &self,
        handler: impl Fn(&ServerEvent) + Send + Sync + 'static,
        state_handler: impl Fn(&Uri, SubscriptionState) + Send + Sync + 'static,
    ) {
        let handler = Arc::new(handler);
        let state_handler = Arc::new(state_handler);
        for binding in &self.bindings {
            binding.observe_subscriptions(handler.clone(), state_handler.clone());
        }
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("instance_id", &self.instance_id)
            .field("states", &self.states())
            .finish()
    }
}
