//! `Gateway` builder: the entry point that wires everything together.
//!
//! A gateway owns the shared [`SessionStore`] and the background
//! [`ExpirySweeper`], and hands out dispatchers bound to that store. The
//! embedding listener routes each incoming call to one of them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sessiongate_session::{SessionConfig, SessionStore};
use sessiongate_sweep::{ExpirySweeper, SweepConfig, SweepMetrics, SweeperHandle};

use crate::{AuthDispatcher, DispatchConfig, LoginConfig, LoginDispatcher, LoginHandler, OperationHandler};

/// Every setting a gateway needs, in one serde-loadable value.
///
/// ```json
/// {
///   "session": { "session_idle_timeout_ms": 900000 },
///   "dispatch": { "operation_logging": true },
///   "login": { "not_correct_message": "Wrong credentials." }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Idle timeout and sweep interval.
    pub session: SessionConfig,
    /// Defaults for operation dispatchers.
    pub dispatch: DispatchConfig,
    /// Defaults for login dispatchers.
    pub login: LoginConfig,
}

/// Builder for configuring and starting a [`Gateway`].
///
/// # Example
///
/// ```rust,ignore
/// let gateway = Gateway::builder()
///     .session_config(SessionConfig { session_idle_timeout_ms: 900_000, ..Default::default() })
///     .build();
/// let login = gateway.login(MyLogin);
/// let notes = gateway.operation(MyNotes);
/// ```
pub struct GatewayBuilder {
    config: GatewayConfig,
    sweeper: bool,
}

impl GatewayBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            config: GatewayConfig::default(),
            sweeper: true,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    /// Sets the default operation dispatcher configuration.
    pub fn dispatch_config(mut self, config: DispatchConfig) -> Self {
        self.config.dispatch = config;
        self
    }

    /// Sets the default login dispatcher configuration.
    pub fn login_config(mut self, config: LoginConfig) -> Self {
        self.config.login = config;
        self
    }

    /// Builds without a background sweeper. Idle sessions are then only
    /// evicted by explicit [`Gateway::sweep_now`] calls.
    pub fn without_sweeper(mut self) -> Self {
        self.sweeper = false;
        self
    }

    /// Builds the gateway and starts its sweeper.
    ///
    /// Must be called from within a tokio runtime unless
    /// [`without_sweeper`](Self::without_sweeper) was used.
    pub fn build(self) -> Gateway {
        let store = Arc::new(SessionStore::new());
        let sweep_config = SweepConfig::from(&self.config.session);
        let sweeper = self
            .sweeper
            .then(|| ExpirySweeper::new(Arc::clone(&store), sweep_config.clone()).spawn());

        tracing::info!(
            idle_timeout_ms = self.config.session.session_idle_timeout_ms,
            sweep_interval_ms = self.config.session.sweep_interval_ms,
            sweeper = sweeper.is_some(),
            "gateway started"
        );

        Gateway {
            store,
            config: self.config,
            sweep_config,
            sweeper,
        }
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running gateway: one session store, one sweeper, any number of
/// dispatchers.
pub struct Gateway {
    store: Arc<SessionStore>,
    config: GatewayConfig,
    sweep_config: SweepConfig,
    sweeper: Option<SweeperHandle>,
}

impl Gateway {
    /// Creates a new builder.
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    /// The shared session store.
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// The gateway's configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// An operation dispatcher using the gateway's default dispatch config.
    pub fn operation<H: OperationHandler>(&self, handler: H) -> AuthDispatcher<H> {
        self.operation_with(handler, self.config.dispatch.clone())
    }

    /// An operation dispatcher with its own config.
    pub fn operation_with<H: OperationHandler>(&self, handler: H, config: DispatchConfig) -> AuthDispatcher<H> {
        AuthDispatcher::new(Arc::clone(&self.store), handler, config)
    }

    /// A login dispatcher using the gateway's default login config.
    pub fn login<H: LoginHandler>(&self, handler: H) -> LoginDispatcher<H> {
        self.login_with(handler, self.config.login.clone())
    }

    /// A login dispatcher with its own config.
    pub fn login_with<H: LoginHandler>(&self, handler: H, config: LoginConfig) -> LoginDispatcher<H> {
        LoginDispatcher::new(Arc::clone(&self.store), handler, config)
    }

    /// Runs one sweep right away, independent of the background task.
    /// Returns the number of evicted sessions.
    pub fn sweep_now(&self) -> usize {
        ExpirySweeper::new(Arc::clone(&self.store), self.sweep_config.clone())
            .sweep_once()
            .len()
    }

    /// Metrics of the background sweeper, if one is running.
    pub fn sweep_metrics(&self) -> Option<SweepMetrics> {
        self.sweeper.as_ref().map(SweeperHandle::metrics)
    }

    /// Stops the sweeper and waits for it. Sessions stay in the store.
    pub async fn shutdown(mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.shutdown().await;
        }
        tracing::info!(live_sessions = self.store.len(), "gateway stopped");
    }
}
