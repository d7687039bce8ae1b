//! Runtime orchestration.
//!
//! [`CampfireRuntime`] wires the pieces together from one
//! [`CampfireConfig`]:
//!
//! ```text
//!                ┌──────────────── LogicManager ─────────────────┐
//! OneBot ──POST──▶ receiver ──▶ dispatch ──▶ commands / forward ──▶ MsgQueue
//!   ▲                                                               │
//!   └──── HttpApiCaller ◀── POST /send_msg ── bridge ── GET /get_msg ┘◀── game
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! let runtime = CampfireRuntime::builder()
//!     .config_file("campfire.toml")
//!     .build()?;
//! runtime.run().await?;
//! ```

use std::future::Future;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use campfire_adapter_onebot::{ApiSettings, OneBotAdapter, receiver};
use campfire_forward::{BridgeState, ForwardSettings, IpAllowList, MsgQueue};
use campfire_framework::LogicManager;

use crate::config::{
    CampfireConfig, ConfigError, ConfigLoader, config_warnings, validate_config,
};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging::{self, LoggingError};

/// The assembled bot: chat adapter, command router, queue and bridge.
pub struct CampfireRuntime {
    config: CampfireConfig,
    manager: LogicManager,
    queue: Arc<MsgQueue>,
    adapter: OneBotAdapter,
    shutdown: CancellationToken,
}

impl CampfireRuntime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Validates `config`, initializes logging and registers the forwarding
    /// commands.
    ///
    /// A subscriber installed beforehand is kept.
    pub fn from_config(config: CampfireConfig) -> RuntimeResult<Self> {
        validate_config(&config)?;

        match logging::init_from_config(&config.logging) {
            Ok(()) => {}
            Err(LoggingError::Subscriber(_)) => {
                debug!("Global subscriber already installed, keeping it");
            }
            Err(e) => return Err(e.into()),
        }
        for warning in config_warnings(&config) {
            warn!("{warning}");
        }

        let adapter = OneBotAdapter::new(
            &ApiSettings {
                api_url: config.onebot.api_url.clone(),
                access_token: config.onebot.access_token.clone(),
                timeout: config.onebot.timeout(),
            },
            config.onebot.path.clone(),
        )?;
        let queue = Arc::new(MsgQueue::new(config.bridge.queue_capacity));
        let manager = LogicManager::new();
        campfire_forward::register(
            &manager,
            Arc::clone(&queue),
            &ForwardSettings {
                allowed_uids: config.auth.allowed_uids.clone(),
                allowed_groups: config.auth.allowed_groups.clone(),
                prompt_timeout: config.forward.prompt_timeout(),
            },
        )?;

        info!(
            log_level = %config.logging.level,
            routes = manager.router().route_count(),
            bind_groups = config.forward.bind_groups.len(),
            "Runtime initialized from configuration"
        );

        Ok(Self {
            config,
            manager,
            queue,
            adapter,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &CampfireConfig {
        &self.config
    }

    /// The logic manager, for registering extra routes before running.
    pub fn manager(&self) -> &LogicManager {
        &self.manager
    }

    pub fn queue(&self) -> &Arc<MsgQueue> {
        &self.queue
    }

    /// Cancelling the returned token stops [`run`](Self::run).
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs until Ctrl+C or SIGTERM.
    pub async fn run(&self) -> RuntimeResult<()> {
        self.run_until(wait_for_shutdown()).await
    }

    /// Binds the configured addresses and serves until `signal` resolves.
    pub async fn run_until<F>(&self, signal: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let onebot_addr: SocketAddr = self
            .config
            .onebot
            .listen
            .parse()
            .map_err(|_| ConfigError::invalid_address("onebot.listen", &self.config.onebot.listen))?;
        let bridge_host: IpAddr = self
            .config
            .bridge
            .host
            .parse()
            .map_err(|_| ConfigError::invalid_address("bridge.host", &self.config.bridge.host))?;
        let bridge_addr = SocketAddr::new(bridge_host, self.config.bridge.port);

        let onebot = bind(onebot_addr).await?;
        let bridge = bind(bridge_addr).await?;
        self.serve(onebot, bridge, signal).await
    }

    /// Serves on already bound listeners until `signal` resolves or a
    /// server stops on its own.
    pub async fn serve<F>(
        &self,
        onebot: TcpListener,
        bridge: TcpListener,
        signal: F,
    ) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let allow_list = IpAllowList::parse(&self.config.bridge.allowed_ips)?;
        let bridge_state = BridgeState::new(
            Arc::clone(&self.queue),
            self.adapter.transport(),
            self.config.forward.bind_groups.clone(),
        );
        let bridge_app = campfire_forward::router(bridge_state, allow_list);
        let onebot_app = self.adapter.router(Arc::new(self.manager.clone()));

        let mut servers = JoinSet::new();
        let token = self.shutdown.child_token();
        servers.spawn(async move {
            receiver::serve(onebot, onebot_app, token)
                .await
                .map_err(RuntimeError::from)
        });
        let token = self.shutdown.child_token();
        servers.spawn(async move {
            campfire_forward::serve(bridge, bridge_app, token)
                .await
                .map_err(RuntimeError::from)
        });

        info!("Campfire is running. Press Ctrl+C to stop.");

        let outcome = tokio::select! {
            _ = signal => Ok(()),
            _ = self.shutdown.cancelled() => Ok(()),
            Some(joined) = servers.join_next() => {
                warn!("A server stopped unexpectedly, shutting down");
                flatten(joined)
            }
        };

        self.stop();
        while let Some(joined) = servers.join_next().await {
            if let Err(e) = flatten(joined) {
                error!(error = %e, "Server failed during shutdown");
            }
        }
        info!("Runtime stopped");
        outcome
    }

    /// Stops the servers and cancels in-flight handler contexts.
    pub fn stop(&self) {
        self.shutdown.cancel();
        self.manager.shutdown();
    }
}

impl std::fmt::Debug for CampfireRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CampfireRuntime")
            .field("manager", &self.manager)
            .field("queue_len", &self.queue.len())
            .field("stopped", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

async fn bind(addr: SocketAddr) -> RuntimeResult<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| RuntimeError::Bind {
            addr: addr.to_string(),
            source,
        })
}

fn flatten(joined: Result<RuntimeResult<()>, tokio::task::JoinError>) -> RuntimeResult<()> {
    joined.map_err(|e| RuntimeError::Task(e.to_string()))?
}

/// Waits for Ctrl+C or, on unix, SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = signal::ctrl_c() => log_ctrl_c(result),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to register SIGTERM handler"),
        }
    }

    log_ctrl_c(signal::ctrl_c().await);
}

fn log_ctrl_c(result: io::Result<()>) {
    match result {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builds a [`CampfireRuntime`] from configuration sources.
#[derive(Default)]
pub struct RuntimeBuilder {
    config_file: Option<PathBuf>,
    profile: Option<String>,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    overrides: Option<CampfireConfig>,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            load_env: true,
            ..Default::default()
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Applies `config` above every other source.
    pub fn merge(mut self, config: CampfireConfig) -> Self {
        self.overrides = Some(config);
        self
    }

    pub fn build(self) -> RuntimeResult<CampfireRuntime> {
        let mut loader = ConfigLoader::new();
        if let Some(path) = &self.config_file {
            loader = loader.file(path);
        }
        if let Some(profile) = &self.profile {
            loader = loader.profile(profile);
        }
        for path in &self.search_paths {
            loader = loader.search_path(path);
        }
        if !self.load_env {
            loader = loader.without_env();
        }
        if let Some(config) = self.overrides {
            loader = loader.merge(config);
        }
        CampfireRuntime::from_config(loader.load()?)
    }
}
