//! Server lifecycle: ordered startup, readiness, and shutdown.
//!
//! ```text
//! Initializing ──(store connected, socket bound)──▶ Ready ──(signal)──▶ Terminated
//!      │                                                                   ▲
//!      └──────────────────────(any startup error)──────────────────────────┘
//! ```
//!
//! The listening socket is bound only after the store connector succeeds, so a
//! process that cannot reach its store never accepts a connection.

use std::{
    future::Future,
    io,
    net::SocketAddr,
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
};

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::{
    auth::{Authenticator, TokenVerifier},
    config::Config,
    jobs::{FunctionRegistry, JobBus},
    server::{router, state::AppState},
    store::{ConnectionError, StoreConnector},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReadinessState {
    Initializing = 0,
    Ready = 1,
    Terminated = 2,
}

impl ReadinessState {
    pub fn as_str(self) -> &'static str {
        match self {
            ReadinessState::Initializing => "initializing",
            ReadinessState::Ready => "ready",
            ReadinessState::Terminated => "terminated",
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => ReadinessState::Initializing,
            1 => ReadinessState::Ready,
            _ => ReadinessState::Terminated,
        }
    }
}

/// Shared readiness flag, read by the health route.
#[derive(Debug, Clone)]
pub struct Readiness(Arc<AtomicU8>);

impl Default for Readiness {
    fn default() -> Self {
        Self(Arc::new(AtomicU8::new(ReadinessState::Initializing as u8)))
    }
}

impl Readiness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ReadinessState {
        ReadinessState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ReadinessState::Ready
    }

    /// `Initializing → Ready`. Has no effect once terminated.
    pub fn mark_ready(&self) -> bool {
        self.0
            .compare_exchange(
                ReadinessState::Initializing as u8,
                ReadinessState::Ready as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Irreversible.
    pub fn terminate(&self) {
        self.0.store(ReadinessState::Terminated as u8, Ordering::Release);
    }
}

/// Fatal errors raised before the server accepts traffic.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Store(#[from] ConnectionError),

    #[error("invalid identity verification key: {0}")]
    Auth(#[from] jsonwebtoken::errors::Error),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// A bound listener with its router, ready to accept connections.
pub struct ReadyServer {
    listener: TcpListener,
    router: Router,
    readiness: Readiness,
}

impl std::fmt::Debug for ReadyServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadyServer")
            .field("addr", &self.listener.local_addr().ok())
            .field("readiness", &self.readiness.state())
            .finish()
    }
}

/// Connect the store, assemble the router, then bind the listener.
///
/// On any error the readiness flag moves straight to `Terminated`; the caller
/// is expected to exit with a non-zero status.
///
/// # Errors
///
/// Returns the first [`StartupError`] encountered. No step is retried.
pub async fn start(
    cfg: Arc<Config>,
    connector: &dyn StoreConnector,
    bus: Arc<dyn JobBus>,
    readiness: Readiness,
) -> Result<ReadyServer, StartupError> {
    match boot(cfg, connector, bus, readiness.clone()).await {
        Ok(server) => Ok(server),
        Err(e) => {
            error!(error = %e, "startup failed");
            readiness.terminate();
            Err(e)
        }
    }
}

async fn boot(
    cfg: Arc<Config>,
    connector: &dyn StoreConnector,
    bus: Arc<dyn JobBus>,
    readiness: Readiness,
) -> Result<ReadyServer, StartupError> {
    info!(store = %cfg.redacted_store_url(), "connecting to store");
    let store = connector.connect(&cfg.mongo_url).await?;

    let verifier = TokenVerifier::from_config(&cfg.auth, Some(cfg.client_url.clone()))?;
    let authenticator = Authenticator::new(verifier);
    if !authenticator.is_enabled() {
        info!("no identity verification key configured; all requests are anonymous");
    }

    let functions = Arc::new(FunctionRegistry::with_default_functions(
        cfg.inngest.app_id.clone(),
        store.clone(),
    ));
    info!(count = functions.len(), "job functions registered");

    let state = AppState {
        config: cfg.clone(),
        store,
        bus,
        functions,
        authenticator,
        readiness: readiness.clone(),
    };
    let router = router::build(state);

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;

    readiness.mark_ready();
    let server = ReadyServer {
        listener,
        router,
        readiness,
    };
    let bound = server.local_addr().unwrap_or(addr);
    info!(addr = %bound, env = cfg.environment.as_str(), "listening");
    Ok(server)
}

impl ReadyServer {
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests and mark
    /// the process terminated.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the accept loop fails.
    pub async fn serve<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let readiness = self.readiness.clone();
        let result = axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await;
        readiness.terminate();
        info!("server stopped");
        result
    }
}
