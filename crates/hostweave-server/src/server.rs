//! Listener loop and server lifecycle.
//!
//! `NotStarted -> Running -> Stopped`. The session store and its sweeper live
//! exactly as long as the `Running` phase.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::net::TcpListener;
use tokio::sync::watch;

use hostweave_core::error::{Fault, Result};

use crate::app_state::AppState;
use crate::dispatch::Dispatcher;
use crate::router::build_router;
use crate::session::{spawn_sweeper, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    NotStarted,
    Running,
    Stopped,
}

#[derive(Clone)]
pub struct Server {
    inner: Arc<ServerInner>,
}

struct ServerInner {
    app: AppState,
    lifecycle: Mutex<Lifecycle>,
    shutdown: watch::Sender<bool>,
    local_addr: Mutex<Option<SocketAddr>>,
    sessions: Mutex<Option<Arc<SessionStore>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Server {
    pub fn new(app: AppState) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(ServerInner {
                app,
                lifecycle: Mutex::new(Lifecycle::NotStarted),
                shutdown,
                local_addr: Mutex::new(None),
                sessions: Mutex::new(None),
            }),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *lock(&self.inner.lifecycle)
    }

    /// Bound address while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *lock(&self.inner.local_addr)
    }

    /// The live session store, for collaborators that enumerate or drop
    /// sessions. `None` unless running.
    pub fn sessions(&self) -> Option<Arc<SessionStore>> {
        lock(&self.inner.sessions).clone()
    }

    /// Bind, then serve until [`Server::stop`]. Each request runs on its own
    /// task; in-flight requests are not cancelled by a stop.
    pub async fn start(&self) -> Result<()> {
        {
            let mut state = lock(&self.inner.lifecycle);
            if *state != Lifecycle::NotStarted {
                return Err(Fault::State(format!("start called while {state:?}")));
            }
            *state = Lifecycle::Running;
        }

        let server_cfg = &self.inner.app.cfg().server;
        let bound = match bind(&server_cfg.listen).await {
            Ok(l) => l
                .local_addr()
                .map(|local| (l, local))
                .map_err(|e| Fault::Bind(e.to_string())),
            Err(e) => Err(e),
        };
        let (listener, local) = match bound {
            Ok(bound) => bound,
            Err(e) => {
                tracing::error!(
                    listen = %server_cfg.listen,
                    error = %e,
                    "listener failed to start"
                );
                *lock(&self.inner.lifecycle) = Lifecycle::Stopped;
                return Err(e);
            }
        };
        *lock(&self.inner.local_addr) = Some(local);

        let sessions = Arc::new(SessionStore::new(server_cfg.session_ttl()));
        *lock(&self.inner.sessions) = Some(Arc::clone(&sessions));
        let sweeper = spawn_sweeper(
            Arc::clone(&sessions),
            server_cfg.sweep_interval(),
            self.inner.shutdown.subscribe(),
        );

        tracing::info!(
            address = %local,
            ttl_minutes = server_cfg.session_ttl_minutes,
            "Listening"
        );

        let router = build_router(Dispatcher::new(self.inner.app.clone(), sessions));
        let mut stop_rx = self.inner.shutdown.subscribe();
        let served = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = stop_rx.wait_for(|stop| *stop).await;
        })
        .await;

        // serve also returns on its own error; make sure the sweeper ends too
        self.inner.shutdown.send_replace(true);
        if let Err(e) = sweeper.await {
            tracing::warn!(error = %e, "session sweeper ended abnormally");
        }
        *lock(&self.inner.sessions) = None;
        *lock(&self.inner.local_addr) = None;
        *lock(&self.inner.lifecycle) = Lifecycle::Stopped;
        tracing::info!("Stopped");

        served.map_err(|e| Fault::Transport(e.to_string()))
    }

    /// Stop accepting connections. Terminal: a stopped server never restarts.
    pub fn stop(&self) {
        *lock(&self.inner.lifecycle) = Lifecycle::Stopped;
        self.inner.shutdown.send_replace(true);
    }
}

async fn bind(listen: &str) -> Result<TcpListener> {
    let addr: SocketAddr = listen
        .parse()
        .map_err(|e| Fault::Bind(format!("{listen}: {e}")))?;
    TcpListener::bind(addr)
        .await
        .map_err(|e| Fault::Bind(format!("{addr}: {e}")))
}
