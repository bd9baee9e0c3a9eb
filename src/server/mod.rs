//! Static asset server
//!
//! Hosts the page under test over plain HTTP when it needs a real origin
//! (a `file://` URL blocks `fetch` of the sample fixture). Every response
//! carries `Access-Control-Allow-Origin: *`.

pub mod files;

use axum::{
    extract::State,
    http::{header, HeaderValue, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::error::{HarnessError, Result};

/// How long `stop` waits for in-flight responses before aborting the server task
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Lifecycle of a running server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Listening,
    Stopping,
}

/// Asset server configuration
#[derive(Debug, Clone)]
pub struct AssetServer {
    root: PathBuf,
    index: String,
}

struct ServeState {
    root: PathBuf,
    index: String,
}

impl AssetServer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index: "index.html".to_string(),
        }
    }

    /// Entry point served for `GET /`
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    /// Bind to `127.0.0.1:<port>` and start serving. Port 0 picks a free port.
    pub async fn start(self, port: u16) -> Result<ServerHandle> {
        let root = tokio::fs::canonicalize(&self.root).await?;

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], port)))
            .await
            .map_err(|source| HarnessError::Bind { port, source })?;
        let addr = listener.local_addr()?;

        let app = router(root.clone(), self.index);

        let state = Arc::new(Mutex::new(ServerState::Listening));
        let task_state = state.clone();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app.into_make_service())
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(ref e) = result {
                log::error!("Asset server terminated: {}", e);
            }
            set_state(&task_state, ServerState::Stopped);
        });

        log::info!("HTTP server running at http://localhost:{}/", addr.port());
        log::debug!("Serving {}", root.display());

        Ok(ServerHandle {
            addr,
            root,
            state,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }
}

fn router(root: PathBuf, index: String) -> Router {
    let serve_state = Arc::new(ServeState { root, index });

    Router::new()
        .route("/", get(serve_asset))
        .route("/*path", get(serve_asset))
        .with_state(serve_state)
        .layer(ServiceBuilder::new().layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        )))
}

async fn serve_asset(State(state): State<Arc<ServeState>>, uri: Uri) -> Response {
    match files::load(&state.root, &state.index, uri.path()).await {
        Ok(asset) => {
            log::debug!("200 {} ({})", uri.path(), asset.content_type);
            asset.into_response()
        }
        Err(err) => {
            log::debug!("{:?} {}", err, uri.path());
            err.into_response()
        }
    }
}

fn set_state(state: &Mutex<ServerState>, next: ServerState) {
    if let Ok(mut guard) = state.lock() {
        *guard = next;
    }
}

/// Handle to a running asset server
///
/// Call [`ServerHandle::stop`] on every exit path. Dropping a handle that was
/// never stopped still signals shutdown, but cannot wait for it.
pub struct ServerHandle {
    addr: SocketAddr,
    root: PathBuf,
    state: Arc<Mutex<ServerState>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state(&self) -> ServerState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(ServerState::Stopped)
    }

    /// Origin the browser should navigate to
    pub fn base_url(&self) -> String {
        format!("http://localhost:{}/", self.port())
    }

    /// Stop accepting connections and wait for in-flight responses to flush.
    /// Safe to call more than once.
    pub async fn stop(&mut self) {
        let Some(tx) = self.shutdown.take() else {
            return;
        };
        set_state(&self.state, ServerState::Stopping);
        let _ = tx.send(());

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
                Ok(_) => {}
                Err(_) => {
                    log::warn!(
                        "Asset server did not drain within {:?}, aborting",
                        SHUTDOWN_GRACE
                    );
                    task.abort();
                    let _ = task.await;
                }
            }
        }
        set_state(&self.state, ServerState::Stopped);
        log::info!("HTTP server stopped");
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            log::warn!("Asset server handle dropped without stop()");
            let _ = tx.send(());
        }
    }
}
