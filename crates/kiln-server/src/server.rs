//! Static file server implementation.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Request, State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::livereload::{
    client_script, inject_client, ReloadHub, ReloadMessage, LIVERELOAD_PATH,
    LIVERELOAD_SCRIPT_PATH,
};

/// Configuration for one static server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Name used in log output
    pub name: String,

    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Directories searched in order for a requested file
    pub roots: Vec<PathBuf>,

    /// Document served when no root has the requested file
    pub fallback: PathBuf,

    /// Serve the live reload endpoint and inject its client into HTML
    pub livereload: bool,
}

impl ServerConfig {
    /// The socket address this server binds.
    ///
    /// `host` may be an IPv4 or IPv6 literal or a name to resolve; the first
    /// resolved address is used.
    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let invalid = || ServerError::InvalidAddress(format!("{}:{}", self.host, self.port));
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|_| invalid())?
            .next()
            .ok_or_else(invalid)
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Failed to bind to {0}: {1}")]
    BindError(SocketAddr, String),

    #[error("No async runtime available: {0}")]
    Runtime(String),

    #[error("File watch error: {0}")]
    WatchError(String),

    #[error("Invalid watch pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// Shared server state.
struct ServerState {
    config: ServerConfig,
    hub: ReloadHub,
}

/// Static file server with an optional live reload channel.
pub struct StaticServer {
    config: ServerConfig,
    hub: ReloadHub,
}

impl StaticServer {
    /// Create a new server that pushes reloads from `hub`.
    pub fn new(config: ServerConfig, hub: ReloadHub) -> Self {
        Self { config, hub }
    }

    /// Build the router serving this configuration.
    pub fn router(&self) -> Router {
        let state = Arc::new(ServerState {
            config: self.config.clone(),
            hub: self.hub.clone(),
        });

        let mut router = Router::new();
        if self.config.livereload {
            router = router
                .route(LIVERELOAD_PATH, get(ws_handler))
                .route(LIVERELOAD_SCRIPT_PATH, get(script_handler));
        }

        router.fallback(static_handler).with_state(state)
    }

    /// Bind the listener now and serve in the background.
    ///
    /// Binding happens before this returns so an occupied port is reported
    /// to the caller. Must be called with a tokio runtime entered.
    pub fn spawn(self) -> Result<SocketAddr, ServerError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ServerError::Runtime(e.to_string()))?;

        let addr = self.config.socket_addr()?;
        let listener = std::net::TcpListener::bind(addr)
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;
        listener
            .set_nonblocking(true)
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        let name = self.config.name.clone();
        let app = self.router();

        runtime.spawn(async move {
            let listener = match tokio::net::TcpListener::from_std(listener) {
                Ok(listener) => listener,
                Err(e) => {
                    tracing::error!("{} server failed to start: {}", name, e);
                    return;
                }
            };

            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("{} server stopped: {}", name, e);
            }
        });

        tracing::info!(
            "{} server started at http://{} (fallback {})",
            self.config.name,
            local_addr,
            self.config.fallback.display()
        );

        Ok(local_addr)
    }
}

/// Map a request path onto the first root containing it.
///
/// Directories resolve to their `index.html`. Paths escaping the root are
/// rejected.
pub fn resolve_path(roots: &[PathBuf], request_path: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(request_path).ok()?;

    let mut relative = PathBuf::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s if s.contains('\\') => return None,
            s => relative.push(s),
        }
    }

    roots.iter().find_map(|root| {
        let candidate = root.join(&relative);
        if candidate.is_file() {
            return Some(candidate);
        }

        let index = candidate.join("index.html");
        index.is_file().then_some(index)
    })
}

fn is_html(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("html") | Some("htm")
    )
}

/// Serve files from the configured roots, falling back to the fallback document.
async fn static_handler(State(state): State<Arc<ServerState>>, request: Request) -> Response {
    let config = &state.config;

    let target = resolve_path(&config.roots, request.uri().path())
        .or_else(|| config.fallback.is_file().then(|| config.fallback.clone()));

    let Some(file) = target else {
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    };

    if config.livereload && is_html(&file) {
        return match tokio::fs::read_to_string(&file).await {
            Ok(html) => Html(inject_client(&html)).into_response(),
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", file.display(), e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
        };
    }

    match ServeFile::new(&file).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

/// Handler for the live reload client script.
async fn script_handler() -> impl IntoResponse {
    ([("content-type", "application/javascript")], client_script())
}

/// Handler for the live reload WebSocket endpoint.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Forward reload messages to one client until it disconnects.
async fn handle_ws(mut socket: WebSocket, state: Arc<ServerState>) {
    let mut rx = state.hub.subscribe();

    if send_message(&mut socket, &ReloadMessage::Connected)
        .await
        .is_err()
    {
        return;
    }

    while let Ok(msg) = rx.recv().await {
        if send_message(&mut socket, &msg).await.is_err() {
            break;
        }
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ReloadMessage) -> Result<(), ()> {
    let json = serde_json::to_string(msg).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}
