//! HTTP layer: WebSocket upgrade route, roster endpoint and request logging

use crate::error::ServerError;
use crate::game::GameState;
use crate::relay::{Hub, DEFAULT_SEND_QUEUE};
use crate::session::{run_session, SessionConfig};
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures::StreamExt;
use log::{info, warn};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Route serving the WebSocket upgrade
    pub ws_path: String,
    pub idle_timeout: Option<Duration>,
    /// Broadcast frames a client may fall behind by before frames for it
    /// are dropped
    pub send_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ws_path: "/ws".to_string(),
            idle_timeout: None,
            send_queue: DEFAULT_SEND_QUEUE,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn route_path(&self) -> String {
        if self.ws_path.starts_with('/') {
            self.ws_path.clone()
        } else {
            format!("/{}", self.ws_path)
        }
    }
}

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
    pub session: SessionConfig,
}

/// Builds the router with all routes
pub fn build_router(state: AppState, ws_path: &str) -> Router {
    Router::new()
        .route(ws_path, get(ws_handler))
        .route("/players", get(players_handler))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// Relay server bound to a listening socket
pub struct Server {
    listener: TcpListener,
    router: Router,
    hub: Arc<Hub>,
}

impl Server {
    /// Binds the listener and wires a fresh hub into the router
    pub async fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        let address = config.address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind {
                addr: address.clone(),
                source,
            })?;
        info!("Server listening on {}", listener.local_addr()?);

        let hub = Arc::new(Hub::with_send_queue(config.send_queue));
        let state = AppState {
            hub: Arc::clone(&hub),
            session: SessionConfig {
                idle_timeout: config.idle_timeout,
                ..Default::default()
            },
        };
        let router = build_router(state, &config.route_path());

        Ok(Self {
            listener,
            router,
            hub,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn hub(&self) -> Arc<Hub> {
        Arc::clone(&self.hub)
    }

    /// Serves requests until the process exits
    pub async fn run(self) -> Result<(), ServerError> {
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }

    /// Serves requests until `shutdown` resolves
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("Server stopped");
        Ok(())
    }
}

/// WebSocket upgrade handler; any origin is accepted
async fn ws_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<AppState>,
) -> Response {
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            warn!("Failed to upgrade connection: {}", rejection);
            return rejection.into_response();
        }
    };

    ws.on_failed_upgrade(|e| warn!("Failed to upgrade connection: {}", e))
        .on_upgrade(move |socket| {
            let (writer, reader) = socket.split();
            run_session(state.hub, reader, writer, state.session)
        })
}

async fn players_handler(State(state): State<AppState>) -> Json<GameState> {
    Json(state.hub.roster().await)
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let response = next.run(request).await;
    info!(
        "HTTP request method={} uri={} status={}",
        method,
        uri,
        response.status().as_u16()
    );
    response
}
