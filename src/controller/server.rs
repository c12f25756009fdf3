//! Control endpoint HTTP server
//!
//! This module sets up the RESTful control endpoint using axum.

use std::path::PathBuf;

use axum::{
    middleware,
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::common::parse_socket_addr;
use crate::controller::auth::{auth_middleware, AuthState};
use crate::controller::error::{ControllerError, ControllerResult};
use crate::controller::handlers::{self, ControllerState};

/// Control endpoint settings for one start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// `host:port` to listen on (`:port` means every interface)
    pub listen_addr: String,

    /// Bearer secret; empty disables authentication
    pub secret: String,

    /// Directory served under `/ui`
    pub ui_path: Option<PathBuf>,
}

/// Run the control endpoint until the task is aborted
pub async fn start_controller(config: ControllerConfig, state: ControllerState) -> ControllerResult<()> {
    let addr = parse_socket_addr(&config.listen_addr)
        .map_err(|e| ControllerError::Address(e.to_string()))?;

    let app = build_router(&config, state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("RESTful API listening at: {}", listener.local_addr()?);

    axum::serve(listener, app)
        .await
        .map_err(|e| ControllerError::Internal(e.to_string()))?;

    Ok(())
}

/// Build the application router with all routes
pub fn build_router(config: &ControllerConfig, state: ControllerState) -> Router {
    let auth_state = AuthState::new(&config.secret);

    let api_router = Router::new()
        .route("/", get(handlers::hello))
        .route("/version", get(handlers::version))
        .route(
            "/configs",
            get(handlers::get_configs)
                .put(handlers::put_configs)
                .patch(handlers::patch_configs),
        )
        .route("/proxies", get(handlers::get_proxies))
        .with_state(state)
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware));

    // Dashboard assets are public; the dashboard itself asks for the secret
    let app = match &config.ui_path {
        Some(path) => {
            log::info!("Serving controller UI from {}", path.display());
            api_router.nest_service("/ui", ServeDir::new(path))
        }
        None => api_router,
    };

    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
}
