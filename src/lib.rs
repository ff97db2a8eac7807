use std::{sync::Arc, time::Duration};

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub mod amap_client;
pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;
pub mod nws_client;
#[cfg(test)]
pub(crate) mod test_support;

use config::TransportMode;
use domain::tools::ToolBackends;
use http::{handlers, stateful, stateless, MCP_ENDPOINT};
use mcp::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub mode: TransportMode,
    pub api_token: Option<Arc<str>>,
    pub backends: ToolBackends,
    pub sessions: Arc<dyn SessionStore>,
    pub keep_alive: Duration,
}

impl AppState {
    pub fn new(
        mode: TransportMode,
        api_token: Option<String>,
        backends: ToolBackends,
        sessions: Arc<dyn SessionStore>,
        keep_alive: Duration,
    ) -> Self {
        Self {
            mode,
            api_token: api_token.map(Arc::<str>::from),
            backends,
            sessions,
            keep_alive,
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    let connect = match state.mode {
        TransportMode::Stateful => Router::new().route(
            MCP_ENDPOINT,
            get(stateful::open_session)
                .post(stateful::post_message)
                .delete(stateful::close_session),
        ),
        TransportMode::Stateless => Router::new().route(
            MCP_ENDPOINT,
            post(stateless::post_message)
                .get(stateless::method_not_allowed)
                .delete(stateless::method_not_allowed),
        ),
    }
    .route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth::require_bearer_token,
    ));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/tools", get(handlers::tools))
        .route("/.well-known/mcp", get(handlers::discovery))
        .route("/api/weather", post(api::weather_by_body))
        .route("/api/weather/{city}", get(api::weather_by_path))
        .merge(connect)
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
