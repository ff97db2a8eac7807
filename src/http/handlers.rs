//! Axum HTTP handlers for the metadata endpoints
//!
//! Provides health, tool registry and discovery responses.

use axum::{extract::State, Json};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::config::TransportMode;
use crate::domain::tools::{build_tools_list, tool_names, ToolDescriptor};
use crate::http::MCP_ENDPOINT;
use crate::mcp::server::SERVER_NAME;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub server: &'static str,
    pub version: &'static str,
    pub mode: &'static str,
    pub timestamp: String,
    pub tools: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connections: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ToolsResponse {
    pub tools: Vec<ToolDescriptor>,
}

#[derive(Debug, Serialize)]
pub struct DiscoveryResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub mcp_endpoint: &'static str,
    pub mode: &'static str,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = match state.mode {
        TransportMode::Stateful => Some(state.sessions.len()),
        TransportMode::Stateless => None,
    };

    Json(HealthResponse {
        status: "ok",
        server: SERVER_NAME,
        version: env!("CARGO_PKG_VERSION"),
        mode: state.mode.as_str(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        tools: tool_names(),
        connections,
    })
}

pub async fn tools() -> Json<ToolsResponse> {
    Json(ToolsResponse {
        tools: build_tools_list(),
    })
}

pub async fn discovery(State(state): State<AppState>) -> Json<DiscoveryResponse> {
    Json(DiscoveryResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        mcp_endpoint: MCP_ENDPOINT,
        mode: state.mode.as_str(),
    })
}
