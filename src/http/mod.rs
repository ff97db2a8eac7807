//! HTTP transport layer for the Model Context Protocol
//!
//! Provides the `/connect` front-ends for both transport modes plus the metadata endpoints.

pub mod handlers;
pub mod stateful;
pub mod stateless;

/// Header carrying the stateful session id on `GET` responses and subsequent requests.
pub const SESSION_ID_HEADER: &str = "mcp-session-id";

pub const MCP_ENDPOINT: &str = "/connect";
