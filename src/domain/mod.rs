//! Weather and geocoding tool logic
//!
//! Provides the tool registry plus the AMap and NWS lookups exposed over MCP and REST.

pub mod fallback;
pub mod forecast;
pub mod tools;
pub mod weather;
