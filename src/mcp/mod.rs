//! Model Context Protocol (MCP) server handling and JSON-RPC implementations
//!
//! Provides envelope formatting, method routing and the session store used by
//! the stateful transport.

pub mod rpc;
pub mod server;
pub mod session;
