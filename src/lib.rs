//! MCP server bridging AI-agent sessions to a remote markdown note store.
//!
//! Clients speak JSON-RPC 2.0 over streamable HTTP (`POST`/`GET`/`DELETE` on
//! `/mcp`). Each session gets its own protocol handler and transport; tools
//! read and write notes through the store's plain HTTP CRUD surface, with a
//! timestamp-validated content cache behind search and filtered listings.

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod protocol;
pub mod schema;
pub mod search;
pub mod server;
pub mod session;
pub mod store;
