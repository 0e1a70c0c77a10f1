//! HTTP server implementation for roll-rs.
//!
//! This module holds the request lifecycle: the [`App`] with its router and
//! hook chains, the per-connection protocol adapter, the response writer and
//! the accept loop.

mod response;
mod config;
mod error;
mod handler;
mod router;
mod app;
mod connection;
mod http_server;
mod tests;

pub mod hooks;

// Re-export public items
pub use response::{HttpResponse, StatusCode};
pub use config::ServerConfig;
pub use error::{Error, HttpError};
pub use handler::{BoxFuture, HandlerFn, HandlerTable, Params};
pub use router::{RouteError, Router};
pub use app::App;
pub use connection::{Connection, ConnectionState};
pub use hooks::{Exchange, Handled, HookFn, HookRegistry, HookResult};
pub use http_server::HttpServer;
