//! A minimal async HTTP server runtime.
//!
//! Bytes from each connection are parsed incrementally into requests, every
//! request runs through named hook chains around a routed handler, and exactly
//! one well-formed response is written back per request, even when something
//! fails along the way.
//!
//! # Features
//!
//! - Incremental HTTP/1.x parsing with `Content-Length` and chunked bodies
//! - Path routing with named parameters
//! - `startup`, `request`, `response`, `error` and `shutdown` hook chains with
//!   short-circuiting
//! - Errors mapped onto responses: [`HttpError`] keeps its status, anything
//!   else becomes a 500
//! - JSON request and response bodies
//! - Ready-made CORS, logging, `OPTIONS` and JSON error hooks in [`extensions`]
//!
//! # Examples
//!
//! ## Routing
//!
//! ```no_run
//! use roll_rs::{App, HttpServer, ServerConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut app = App::new();
//!
//!     app.get("/hello/{name}", |_req, resp, params| Box::pin(async move {
//!         let name = params.get("name").cloned().unwrap_or_default();
//!         resp.json(&json!({ "msg": format!("hi {name}") }))?;
//!         Ok(())
//!     }))?;
//!
//!     HttpServer::new(ServerConfig::default(), app).start().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Hooks
//!
//! A `request` hook can refuse a request before it is routed. Returning
//! [`Handled`] skips the handler; the `response` hooks still run.
//!
//! ```
//! use roll_rs::{hooks, App, Handled, StatusCode};
//!
//! let mut app = App::new();
//! app.listen(hooks::REQUEST, |exchange| {
//!     let handled = if exchange.request.has_header("Authorization") {
//!         None
//!     } else {
//!         exchange.response.status = StatusCode::Unauthorized;
//!         Some(Handled)
//!     };
//!     Box::pin(async move { Ok(handled) })
//! });
//! ```
//!
//! ## Driving the parser directly
//!
//! ```
//! use roll_rs::{HttpRequest, Method, WireParser};
//!
//! let mut parser = WireParser::new();
//! let mut request = HttpRequest::default();
//!
//! let complete = parser
//!     .feed(b"GET /search?q=rust HTTP/1.1\r\nHost: example.com\r\n\r\n", &mut request)
//!     .unwrap();
//!
//! assert!(complete);
//! assert_eq!(request.method, Method::GET);
//! assert_eq!(request.path, "/search");
//! assert_eq!(request.query_param("q"), Some("rust"));
//! ```

// Export the parser module
pub mod parser;

// Export the server module
pub mod server;

pub mod extensions;

// Re-export commonly used items for convenience
pub use parser::{Error as ParserError, HttpRequest, HttpVersion, Method, ParserEvents, WireParser};
pub use server::{
    hooks, App, BoxFuture, Error as ServerError, Exchange, Handled, HookResult, HttpError, HttpResponse,
    HttpServer, Params, ServerConfig, StatusCode,
};
