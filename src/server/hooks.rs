//! Named hook chains.
//!
//! A hook is an async interceptor registered under a name. The dispatcher runs
//! the chains below at fixed points of every request; applications may also
//! register and run chains under names of their own.

use std::collections::HashMap;
use std::sync::Arc;

use crate::parser::HttpRequest;
use crate::server::error::{Error, HttpError};
use crate::server::handler::BoxFuture;
use crate::server::response::HttpResponse;

/// Run once before the server starts accepting connections.
pub const STARTUP: &str = "startup";
/// Run for every request before routing. May short-circuit.
pub const REQUEST: &str = "request";
/// Run for every request after the handler, whatever its outcome.
pub const RESPONSE: &str = "response";
/// Run when a request failed, after the response was set from the error.
pub const ERROR: &str = "error";
/// Run once after the accept loop stops.
pub const SHUTDOWN: &str = "shutdown";

/// Marker returned by a hook that fully produced the response.
///
/// Returning it stops the chain; from a `request` hook it also skips routing
/// and the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handled;

/// What a hook returns: `Ok(None)` lets the chain continue.
pub type HookResult = Result<Option<Handled>, Error>;

/// Type alias for a hook function.
pub type HookFn = Arc<dyn for<'a> Fn(&'a mut Exchange) -> BoxFuture<'a, HookResult> + Send + Sync>;

/// The state a hook can observe and modify.
///
/// `error` is filled in by the dispatcher's error path and stays set for the
/// remaining hooks of that request. Lifecycle chains receive an empty
/// exchange.
#[derive(Debug, Default)]
pub struct Exchange {
    pub request: HttpRequest,
    pub response: HttpResponse,
    pub error: Option<HttpError>,
}

impl Exchange {
    /// Start an exchange for `request` with a default `200 OK` response.
    pub fn new(request: HttpRequest) -> Self {
        Self {
            request,
            response: HttpResponse::default(),
            error: None,
        }
    }
}

/// Ordered hook chains keyed by name.
#[derive(Default)]
pub struct HookRegistry {
    chains: HashMap<String, Vec<HookFn>>,
}

impl HookRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `hook` to the chain called `name`.
    pub fn listen(&mut self, name: impl Into<String>, hook: HookFn) {
        self.chains.entry(name.into()).or_default().push(hook);
    }

    /// Number of hooks registered under `name`.
    pub fn len(&self, name: &str) -> usize {
        self.chains.get(name).map_or(0, Vec::len)
    }

    /// Run the chain called `name` in registration order.
    ///
    /// Stops at the first hook that fails or returns [`Handled`]. A missing
    /// chain is not an error.
    pub async fn run(&self, name: &str, exchange: &mut Exchange) -> HookResult {
        let Some(chain) = self.chains.get(name) else {
            return Ok(None);
        };

        for hook in chain {
            if let Some(handled) = hook(exchange).await? {
                return Ok(Some(handled));
            }
        }

        Ok(None)
    }
}
