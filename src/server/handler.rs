//! HTTP request handlers.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::parser::{HttpRequest, Method};
use crate::server::{Error, HttpResponse};

/// Type alias for a boxed, sendable future borrowing for `'a`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Parameters extracted from a matched route pattern.
pub type Params = HashMap<String, String>;

/// Type alias for a handler function.
///
/// A handler receives the request, the response to fill in, and the matched
/// route parameters.
pub type HandlerFn = Arc<
    dyn for<'a> Fn(&'a mut HttpRequest, &'a mut HttpResponse, Params) -> BoxFuture<'a, Result<(), Error>>
        + Send
        + Sync,
>;

/// The handlers registered for one route pattern, keyed by method.
pub type HandlerTable = HashMap<Method, HandlerFn>;
