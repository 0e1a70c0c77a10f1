//! The application: routes, hooks and the per-request dispatcher.

use std::sync::Arc;

use log::debug;

use crate::parser::{HttpRequest, Method};
use crate::server::error::{Error, HttpError};
use crate::server::handler::{BoxFuture, Params};
use crate::server::hooks::{self, Exchange, HookRegistry, HookResult};
use crate::server::response::{HttpResponse, StatusCode};
use crate::server::router::Router;

/// Routes and hooks of an application.
///
/// An `App` is assembled through `&mut self` methods and then handed to
/// [`HttpServer`](crate::HttpServer), which shares it behind an `Arc`. From
/// that point on it cannot change.
pub struct App {
    router: Router,
    hooks: HookRegistry,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Create an application that already answers `OPTIONS` requests.
    pub fn new() -> Self {
        let mut app = Self::bare();
        crate::extensions::options(&mut app);
        app
    }

    /// Create an application without any hook installed.
    pub fn bare() -> Self {
        Self {
            router: Router::new(),
            hooks: HookRegistry::new(),
        }
    }

    /// Register `handler` for `methods` on `pattern`.
    pub fn route<F>(&mut self, pattern: &str, methods: &[Method], handler: F) -> Result<&mut Self, Error>
    where
        F: for<'a> Fn(&'a mut HttpRequest, &'a mut HttpResponse, Params) -> BoxFuture<'a, Result<(), Error>>
            + Send
            + Sync
            + 'static,
    {
        self.router.add(pattern, methods, Arc::new(handler))?;
        Ok(self)
    }

    /// Register a `GET` handler on `pattern`.
    pub fn get<F>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, Error>
    where
        F: for<'a> Fn(&'a mut HttpRequest, &'a mut HttpResponse, Params) -> BoxFuture<'a, Result<(), Error>>
            + Send
            + Sync
            + 'static,
    {
        self.route(pattern, &[Method::GET], handler)
    }

    /// Append `hook` to the chain called `name`.
    pub fn listen<F>(&mut self, name: &str, hook: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Exchange) -> BoxFuture<'a, HookResult> + Send + Sync + 'static,
    {
        self.hooks.listen(name, Arc::new(hook));
        self
    }

    /// The routing table.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// The hook registry.
    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// Run the chain called `name` against `exchange`.
    pub async fn hook(&self, name: &str, exchange: &mut Exchange) -> HookResult {
        self.hooks.run(name, exchange).await
    }

    /// Run the `startup` chain.
    pub async fn startup(&self) -> Result<(), Error> {
        self.hook(hooks::STARTUP, &mut Exchange::default()).await?;
        Ok(())
    }

    /// Run the `shutdown` chain.
    pub async fn shutdown(&self) -> Result<(), Error> {
        self.hook(hooks::SHUTDOWN, &mut Exchange::default()).await?;
        Ok(())
    }

    /// Produce the response for one request.
    ///
    /// Never fails: every error is turned into a response by the error path.
    pub async fn respond(&self, request: HttpRequest) -> HttpResponse {
        let mut exchange = Exchange::new(request);

        let outcome = match self.hook(hooks::REQUEST, &mut exchange).await {
            Ok(Some(_)) => Ok(()),
            Ok(None) => self.dispatch(&mut exchange).await,
            Err(error) => Err(error),
        };
        if let Err(error) = outcome {
            self.on_error(error, &mut exchange).await;
        }

        // Failed requests still pass through the response hooks.
        if let Err(error) = self.hook(hooks::RESPONSE, &mut exchange).await {
            self.on_error(error, &mut exchange).await;
        }

        debug!(
            "{method} {path} -> {status}",
            method = exchange.request.method,
            path = exchange.request.path,
            status = exchange.response.status
        );

        exchange.response
    }

    /// Route the request and run its handler.
    async fn dispatch(&self, exchange: &mut Exchange) -> Result<(), Error> {
        let Exchange { request, response, .. } = exchange;

        let (params, handlers) = self
            .router
            .at(&request.path)
            .map_err(|_| HttpError::with_message(StatusCode::NotFound, request.path.clone()))?;

        let handler = handlers
            .get(&request.method)
            .ok_or_else(|| HttpError::new(StatusCode::MethodNotAllowed))?;

        request.kwargs.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
        handler(request, response, params).await
    }

    /// Turn `error` into the response, then let the `error` chain reformat it.
    ///
    /// If an `error` hook fails too, the response falls back to a plain 500
    /// with that failure's text and no further hook runs.
    pub async fn on_error(&self, error: Error, exchange: &mut Exchange) {
        let error = error.into_http();
        exchange.response.status = error.status;
        exchange.response.body = error.message.clone().into_bytes();
        exchange.error = Some(error);

        if let Err(failure) = self.hook(hooks::ERROR, exchange).await {
            exchange.response.status = StatusCode::InternalServerError;
            exchange.response.body = failure.to_string().into_bytes();
        }
    }
}
