//! Ready-made hooks for common cross-cutting concerns.
//!
//! Each function installs one or more hooks on an [`App`]:
//!
//! ```
//! use roll_rs::{extensions, App};
//!
//! let mut app = App::new();
//! extensions::cors(&mut app, extensions::Cors::default());
//! extensions::logger(&mut app, log::Level::Info);
//! extensions::json_errors(&mut app);
//! ```

use log::{error, log, Level};
use serde_json::json;

use crate::parser::Method;
use crate::server::hooks::{self, Handled};
use crate::server::App;

/// Answer every `OPTIONS` request with an empty `200 OK` before routing.
///
/// [`App::new`] installs this hook; [`App::bare`] does not.
pub fn options(app: &mut App) {
    app.listen(hooks::REQUEST, |exchange| {
        let handled = (exchange.request.method == Method::OPTIONS).then_some(Handled);
        Box::pin(async move { Ok(handled) })
    });
}

/// Settings for [`cors`].
#[derive(Debug, Clone)]
pub struct Cors {
    /// Value of `Access-Control-Allow-Origin`.
    pub origin: String,
    /// Value of `Access-Control-Allow-Methods`, if any.
    pub methods: Option<Vec<Method>>,
    /// Value of `Access-Control-Allow-Headers`, if any.
    pub headers: Option<Vec<String>>,
}

impl Default for Cors {
    fn default() -> Self {
        Self {
            origin: "*".to_string(),
            methods: None,
            headers: None,
        }
    }
}

impl Cors {
    /// Allow every method.
    pub fn all_methods(mut self) -> Self {
        self.methods = Some(Method::ALL.to_vec());
        self
    }
}

/// Add CORS headers to every response.
pub fn cors(app: &mut App, settings: Cors) {
    let methods = settings.methods.map(|methods| {
        methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(",")
    });
    let headers = settings.headers.map(|headers| headers.join(","));
    let origin = settings.origin;

    app.listen(hooks::RESPONSE, move |exchange| {
        let response = &mut exchange.response;
        response.set_header("Access-Control-Allow-Origin", origin.clone());
        if let Some(methods) = &methods {
            response.set_header("Access-Control-Allow-Methods", methods.clone());
        }
        if let Some(headers) = &headers {
            response.set_header("Access-Control-Allow-Headers", headers.clone());
        }
        Box::pin(async { Ok(None) })
    });
}

/// Log every request when it arrives and again with its final status.
pub fn logger(app: &mut App, level: Level) {
    app.listen(hooks::REQUEST, move |exchange| {
        let request = &exchange.request;
        log!(level, "{} {}", request.method, request.path);
        Box::pin(async { Ok(None) })
    });
    app.listen(hooks::RESPONSE, move |exchange| {
        let request = &exchange.request;
        log!(level, "{} {} -> {}", request.method, request.path, exchange.response.status);
        Box::pin(async { Ok(None) })
    });
}

/// Log every failed request at `error` level.
pub fn log_errors(app: &mut App) {
    app.listen(hooks::ERROR, |exchange| {
        if let Some(failure) = &exchange.error {
            error!(
                "{method} {path} failed: {failure}",
                method = exchange.request.method,
                path = exchange.request.path
            );
        }
        Box::pin(async { Ok(None) })
    });
}

/// Render error responses as `{"status": <code>, "message": "<text>"}`.
pub fn json_errors(app: &mut App) {
    app.listen(hooks::ERROR, |exchange| {
        Box::pin(async move {
            if let Some(failure) = &exchange.error {
                let body = json!({
                    "status": failure.status.as_u16(),
                    "message": failure.message,
                });
                exchange.response.json(&body)?;
            }
            Ok(None)
        })
    });
}
