//! Hooks and extensions: CORS, request logging, JSON errors, a token check
//! and lifecycle hooks.
//!
//! Run with `cargo run --example middleware`, then try:
//!
//! ```text
//! curl -i http://127.0.0.1:3579/private
//! curl -i -H 'Authorization: Bearer letmein' http://127.0.0.1:3579/private
//! curl -i http://127.0.0.1:3579/nowhere
//! ```

use log::info;
use roll_rs::extensions::{self, Cors};
use roll_rs::{hooks, App, Handled, HttpServer, ServerConfig, StatusCode};
use serde_json::json;

const TOKEN: &str = "Bearer letmein";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    let mut app = App::new();
    extensions::cors(&mut app, Cors::default().all_methods());
    extensions::logger(&mut app, log::Level::Info);
    extensions::log_errors(&mut app);
    extensions::json_errors(&mut app);

    app.listen(hooks::STARTUP, |_exchange| {
        info!("Warming up");
        Box::pin(async { Ok(None) })
    });
    app.listen(hooks::SHUTDOWN, |_exchange| {
        info!("Goodbye");
        Box::pin(async { Ok(None) })
    });

    // Refuse /private without the token; the handler never runs.
    app.listen(hooks::REQUEST, |exchange| {
        let request = &exchange.request;
        let refused = request.path.starts_with("/private")
            && request.get_header("Authorization").map(String::as_str) != Some(TOKEN);
        if refused {
            exchange.response.status = StatusCode::Unauthorized;
            exchange.response.set_header("WWW-Authenticate", "Bearer");
        }
        let handled = refused.then_some(Handled);
        Box::pin(async move { Ok(handled) })
    });

    app.listen(hooks::RESPONSE, |exchange| {
        exchange.response.set_header("X-Powered-By", "roll-rs");
        Box::pin(async { Ok(None) })
    });

    app.get("/private", |_req, resp, _params| Box::pin(async move {
        resp.json(&json!({ "secret": 42 }))?;
        Ok(())
    }))?;

    HttpServer::new(ServerConfig::default(), app).start().await?;
    Ok(())
}
