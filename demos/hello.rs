//! A small JSON API built on roll-rs.
//!
//! Run with `cargo run --example hello`, then try:
//!
//! ```text
//! curl 'http://127.0.0.1:3579/hello?name=Ada'
//! curl http://127.0.0.1:3579/users/42
//! curl -X POST -H 'Content-Type: application/json' -d '{"name":"Ada"}' http://127.0.0.1:3579/users
//! ```

use roll_rs::{App, HttpError, HttpServer, Method, ServerConfig, StatusCode};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct NewUser {
    name: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut app = App::new();

    app.get("/", |_req, resp, _params| {
        resp.set_header("Content-Type", "text/html");
        resp.set_body("<html><body><h1>Welcome to roll-rs!</h1></body></html>");
        Box::pin(async { Ok(()) })
    })?;

    // Query parameters
    app.get("/hello", |req, resp, _params| Box::pin(async move {
        let name = req.query_param("name").unwrap_or("World").to_string();
        resp.json(&json!({ "msg": format!("hi {name}") }))?;
        Ok(())
    }))?;

    // Path parameters
    app.get("/users/{id}", |_req, resp, params| Box::pin(async move {
        let id: u64 = params
            .get("id")
            .and_then(|id| id.parse().ok())
            .ok_or_else(|| HttpError::with_message(StatusCode::BadRequest, "id must be a number"))?;
        resp.json(&json!({ "id": id, "name": format!("user-{id}") }))?;
        Ok(())
    }))?;

    app.route("/users", &[Method::POST], |req, resp, _params| Box::pin(async move {
        let user: NewUser = req
            .json()
            .map_err(|e| HttpError::with_message(StatusCode::BadRequest, e.to_string()))?;
        resp.status = StatusCode::Created;
        resp.json(&json!({ "created": user.name }))?;
        Ok(())
    }))?;

    let config = ServerConfig {
        addr: "127.0.0.1:3579".parse()?,
        ..ServerConfig::default()
    };

    HttpServer::new(config, app).start().await?;
    Ok(())
}
