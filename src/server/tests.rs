//! Tests for the HTTP server implementation.

#[cfg(test)]
mod server_tests {
    use std::collections::VecDeque;
    use std::io;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::{Context, Poll};
    use std::time::Duration;
    use serde_json::{json, Value};
    use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::oneshot;

    use crate::extensions::{self, Cors};
    use crate::parser::{HttpRequest, Method};
    use crate::server::hooks::{self, Exchange, Handled};
    use crate::server::{
        App, Connection, ConnectionState, Error, HttpError, HttpResponse, HttpServer, ServerConfig, StatusCode,
    };

    // Mock TcpStream for testing; each queued chunk is returned by one read
    struct MockTcpStream {
        reads: VecDeque<Vec<u8>>,
        write_data: Vec<u8>,
        broken: bool,
    }

    impl MockTcpStream {
        fn new(read_data: Vec<u8>) -> Self {
            Self::with_chunks(vec![read_data])
        }

        fn with_chunks(chunks: Vec<Vec<u8>>) -> Self {
            Self {
                reads: chunks.into(),
                write_data: Vec::new(),
                broken: false,
            }
        }

        fn broken(read_data: Vec<u8>) -> Self {
            let mut stream = Self::new(read_data);
            stream.broken = true;
            stream
        }

        fn written(&self) -> String {
            String::from_utf8_lossy(&self.write_data).into_owned()
        }
    }

    impl AsyncRead for MockTcpStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let this = self.get_mut();
            if let Some(mut chunk) = this.reads.pop_front() {
                let n = chunk.len().min(buf.remaining());
                buf.put_slice(&chunk[..n]);
                if n < chunk.len() {
                    this.reads.push_front(chunk.split_off(n));
                }
            }
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for MockTcpStream {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            let this = self.get_mut();
            if this.broken {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer went away")));
            }
            this.write_data.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    /// An app with a `/hello` JSON route.
    fn hello_app() -> App {
        let mut app = App::new();
        app.get("/hello", |req, resp, _params| Box::pin(async move {
            let name = req.query_param("name").unwrap_or("World").to_string();
            resp.json(&json!({ "msg": format!("hi {name}") }))?;
            Ok(())
        })).unwrap();
        app
    }

    /// Feed `input` through a connection and return the result and the bytes written.
    async fn exchange_bytes(app: App, input: &[u8]) -> (Result<(), Error>, String) {
        let mut stream = MockTcpStream::new(input.to_vec());
        let result = HttpServer::handle_connection(&mut stream, Arc::new(app), 1024).await;
        (result, stream.written())
    }

    #[tokio::test]
    async fn test_server_creation() {
        let config = ServerConfig {
            addr: "127.0.0.1:8080".parse().unwrap(),
            max_connections: 100,
            read_buffer_size: 4096,
            shutdown_timeout: Duration::from_secs(1),
        };

        let server = HttpServer::new(config.clone(), hello_app());
        assert_eq!(server.config.addr, config.addr);
        assert_eq!(server.config.max_connections, 100);
        assert_eq!(server.config.read_buffer_size, 4096);
        assert_eq!(server.app.router().len(), 1);
    }

    #[tokio::test]
    async fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.addr, "127.0.0.1:3579".parse::<std::net::SocketAddr>().unwrap());
        assert_eq!(config.max_connections, 1024);
        assert_eq!(config.read_buffer_size, 8192);
    }

    #[tokio::test]
    async fn test_hello_json_exact_wire_format() {
        let (result, response) = exchange_bytes(
            hello_app(),
            b"GET /hello?name=Ada HTTP/1.1\r\nHost: localhost\r\n\r\n",
        ).await;

        assert!(result.is_ok());
        assert_eq!(
            response,
            "HTTP/1.1 200 OK\r\nContent-Length: 16\r\nContent-Type: application/json\r\n\r\n{\"msg\":\"hi Ada\"}"
        );
    }

    #[tokio::test]
    async fn test_not_found_body_is_path() {
        let (result, response) = exchange_bytes(hello_app(), b"GET /missing HTTP/1.1\r\n\r\n").await;

        assert!(result.is_ok());
        assert_eq!(response, "HTTP/1.1 404 Not Found\r\nContent-Length: 8\r\n\r\n/missing");
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let (_, response) = exchange_bytes(
            hello_app(),
            b"POST /hello HTTP/1.1\r\nContent-Length: 0\r\n\r\n",
        ).await;

        assert!(response.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
        assert!(response.ends_with("\r\n\r\nMethod Not Allowed"));
    }

    #[tokio::test]
    async fn test_malformed_request_bypasses_hooks() {
        let mut app = hello_app();
        let calls = counter();
        for name in [hooks::REQUEST, hooks::RESPONSE, hooks::ERROR] {
            let calls = calls.clone();
            app.listen(name, move |_exchange| {
                calls.fetch_add(1, Ordering::SeqCst);
                Box::pin(async { Ok(None) })
            });
        }

        let (result, response) = exchange_bytes(app, b"/hello HTTP/1.1\r\n\r\n").await;

        assert!(matches!(result, Err(Error::ParseError(_))));
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(response.contains("Error parsing request:"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_request_hook_short_circuits_handler() {
        let mut app = App::new();
        let handler_calls = counter();
        let calls = handler_calls.clone();
        app.get("/secret", move |_req, resp, _params| {
            calls.fetch_add(1, Ordering::SeqCst);
            resp.set_body("secret");
            Box::pin(async { Ok(()) })
        }).unwrap();

        app.listen(hooks::REQUEST, |exchange| {
            exchange.response.status = StatusCode::Unauthorized;
            exchange.response.set_body("go away");
            Box::pin(async { Ok(Some(Handled)) })
        });
        app.listen(hooks::RESPONSE, |exchange| {
            exchange.response.set_header("X-Seen", "yes");
            Box::pin(async { Ok(None) })
        });

        let response = app.respond(HttpRequest::new(Method::GET, "/secret")).await;

        assert_eq!(handler_calls.load(Ordering::SeqCst), 0);
        assert_eq!(response.status, StatusCode::Unauthorized);
        assert_eq!(response.body, b"go away");
        assert_eq!(response.headers.get("X-Seen").unwrap(), "yes");
    }

    #[tokio::test]
    async fn test_request_hook_without_result_continues() {
        let mut app = hello_app();
        let calls = counter();
        let seen = calls.clone();
        app.listen(hooks::REQUEST, move |_exchange| {
            seen.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(None) })
        });

        let response = app.respond(HttpRequest::new(Method::GET, "/hello?name=Bob")).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(response.body, br#"{"msg":"hi Bob"}"#);
    }

    #[tokio::test]
    async fn test_plain_handler_error_is_500() {
        let mut app = App::new();
        app.get("/boom", |_req, _resp, _params| Box::pin(async {
            Err(Error::internal("boom"))
        })).unwrap();

        let response = app.respond(HttpRequest::new(Method::GET, "/boom")).await;

        assert_eq!(response.status, StatusCode::InternalServerError);
        assert_eq!(response.body, b"boom");
    }

    #[tokio::test]
    async fn test_http_error_keeps_status_and_message() {
        let mut app = App::new();
        app.get("/private", |_req, _resp, _params| Box::pin(async {
            Err(HttpError::with_message(StatusCode::Forbidden, "nope").into())
        })).unwrap();

        let (_, response) = exchange_bytes(app, b"GET /private HTTP/1.1\r\n\r\n").await;

        assert_eq!(response, "HTTP/1.1 403 Forbidden\r\nContent-Length: 4\r\n\r\nnope");
    }

    #[tokio::test]
    async fn test_handler_error_still_runs_response_hooks() {
        let mut app = App::new();
        app.get("/boom", |_req, _resp, _params| Box::pin(async {
            Err(Error::internal("boom"))
        })).unwrap();
        app.listen(hooks::RESPONSE, |exchange| {
            let status = exchange.error.as_ref().map(|e| e.status.as_u16().to_string());
            exchange.response.set_header("X-Error", status.unwrap_or_default());
            Box::pin(async { Ok(None) })
        });

        let response = app.respond(HttpRequest::new(Method::GET, "/boom")).await;

        assert_eq!(response.status, StatusCode::InternalServerError);
        assert_eq!(response.headers.get("X-Error").unwrap(), "500");
    }

    #[tokio::test]
    async fn test_error_hooks_can_reformat() {
        let mut app = hello_app();
        app.listen(hooks::ERROR, |exchange| {
            let message = exchange.error.as_ref().map(|e| e.message.clone()).unwrap_or_default();
            exchange.response.set_body(format!("custom: {message}"));
            Box::pin(async { Ok(None) })
        });

        let response = app.respond(HttpRequest::new(Method::GET, "/missing")).await;

        assert_eq!(response.status, StatusCode::NotFound);
        assert_eq!(response.body, b"custom: /missing");
    }

    #[tokio::test]
    async fn test_failing_error_hook_falls_back_to_500() {
        let mut app = hello_app();
        let later = counter();
        app.listen(hooks::ERROR, |_exchange| Box::pin(async {
            Err(Error::internal("error hook broke"))
        }));
        let calls = later.clone();
        app.listen(hooks::ERROR, move |_exchange| {
            calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(None) })
        });

        let response = app.respond(HttpRequest::new(Method::GET, "/missing")).await;

        assert_eq!(response.status, StatusCode::InternalServerError);
        assert_eq!(response.body, b"error hook broke");
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_request_hook_goes_to_error_path() {
        let mut app = hello_app();
        app.listen(hooks::REQUEST, |_exchange| Box::pin(async {
            Err(HttpError::new(StatusCode::TooManyRequests).into())
        }));

        let response = app.respond(HttpRequest::new(Method::GET, "/hello")).await;

        assert_eq!(response.status, StatusCode::TooManyRequests);
        assert_eq!(response.body, b"Too Many Requests");
    }

    #[tokio::test]
    async fn test_failing_response_hook_goes_to_error_path() {
        let mut app = hello_app();
        app.listen(hooks::RESPONSE, |_exchange| Box::pin(async {
            Err(HttpError::new(StatusCode::ImATeapot).into())
        }));

        let response = app.respond(HttpRequest::new(Method::GET, "/hello")).await;

        assert_eq!(response.status, StatusCode::ImATeapot);
        assert_eq!(response.body, b"I'm a Teapot");
    }

    #[tokio::test]
    async fn test_route_params_reach_kwargs_and_handler() {
        let mut app = App::new();
        app.get("/users/{id}/posts/{post}", |req, resp, params| Box::pin(async move {
            let from_kwargs = req.kwargs.get("id").cloned().unwrap_or_default();
            let from_params = params.get("post").cloned().unwrap_or_default();
            resp.set_body(format!("{from_kwargs}/{from_params}"));
            Ok(())
        })).unwrap();

        let response = app.respond(HttpRequest::new(Method::GET, "/users/42/posts/7")).await;

        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(response.body, b"42/7");
    }

    #[tokio::test]
    async fn test_same_pattern_merges_methods() {
        let mut app = App::new();
        app.get("/items", |_req, resp, _params| {
            resp.set_body("list");
            Box::pin(async { Ok(()) })
        }).unwrap();
        app.route("/items", &[Method::POST, Method::PUT], |_req, resp, _params| {
            resp.status = StatusCode::Created;
            Box::pin(async { Ok(()) })
        }).unwrap();

        let routes: Vec<_> = app.router().routes().collect();
        assert_eq!(routes, vec![("/items", vec![Method::GET, Method::POST, Method::PUT])]);

        let listed = app.respond(HttpRequest::new(Method::GET, "/items")).await;
        assert_eq!(listed.body, b"list");
        let created = app.respond(HttpRequest::new(Method::PUT, "/items")).await;
        assert_eq!(created.status, StatusCode::Created);
        let deleted = app.respond(HttpRequest::new(Method::DELETE, "/items")).await;
        assert_eq!(deleted.status, StatusCode::MethodNotAllowed);
    }

    #[tokio::test]
    async fn test_invalid_route_pattern_is_rejected() {
        let mut app = App::new();
        app.get("/a/{id}", |_req, _resp, _params| Box::pin(async { Ok(()) })).unwrap();
        let result = app.get("/a/{name}", |_req, _resp, _params| Box::pin(async { Ok(()) }));
        assert!(matches!(result, Err(Error::InvalidRoute(_))));
    }

    #[tokio::test]
    async fn test_content_length_matches_body() {
        let mut app = App::new();
        app.get("/text", |_req, resp, _params| {
            resp.set_body("héllo");
            Box::pin(async { Ok(()) })
        }).unwrap();
        app.get("/empty", |_req, _resp, _params| Box::pin(async { Ok(()) })).unwrap();
        app.get("/explicit", |_req, resp, _params| {
            resp.set_header("Content-Length", "2");
            resp.set_body("ab");
            Box::pin(async { Ok(()) })
        }).unwrap();
        let app = Arc::new(app);

        for (path, expected) in [("/text", "6"), ("/empty", "0"), ("/explicit", "2")] {
            let response = app.respond(HttpRequest::new(Method::GET, path)).await;
            let length = response.body.len().to_string();
            let wire = String::from_utf8(response.into_bytes()).unwrap();
            assert_eq!(length, expected);
            assert!(wire.contains(&format!("Content-Length: {expected}\r\n")), "{wire}");
        }
    }

    #[tokio::test]
    async fn test_options_requests_are_answered_by_default() {
        let (_, response) = exchange_bytes(hello_app(), b"OPTIONS /anything HTTP/1.1\r\n\r\n").await;
        assert_eq!(response, "HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");

        let mut bare = App::bare();
        bare.get("/hello", |_req, _resp, _params| Box::pin(async { Ok(()) })).unwrap();
        let response = bare.respond(HttpRequest::new(Method::OPTIONS, "/hello")).await;
        assert_eq!(response.status, StatusCode::MethodNotAllowed);
    }

    #[tokio::test]
    async fn test_cors_headers_on_every_response() {
        let mut app = hello_app();
        extensions::cors(&mut app, Cors {
            headers: Some(vec!["Authorization".to_string(), "Content-Type".to_string()]),
            ..Cors::default()
        }.all_methods());

        let found = app.respond(HttpRequest::new(Method::GET, "/hello")).await;
        let missing = app.respond(HttpRequest::new(Method::GET, "/missing")).await;

        for response in [found, missing] {
            assert_eq!(response.headers.get("Access-Control-Allow-Origin").unwrap(), "*");
            assert_eq!(
                response.headers.get("Access-Control-Allow-Methods").unwrap(),
                "GET,HEAD,POST,PUT,DELETE,CONNECT,OPTIONS,TRACE,PATCH"
            );
            assert_eq!(
                response.headers.get("Access-Control-Allow-Headers").unwrap(),
                "Authorization,Content-Type"
            );
        }
    }

    #[tokio::test]
    async fn test_json_errors_extension() {
        let mut app = hello_app();
        extensions::log_errors(&mut app);
        extensions::json_errors(&mut app);

        let response = app.respond(HttpRequest::new(Method::GET, "/missing")).await;

        assert_eq!(response.status, StatusCode::NotFound);
        assert_eq!(response.headers.get("Content-Type").unwrap(), "application/json");
        let body: Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body, json!({ "status": 404, "message": "/missing" }));
    }

    #[tokio::test]
    async fn test_logger_extension_leaves_response_untouched() {
        let mut app = hello_app();
        extensions::logger(&mut app, log::Level::Debug);
        assert_eq!(app.hooks().len(hooks::REQUEST), 2);
        assert_eq!(app.hooks().len(hooks::RESPONSE), 1);

        let response = app.respond(HttpRequest::new(Method::GET, "/hello?name=Ada")).await;
        assert_eq!(response.body, br#"{"msg":"hi Ada"}"#);
    }

    #[tokio::test]
    async fn test_hook_chain_order_and_short_circuit() {
        let mut app = App::bare();
        for step in 1..=3u8 {
            app.listen("custom", move |exchange| {
                exchange.response.body.push(step);
                let handled = (step == 2).then_some(Handled);
                Box::pin(async move { Ok(handled) })
            });
        }

        let mut exchange = Exchange::default();
        let result = app.hook("custom", &mut exchange).await.unwrap();

        assert_eq!(result, Some(Handled));
        assert_eq!(exchange.response.body, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_unregistered_chain_is_not_an_error() {
        let app = App::bare();
        let mut exchange = Exchange::default();
        assert_eq!(app.hook("nobody-listens", &mut exchange).await.unwrap(), None);
        assert!(app.startup().await.is_ok());
        assert!(app.shutdown().await.is_ok());
    }

    #[tokio::test]
    async fn test_failing_startup_hook_is_reported() {
        let mut app = App::bare();
        app.listen(hooks::STARTUP, |_exchange| Box::pin(async {
            Err(Error::internal("database unreachable"))
        }));

        let result = app.startup().await;
        assert!(matches!(result, Err(Error::InternalError(ref m)) if m == "database unreachable"));
    }

    #[tokio::test]
    async fn test_pipelined_requests_get_one_response_each() {
        let (result, response) = exchange_bytes(
            hello_app(),
            b"GET /hello?name=A HTTP/1.1\r\n\r\nGET /missing HTTP/1.1\r\n\r\nGET /hello?name=B HTTP/1.1\r\n\r\n",
        ).await;

        assert!(result.is_ok());
        assert_eq!(response.matches("HTTP/1.1 ").count(), 3);
        let first = response.find("hi A").unwrap();
        let second = response.find("/missing").unwrap();
        let third = response.find("hi B").unwrap();
        assert!(first < second && second < third);
    }

    #[tokio::test]
    async fn test_request_split_across_reads() {
        let mut app = App::new();
        app.route("/echo", &[Method::POST], |req, resp, _params| {
            resp.set_body(req.body.clone());
            Box::pin(async { Ok(()) })
        }).unwrap();

        let mut stream = MockTcpStream::with_chunks(vec![
            b"POST /echo HTTP/1.1\r\nContent-Le".to_vec(),
            b"ngth: 11\r\n\r\nhello".to_vec(),
            b" world".to_vec(),
        ]);
        let mut connection = Connection::new(&mut stream, Arc::new(app), 1024);
        assert_eq!(connection.state(), ConnectionState::Connected);

        connection.run().await.unwrap();

        assert_eq!(connection.state(), ConnectionState::Closed);
        assert_eq!(connection.responses_written(), 1);
        drop(connection);
        assert!(stream.written().ends_with("\r\n\r\nhello world"));
    }

    #[tokio::test]
    async fn test_connection_close_stops_after_response() {
        let (result, response) = exchange_bytes(
            hello_app(),
            b"GET /hello HTTP/1.1\r\nConnection: close\r\n\r\nGET /hello HTTP/1.1\r\n\r\n",
        ).await;

        assert!(result.is_ok());
        assert_eq!(response.matches("HTTP/1.1 ").count(), 1);
    }

    #[tokio::test]
    async fn test_write_to_closed_transport_is_local_failure() {
        let mut stream = MockTcpStream::broken(b"GET /hello HTTP/1.1\r\n\r\n".to_vec());
        let mut connection = Connection::new(&mut stream, Arc::new(hello_app()), 1024);

        let result = connection.run().await;

        assert!(matches!(result, Err(Error::IoError(_))));
        assert_eq!(connection.state(), ConnectionState::Closed);
        assert_eq!(connection.responses_written(), 0);
    }

    #[tokio::test]
    async fn test_status_codes() {
        assert_eq!(StatusCode::from_u16(404).unwrap(), StatusCode::NotFound);
        assert_eq!(StatusCode::try_from(201u16).unwrap(), StatusCode::Created);
        assert!(matches!(StatusCode::from_u16(299), Err(Error::InvalidStatus(299))));
        assert_eq!(StatusCode::NotFound.to_string(), "404 Not Found");
        assert_eq!(StatusCode::default(), StatusCode::Ok);

        let mut response = HttpResponse::default();
        assert!(response.set_status(418).is_ok());
        assert_eq!(response.status, StatusCode::ImATeapot);
        assert!(matches!(response.set_status(999), Err(Error::InvalidStatus(999))));
        assert_eq!(response.status, StatusCode::ImATeapot);
    }

    #[tokio::test]
    async fn test_response_builder_and_writer() {
        let response = HttpResponse::new(StatusCode::Created)
            .with_content_type("text/plain")
            .with_header("X-Request-Id", "abc")
            .with_body_string("done");

        let wire = String::from_utf8(response.into_bytes()).unwrap();
        assert_eq!(
            wire,
            "HTTP/1.1 201 Created\r\nContent-Length: 4\r\nContent-Type: text/plain\r\nX-Request-Id: abc\r\n\r\ndone"
        );

        let json = HttpResponse::new(StatusCode::Ok).with_json(&json!([1, 2, 3])).unwrap();
        assert_eq!(json.body, b"[1,2,3]");
        assert_eq!(json.headers.get("Content-Type").unwrap(), "application/json");
    }

    #[tokio::test]
    async fn test_http_error_normalization() {
        let plain = Error::internal("disk full").into_http();
        assert_eq!(plain.status, StatusCode::InternalServerError);
        assert_eq!(plain.message, "disk full");

        let http = Error::from(HttpError::with_message(StatusCode::Conflict, "taken")).into_http();
        assert_eq!(http, HttpError::with_message(StatusCode::Conflict, "taken"));

        let default_message = HttpError::new(StatusCode::MethodNotAllowed);
        assert_eq!(default_message.message, "Method Not Allowed");
        assert_eq!(Error::from(StatusCode::Gone).into_http().message, "Gone");
    }

    #[tokio::test]
    async fn test_serve_over_tcp_with_lifecycle_hooks() {
        let _ = env_logger::builder().is_test(true).try_init();

        let started = counter();
        let stopped = counter();
        let mut app = hello_app();
        let on_start = started.clone();
        app.listen(hooks::STARTUP, move |_exchange| {
            on_start.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(None) })
        });
        let on_stop = stopped.clone();
        app.listen(hooks::SHUTDOWN, move |_exchange| {
            on_stop.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(None) })
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = ServerConfig {
            addr,
            shutdown_timeout: Duration::from_secs(5),
            ..ServerConfig::default()
        };
        let server = HttpServer::new(config, app);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let server_handle = tokio::spawn(async move {
            server.serve(listener, async {
                let _ = shutdown_rx.await;
            }).await
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"GET /hello?name=Ada HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        client.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.ends_with("{\"msg\":\"hi Ada\"}"));
        assert_eq!(started.load(Ordering::SeqCst), 1);

        shutdown_tx.send(()).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), server_handle)
            .await
            .expect("server did not shut down")
            .expect("server task panicked");

        assert!(result.is_ok());
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connection_limit_response() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = ServerConfig {
            addr,
            max_connections: 0,
            ..ServerConfig::default()
        };
        let server = HttpServer::new(config, hello_app());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let server_handle = tokio::spawn(async move {
            server.serve(listener, async {
                let _ = shutdown_rx.await;
            }).await
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut response = String::new();
        client.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 503 Service Unavailable\r\n"));
        assert!(response.contains("Content-Type: text/plain\r\n"));
        assert!(response.ends_with("Server is at capacity, please try again later"));

        shutdown_tx.send(()).unwrap();
        assert!(server_handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_header_with_line_break_is_dropped() {
        let mut app = App::new();
        app.get("/echo", |req, resp, _params| {
            let value = req.query_param("v").unwrap_or_default().to_string();
            resp.set_header("X-Echo", value);
            resp.set_header("X-Safe", "ok");
            Box::pin(async { Ok(()) })
        }).unwrap();

        let response = app
            .respond(HttpRequest::new(Method::GET, "/echo?v=a%0D%0ASet-Cookie%3A+evil%3D1"))
            .await;
        let wire = String::from_utf8(response.into_bytes()).unwrap();

        assert!(!wire.contains("Set-Cookie"), "{wire}");
        assert!(!wire.contains("X-Echo"));
        assert!(wire.contains("X-Safe: ok\r\n"));
        assert!(wire.starts_with("HTTP/1.1 200 OK\r\n"));
    }
}
