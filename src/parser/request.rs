//! HTTP request representation, accumulated from wire events.

use std::collections::HashMap;
use serde::de::DeserializeOwned;

use crate::parser::error::Error;
use crate::parser::method::Method;
use crate::parser::version::HttpVersion;
use crate::parser::wire::ParserEvents;

/// Represents an HTTP request.
///
/// A request starts out empty and is filled in by the wire parser: the URL
/// event sets the path and query, header and body events accumulate, and the
/// completion event fixes the method. Route parameters land in `kwargs` once
/// the dispatcher has matched a route.
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request path, without query string or fragment
    pub path: String,
    /// The raw query string, without the leading `?`
    pub query_string: String,
    /// Decoded query parameters; a key may carry several values
    pub query: HashMap<String, Vec<String>>,
    /// The HTTP version
    pub version: HttpVersion,
    /// The HTTP headers, last value wins on duplicate names
    pub headers: HashMap<String, String>,
    /// The request body
    pub body: Vec<u8>,
    /// Parameters extracted from the matched route pattern
    pub kwargs: HashMap<String, String>,
}

impl HttpRequest {
    /// Create an empty request for the given method and URL.
    ///
    /// Mostly useful for driving an [`App`](crate::App) directly in tests.
    pub fn new(method: Method, url: &str) -> Self {
        let mut request = Self::default();
        request.on_url(url);
        request.method = method;
        request
    }

    /// Add or replace a header, returning the request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Replace the body, returning the request.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Get a header value.
    ///
    /// Header names are compared case-insensitively.
    pub fn get_header(&self, name: &str) -> Option<&String> {
        self.headers.iter().find_map(|(k, v)| {
            if k.eq_ignore_ascii_case(name) {
                Some(v)
            } else {
                None
            }
        })
    }

    /// Check if a header exists.
    pub fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// Parse the request body as JSON.
    ///
    /// # Returns
    ///
    /// The parsed JSON value, or an error if the body is not valid JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        if !self.is_json() {
            return Err(Error::MissingHeader("Content-Type: application/json".to_string()));
        }

        let json = serde_json::from_slice(&self.body)?;
        Ok(json)
    }

    /// Check if the request has a JSON body.
    pub fn is_json(&self) -> bool {
        if let Some(content_type) = self.get_header("Content-Type") {
            content_type.starts_with("application/json")
        } else {
            false
        }
    }

    /// Get the first value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Get every value of a query parameter, in order of appearance.
    pub fn query_values(&self, name: &str) -> &[String] {
        self.query.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether the client asked for the connection to be closed after this
    /// exchange.
    pub fn wants_close(&self) -> bool {
        let connection = self.get_header("Connection").map(|v| v.to_ascii_lowercase());
        match (self.version, connection.as_deref()) {
            (_, Some("close")) => true,
            (HttpVersion::Http10, Some("keep-alive")) => false,
            (HttpVersion::Http10, _) => true,
            _ => false,
        }
    }
}

impl ParserEvents for HttpRequest {
    fn on_url(&mut self, url: &str) {
        // Absolute-form targets (proxies) are reduced to path and query.
        let (path, query) = if url.starts_with('/') || url == "*" {
            let without_fragment = url.split_once('#').map_or(url, |(head, _)| head);
            match without_fragment.split_once('?') {
                Some((path, query)) => (path.to_string(), query.to_string()),
                None => (without_fragment.to_string(), String::new()),
            }
        } else {
            match url::Url::parse(url) {
                Ok(parsed) => (parsed.path().to_string(), parsed.query().unwrap_or_default().to_string()),
                Err(_) => (url.to_string(), String::new()),
            }
        };

        let mut decoded: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            decoded.entry(key.into_owned()).or_default().push(value.into_owned());
        }

        self.path = path;
        self.query_string = query;
        self.query = decoded;
    }

    fn on_header(&mut self, name: &[u8], value: &[u8]) {
        let name = String::from_utf8_lossy(name).into_owned();
        let value = String::from_utf8_lossy(value).into_owned();
        self.headers.insert(name, value);
    }

    fn on_body(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
    }

    fn on_message_complete(&mut self, method: Method, version: HttpVersion) {
        self.method = method;
        self.version = version;
    }
}
