//! Path routing.
//!
//! Pattern matching is delegated to `matchit`; this module keeps one handler
//! table per registered pattern and exposes the narrow
//! `at(path) -> (params, handlers)` lookup the dispatcher needs.

use std::collections::HashMap;

use thiserror::Error;

use crate::parser::Method;
use crate::server::error::Error;
use crate::server::handler::{HandlerFn, HandlerTable, Params};

/// Errors raised by a route lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// No registered pattern matches the path.
    #[error("No route matches path: {0}")]
    NotFound(String),
}

/// Maps path patterns to per-method handler tables.
pub struct Router {
    matcher: matchit::Router<usize>,
    patterns: HashMap<String, usize>,
    routes: Vec<(String, HandlerTable)>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Create an empty router.
    pub fn new() -> Self {
        Self {
            matcher: matchit::Router::new(),
            patterns: HashMap::new(),
            routes: Vec::new(),
        }
    }

    /// Register `handler` for each of `methods` on `pattern`.
    ///
    /// Patterns use `matchit` syntax: `/users/{id}` captures one segment,
    /// `/files/{*path}` captures the rest of the path. Registering a pattern
    /// again adds to its method table.
    pub fn add(&mut self, pattern: &str, methods: &[Method], handler: HandlerFn) -> Result<(), Error> {
        let index = match self.patterns.get(pattern) {
            Some(index) => *index,
            None => {
                let index = self.routes.len();
                self.matcher.insert(pattern, index)?;
                self.patterns.insert(pattern.to_string(), index);
                self.routes.push((pattern.to_string(), HandlerTable::new()));
                index
            }
        };

        let (_, table) = &mut self.routes[index];
        for method in methods {
            table.insert(*method, handler.clone());
        }
        Ok(())
    }

    /// Resolve `path` to its parameters and handler table.
    pub fn at(&self, path: &str) -> Result<(Params, &HandlerTable), RouteError> {
        let matched = self
            .matcher
            .at(path)
            .map_err(|_| RouteError::NotFound(path.to_string()))?;

        let params = matched
            .params
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        let (_, table) = &self.routes[*matched.value];
        Ok((params, table))
    }

    /// Registered patterns with their methods, in registration order.
    pub fn routes(&self) -> impl Iterator<Item = (&str, Vec<Method>)> + '_ {
        self.routes.iter().map(|(pattern, table)| {
            let mut methods: Vec<Method> = table.keys().copied().collect();
            methods.sort();
            (pattern.as_str(), methods)
        })
    }

    /// Number of registered patterns.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no pattern is registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
