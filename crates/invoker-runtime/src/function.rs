//! Function handler traits.
//!
//! A function implements exactly one of the three traits below. Instances are
//! constructed once at startup and shared by every concurrent invocation, so
//! implementations must be stateless or synchronize their own state.

use crate::cloudevent::StructuredEvent;
use crate::context::Context;
use crate::error::{ConfigurationError, InvokeResult};
use crate::event::{HttpRequest, HttpResponse};
use crate::output::Output;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeSet;
use std::fmt;

/// Path pattern that matches every request
pub const CATCH_ALL_PATH: &str = "/*";

/// A function that reads the raw HTTP request and writes the raw response
#[async_trait]
pub trait HttpFunction: Send + Sync + 'static {
    async fn service(&self, request: &HttpRequest, response: &mut HttpResponse) -> InvokeResult;

    /// Path and methods served by this function. `None` serves every request.
    fn route(&self) -> Option<Route> {
        None
    }
}

/// A function that consumes a structured (CloudEvents) event.
///
/// Returning a functional error is a normal failed outcome: it is recorded in
/// the output envelope.
#[async_trait]
pub trait EventFunction: Send + Sync + 'static {
    async fn accept(&self, ctx: &mut Context, event: StructuredEvent) -> InvokeResult;

    fn route(&self) -> Option<Route> {
        None
    }
}

/// A byte-in, byte-out function.
///
/// This is the only kind that can serve sidecar callback events.
#[async_trait]
pub trait OpenFunction: Send + Sync + 'static {
    async fn accept(&self, ctx: &mut Context, payload: Bytes) -> InvokeResult<Output>;

    fn route(&self) -> Option<Route> {
        None
    }
}

/// Path pattern and allowed methods declared by a function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    path: String,
    methods: Option<BTreeSet<String>>,
}

impl Route {
    /// A route accepting every method
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            methods: None,
        }
    }

    /// The route used by functions that declare none
    pub fn catch_all() -> Self {
        Self::new(CATCH_ALL_PATH)
    }

    /// Restrict the route to the given methods. Names are case-insensitive.
    pub fn with_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let methods = methods
            .into_iter()
            .map(|m| m.as_ref().trim().to_ascii_uppercase())
            .filter(|m| !m.is_empty())
            .collect::<BTreeSet<_>>();

        self.methods = if methods.is_empty() {
            None
        } else {
            Some(methods)
        };
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Allowed methods, `None` when every method is allowed
    pub fn methods(&self) -> Option<&BTreeSet<String>> {
        self.methods.as_ref()
    }

    pub fn allows(&self, method: &str) -> bool {
        match &self.methods {
            None => true,
            Some(methods) => methods.contains(&method.to_ascii_uppercase()),
        }
    }

    pub(crate) fn pattern(&self) -> Result<PathPattern, ConfigurationError> {
        PathPattern::parse(&self.path)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.methods {
            None => write!(f, "* {}", self.path),
            Some(methods) => {
                let methods = methods.iter().cloned().collect::<Vec<_>>().join(",");
                write!(f, "{} {}", methods, self.path)
            }
        }
    }
}

/// Parsed form of a route path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum PathPattern {
    Exact(String),
    /// `/base/*`, matches `/base` and everything below it
    Prefix(String),
    CatchAll,
}

impl PathPattern {
    pub(crate) fn parse(path: &str) -> Result<Self, ConfigurationError> {
        let path = path.trim();
        if !path.starts_with('/') {
            return Err(ConfigurationError::InvalidRoute(path.to_string()));
        }

        if path == "/" || path == CATCH_ALL_PATH {
            return Ok(PathPattern::CatchAll);
        }

        if let Some(base) = path.strip_suffix("/*") {
            if base.contains('*') {
                return Err(ConfigurationError::InvalidRoute(path.to_string()));
            }
            return Ok(PathPattern::Prefix(base.to_string()));
        }

        if path.contains('*') {
            return Err(ConfigurationError::InvalidRoute(path.to_string()));
        }

        let path = path.strip_suffix('/').unwrap_or(path);
        Ok(PathPattern::Exact(path.to_string()))
    }

    /// Whether `path` is `base` or lies below it
    pub(crate) fn is_under(base: &str, path: &str) -> bool {
        path == base
            || path
                .strip_prefix(base)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}
