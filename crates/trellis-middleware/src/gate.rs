//! Middleware gates.
//!
//! A [`MiddlewareGate`] turns the ordered middleware list captured at
//! declaration time into a yes/no answer for one request. The route builder
//! holds one gate and calls it from every compiled permission handler.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, warn};
use trellis_core::Request;

use crate::Middleware;

/// Evaluates a route's middleware list against a request.
pub trait MiddlewareGate: Send + Sync {
    /// Returns true if `request` passes every entry of `middleware`.
    fn is_allowed(&self, middleware: &[String], request: &Request) -> bool;
}

impl<G: MiddlewareGate + ?Sized> MiddlewareGate for Arc<G> {
    fn is_allowed(&self, middleware: &[String], request: &Request) -> bool {
        (**self).is_allowed(middleware, request)
    }
}

/// A gate that allows everything. Useful in development and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl MiddlewareGate for AllowAll {
    fn is_allowed(&self, _middleware: &[String], _request: &Request) -> bool {
        true
    }
}

/// A gate backed by named [`Middleware`] predicates.
///
/// Every listed identifier must allow the request. Identifiers with no
/// registered predicate deny, so a typo in a route declaration closes the
/// route rather than opening it. An empty list allows.
///
/// # Example
///
/// ```
/// use trellis_middleware::{MiddlewareGate, MiddlewareRegistry, RequireHeader};
/// use trellis_core::Request;
/// use http::{header, HeaderMap, HeaderValue, Method, Uri};
/// use bytes::Bytes;
///
/// let gate = MiddlewareRegistry::new()
///     .with("auth", RequireHeader::present(header::AUTHORIZATION));
///
/// let mut headers = HeaderMap::new();
/// headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer t"));
/// let request = Request::new(Method::GET, Uri::from_static("/"), headers, Bytes::new());
///
/// assert!(gate.is_allowed(&["auth".to_string()], &request));
/// assert!(!gate.is_allowed(&["admin".to_string()], &request));
/// ```
#[derive(Default)]
pub struct MiddlewareRegistry {
    entries: IndexMap<String, Arc<dyn Middleware>>,
}

impl MiddlewareRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `middleware` under `id`, replacing any earlier entry.
    pub fn register(&mut self, id: impl Into<String>, middleware: impl Middleware) -> &mut Self {
        self.entries.insert(id.into(), Arc::new(middleware));
        self
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, id: impl Into<String>, middleware: impl Middleware) -> Self {
        self.register(id, middleware);
        self
    }

    /// Returns true if `id` is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Iterates over registered identifiers in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl MiddlewareGate for MiddlewareRegistry {
    fn is_allowed(&self, middleware: &[String], request: &Request) -> bool {
        middleware.iter().all(|id| match self.entries.get(id) {
            Some(entry) => {
                let allowed = entry.allows(request);
                if !allowed {
                    debug!(middleware = %id, path = request.path(), "Middleware denied request");
                }
                allowed
            }
            None => {
                warn!(middleware = %id, "Unknown middleware identifier, denying request");
                false
            }
        })
    }
}

impl fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareRegistry")
            .field("ids", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
