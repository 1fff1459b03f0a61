//! The middleware predicate trait and its built-in implementations.
//!
//! Route middleware does not wrap the handler. Each identifier attached to a
//! route names a predicate over the inbound request; the route's permission
//! handler passes only if every predicate allows the request.

use http::header::HeaderName;
use trellis_core::Request;

/// A named permission predicate.
pub trait Middleware: Send + Sync + 'static {
    /// Returns true if `request` may reach the route's handler.
    fn allows(&self, request: &Request) -> bool;
}

/// A middleware built from a closure.
///
/// # Example
///
/// ```
/// use trellis_middleware::{FnMiddleware, Middleware};
/// use trellis_core::Request;
/// use http::{HeaderMap, Method, Uri};
/// use bytes::Bytes;
///
/// let get_only = FnMiddleware::new(|request: &Request| request.method() == Method::GET);
///
/// let request = Request::new(Method::GET, Uri::from_static("/"), HeaderMap::new(), Bytes::new());
/// assert!(get_only.allows(&request));
/// ```
pub struct FnMiddleware<F> {
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Wraps `func`.
    pub const fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&Request) -> bool + Send + Sync + 'static,
{
    fn allows(&self, request: &Request) -> bool {
        (self.func)(request)
    }
}

/// Allows requests carrying a header, optionally with an exact value.
#[derive(Debug, Clone)]
pub struct RequireHeader {
    name: HeaderName,
    value: Option<String>,
}

impl RequireHeader {
    /// Requires `name` to be present.
    #[must_use]
    pub fn present(name: HeaderName) -> Self {
        Self { name, value: None }
    }

    /// Requires `name` to equal `value`.
    #[must_use]
    pub fn equals(name: HeaderName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: Some(value.into()),
        }
    }
}

impl Middleware for RequireHeader {
    fn allows(&self, request: &Request) -> bool {
        let Some(actual) = request.headers().get(&self.name) else {
            return false;
        };
        match &self.value {
            Some(expected) => actual.to_str().is_ok_and(|v| v == expected),
            None => true,
        }
    }
}
