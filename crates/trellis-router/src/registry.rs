//! The boundary to the HTTP server.
//!
//! The route builder never matches requests itself. Every declaration ends
//! in one [`EndpointRegistry::register_endpoint`] call carrying the final
//! regex pattern and an [`Endpoint`]; the server owns matching, calls the
//! permission handler, and then calls the request handler.

use std::fmt;
use std::sync::Arc;

use http::Method;
use trellis_core::{Reply, Request};

/// Handles a matched request.
pub type RequestHandler = Arc<dyn Fn(Request) -> Reply + Send + Sync>;

/// Decides whether a matched request may reach the request handler.
pub type PermissionHandler = Arc<dyn Fn(&Request) -> bool + Send + Sync>;

/// A method-tagged endpoint handed to the server.
#[derive(Clone)]
pub struct Endpoint {
    /// HTTP method.
    pub method: Method,
    /// Request handler.
    pub handler: RequestHandler,
    /// Permission handler.
    pub permission: PermissionHandler,
}

impl Endpoint {
    /// Runs the permission handler.
    #[must_use]
    pub fn is_permitted(&self, request: &Request) -> bool {
        (self.permission)(request)
    }

    /// Runs the request handler.
    #[must_use]
    pub fn handle(&self, request: Request) -> Reply {
        (self.handler)(request)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// A fully compiled route, ready for registration.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    /// API namespace.
    pub namespace: String,
    /// Final pattern, `/<namespace>[/<version>]/<rest>`.
    pub path: String,
    /// The endpoint.
    pub endpoint: Endpoint,
}

/// Receives compiled endpoints.
pub trait EndpointRegistry {
    /// Registers `endpoint` under `pattern` in `namespace`.
    fn register_endpoint(&mut self, namespace: &str, pattern: &str, endpoint: Endpoint);
}

impl<R: EndpointRegistry + ?Sized> EndpointRegistry for &mut R {
    fn register_endpoint(&mut self, namespace: &str, pattern: &str, endpoint: Endpoint) {
        (**self).register_endpoint(namespace, pattern, endpoint);
    }
}

impl EndpointRegistry for Vec<CompiledRoute> {
    fn register_endpoint(&mut self, namespace: &str, pattern: &str, endpoint: Endpoint) {
        self.push(CompiledRoute {
            namespace: namespace.to_string(),
            path: pattern.to_string(),
            endpoint,
        });
    }
}
