//! An in-memory stand-in for the HTTP server.
//!
//! [`RecordingServer`] receives endpoints from a route builder and matches
//! test requests against them the way a real server would: the first route
//! whose pattern matches the whole path and whose method matches wins, its
//! permission handler runs, and only then the request handler.

use http::{Method, StatusCode};
use regex::Regex;
use tracing::{debug, warn};
use trellis_core::{HandlerError, Params, Reply};
use trellis_router::{Endpoint, EndpointRegistry};

use crate::error::TestError;
use crate::request::{TestRequest, TestRequestBuilder};
use crate::response::TestResponse;

/// Error code for requests no route matches.
pub const NO_ROUTE_CODE: &str = "no_route";

/// Error code for requests a permission handler rejects, as rendered by
/// [`HandlerError::forbidden`].
pub const FORBIDDEN_CODE: &str = "forbidden";

/// One endpoint as the server recorded it.
#[derive(Debug, Clone)]
pub struct RecordedRoute {
    namespace: String,
    pattern: String,
    matcher: Regex,
    endpoint: Endpoint,
}

impl RecordedRoute {
    /// Namespace the endpoint was registered under.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The registered pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.endpoint.method
    }

    /// The endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn captures(&self, path: &str) -> Option<Params> {
        let caps = self.matcher.captures(path)?;
        Some(
            self.matcher
                .capture_names()
                .flatten()
                .filter_map(|name| caps.name(name).map(|m| (name, m.as_str())))
                .collect(),
        )
    }
}

/// Records registered endpoints and dispatches test requests to them.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use http::StatusCode;
/// use trellis_core::{Container, Inject, Request, StaticNamespace};
/// use trellis_middleware::AllowAll;
/// use trellis_router::{Callback, RouteBuilder};
/// use trellis_test::{RecordingServer, TestRequest};
///
/// let mut server = RecordingServer::new();
/// RouteBuilder::new(
///     &mut server,
///     Arc::new(Container::new()),
///     StaticNamespace::new("shop"),
///     AllowAll,
/// )
/// .get(
///     "orders/{id}",
///     Callback::direct(|req: Inject<Request>| req.param("id").unwrap_or_default().to_string()),
///     &[],
/// )
/// .unwrap();
///
/// let response = server.get("/shop/orders/42").send().unwrap();
/// response.assert_status(StatusCode::OK);
/// assert_eq!(response.body(), "42");
/// ```
#[derive(Debug, Default)]
pub struct RecordingServer {
    routes: Vec<RecordedRoute>,
    rejected: Vec<TestError>,
}

impl RecordingServer {
    /// Creates an empty server.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes in registration order.
    #[must_use]
    pub fn routes(&self) -> &[RecordedRoute] {
        &self.routes
    }

    /// Registered patterns in registration order.
    #[must_use]
    pub fn patterns(&self) -> Vec<&str> {
        self.routes.iter().map(RecordedRoute::pattern).collect()
    }

    /// `(method, pattern)` pairs in registration order.
    #[must_use]
    pub fn table(&self) -> Vec<(Method, String)> {
        self.routes
            .iter()
            .map(|r| (r.method().clone(), r.pattern.clone()))
            .collect()
    }

    /// Registrations whose pattern did not compile.
    #[must_use]
    pub fn rejected(&self) -> &[TestError] {
        &self.rejected
    }

    /// Dispatches a request.
    ///
    /// - No route matches path and method: 404 `no_route`.
    /// - The permission handler refuses: 403 `forbidden`.
    /// - Otherwise the request handler's reply, with captured path
    ///   parameters attached to the request.
    pub fn dispatch(&self, request: TestRequest) -> TestResponse {
        let path = request.path().to_string();
        let matched = self
            .routes
            .iter()
            .filter(|route| route.endpoint.method == request.method)
            .find_map(|route| route.captures(&path).map(|params| (route, params)));

        let Some((route, params)) = matched else {
            debug!(http.method = %request.method, path = %path, "No route matched");
            return error_response(&HandlerError::new(
                StatusCode::NOT_FOUND,
                NO_ROUTE_CODE,
                "No route was found matching the URL and request method",
            ));
        };

        let request = request.into_request(params);
        if !route.endpoint.is_permitted(&request) {
            debug!(route.path = %route.pattern, "Permission denied");
            return error_response(&HandlerError::forbidden(
                "Sorry, you are not allowed to do that",
            ));
        }

        route.endpoint.handle(request).into()
    }

    /// Starts a GET request bound to this server.
    pub fn get(&self, uri: impl AsRef<str>) -> ServerRequest<'_> {
        ServerRequest::new(self, TestRequest::get(uri))
    }

    /// Starts a POST request bound to this server.
    pub fn post(&self, uri: impl AsRef<str>) -> ServerRequest<'_> {
        ServerRequest::new(self, TestRequest::post(uri))
    }

    /// Starts a PUT request bound to this server.
    pub fn put(&self, uri: impl AsRef<str>) -> ServerRequest<'_> {
        ServerRequest::new(self, TestRequest::put(uri))
    }

    /// Starts a PATCH request bound to this server.
    pub fn patch(&self, uri: impl AsRef<str>) -> ServerRequest<'_> {
        ServerRequest::new(self, TestRequest::patch(uri))
    }

    /// Starts a DELETE request bound to this server.
    pub fn delete(&self, uri: impl AsRef<str>) -> ServerRequest<'_> {
        ServerRequest::new(self, TestRequest::delete(uri))
    }
}

impl EndpointRegistry for RecordingServer {
    fn register_endpoint(&mut self, namespace: &str, pattern: &str, endpoint: Endpoint) {
        match Regex::new(&format!("^{pattern}$")) {
            Ok(matcher) => self.routes.push(RecordedRoute {
                namespace: namespace.to_string(),
                pattern: pattern.to_string(),
                matcher,
                endpoint,
            }),
            Err(source) => {
                warn!(route.path = %pattern, error = %source, "Pattern rejected");
                self.rejected.push(TestError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                });
            }
        }
    }
}

fn error_response(err: &HandlerError) -> TestResponse {
    Reply::from_error(err, http::HeaderMap::new()).into()
}

/// A request builder bound to a [`RecordingServer`].
#[must_use]
pub struct ServerRequest<'a> {
    server: &'a RecordingServer,
    builder: TestRequestBuilder,
}

impl<'a> ServerRequest<'a> {
    fn new(server: &'a RecordingServer, builder: TestRequestBuilder) -> Self {
        Self { server, builder }
    }

    /// Sets a header on the request.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets the Authorization header with a Bearer token.
    pub fn bearer_token(mut self, token: impl AsRef<str>) -> Self {
        self.builder = self.builder.bearer_token(token);
        self
    }

    /// Sets the request body as JSON.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Builds and dispatches the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be built.
    pub fn send(self) -> Result<TestResponse, TestError> {
        Ok(self.server.dispatch(self.builder.build()?))
    }
}
