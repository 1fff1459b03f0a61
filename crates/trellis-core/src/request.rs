//! The inbound request object.
//!
//! The external server builds a [`Request`] for every matched endpoint and
//! passes it to the compiled handler, which binds it into the request's DI
//! scope. Callbacks read it back with `Inject<Request>`.

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};
use serde::de::DeserializeOwned;

use crate::{HandlerError, Params};

/// An inbound request as seen by route callbacks.
///
/// # Example
///
/// ```rust
/// use trellis_core::{Params, Request};
/// use http::{HeaderMap, Method, Uri};
/// use bytes::Bytes;
///
/// let mut params = Params::new();
/// params.insert("id", "123");
///
/// let request = Request::new(
///     Method::GET,
///     Uri::from_static("/shop/v2/orders/123?expand=items"),
///     HeaderMap::new(),
///     Bytes::new(),
/// )
/// .with_params(params);
///
/// assert_eq!(request.path(), "/shop/v2/orders/123");
/// assert_eq!(request.param("id"), Some("123"));
/// assert_eq!(request.query_param("expand").as_deref(), Some("items"));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    params: Params,
}

impl Request {
    /// Creates a request without path parameters.
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            params: Params::new(),
        }
    }

    /// Attaches the parameters captured by the matcher.
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the URI path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns the first value of a query-string parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.uri.query()?.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (key == name).then(|| value.to_string())
        })
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the raw body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the captured path parameters.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Returns one captured path parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Deserializes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns a 400 `HandlerError` if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| HandlerError::bad_request(format!("invalid JSON body: {e}")))
    }
}
