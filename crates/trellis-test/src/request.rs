//! Test request building.

use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use serde::Serialize;
use trellis_core::{Params, Request};

use crate::error::TestError;

/// A request to dispatch against a [`RecordingServer`](crate::RecordingServer).
#[derive(Debug, Clone)]
pub struct TestRequest {
    /// HTTP method
    pub method: Method,
    /// Request URI
    pub uri: Uri,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body
    pub body: Bytes,
}

impl TestRequest {
    /// Creates a new GET request.
    pub fn get(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::GET, uri)
    }

    /// Creates a new POST request.
    pub fn post(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::POST, uri)
    }

    /// Creates a new PUT request.
    pub fn put(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PUT, uri)
    }

    /// Creates a new PATCH request.
    pub fn patch(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PATCH, uri)
    }

    /// Creates a new DELETE request.
    pub fn delete(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::DELETE, uri)
    }

    /// The URI path, without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Converts this request into the object handed to compiled handlers.
    #[must_use]
    pub fn into_request(self, params: Params) -> Request {
        Request::new(self.method, self.uri, self.headers, self.body).with_params(params)
    }
}

/// Builder for constructing test requests.
///
/// Invalid headers or bodies do not panic; the first problem is reported by
/// [`build`](Self::build).
#[derive(Debug)]
#[must_use]
pub struct TestRequestBuilder {
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Option<Bytes>,
    error: Option<TestError>,
}

impl TestRequestBuilder {
    /// Creates a new request builder.
    pub fn new(method: Method, uri: impl AsRef<str>) -> Self {
        Self {
            method,
            uri: uri.as_ref().to_string(),
            headers: HeaderMap::new(),
            body: None,
            error: None,
        }
    }

    /// Sets a header on the request.
    ///
    /// # Example
    ///
    /// ```
    /// use trellis_test::TestRequest;
    ///
    /// let request = TestRequest::get("/api/v1/orders")
    ///     .header("x-api-key", "secret")
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(request.headers["x-api-key"], "secret");
    /// ```
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let parsed = HeaderName::try_from(name.as_ref())
            .map_err(|e| TestError::InvalidHeader(format!("{}: {e}", name.as_ref())))
            .and_then(|name| {
                HeaderValue::try_from(value.as_ref())
                    .map(|value| (name, value))
                    .map_err(|e| TestError::InvalidHeader(format!("{}: {e}", value.as_ref())))
            });

        match parsed {
            Ok((name, value)) => {
                self.headers.insert(name, value);
            }
            Err(e) => self.fail(e),
        }
        self
    }

    /// Sets the Authorization header with a Bearer token.
    pub fn bearer_token(self, token: impl AsRef<str>) -> Self {
        self.header(header::AUTHORIZATION.as_str(), format!("Bearer {}", token.as_ref()))
    }

    /// Sets the raw request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the request body as JSON.
    ///
    /// This also sets the `Content-Type` header to `application/json`.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.body = Some(Bytes::from(bytes)),
            Err(e) => self.fail(e.into()),
        }
        self.header(header::CONTENT_TYPE.as_str(), "application/json")
    }

    /// Builds the test request.
    ///
    /// # Errors
    ///
    /// Returns the first header or body problem, or an invalid URI.
    pub fn build(self) -> Result<TestRequest, TestError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let uri: Uri = self
            .uri
            .parse()
            .map_err(|e| TestError::RequestBuild(format!("invalid URI '{}': {e}", self.uri)))?;

        Ok(TestRequest {
            method: self.method,
            uri,
            headers: self.headers,
            body: self.body.unwrap_or_default(),
        })
    }

    fn fail(&mut self, err: TestError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_request() {
        let request = TestRequest::get("/api/v1/orders?page=2").build().unwrap();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path(), "/api/v1/orders");
        assert!(request.body.is_empty());
    }

    #[test]
    fn test_json_body() {
        let request = TestRequest::post("/api/v1/orders")
            .json(&json!({"sku": "A-1"}))
            .build()
            .unwrap();
        assert_eq!(request.headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(request.body, Bytes::from_static(br#"{"sku":"A-1"}"#));
    }

    #[test]
    fn test_bearer_token() {
        let request = TestRequest::delete("/x").bearer_token("t0k").build().unwrap();
        assert_eq!(request.headers[header::AUTHORIZATION], "Bearer t0k");
    }

    #[test]
    fn test_invalid_header_reported_at_build() {
        let err = TestRequest::get("/x")
            .header("bad header", "v")
            .header("x-ok", "v")
            .build()
            .unwrap_err();
        assert!(matches!(err, TestError::InvalidHeader(_)));
    }

    #[test]
    fn test_invalid_uri() {
        let err = TestRequest::get("http://[::1").build().unwrap_err();
        assert!(matches!(err, TestError::RequestBuild(_)));
    }

    #[test]
    fn test_into_request_carries_params() {
        let params: Params = [("id", "7")].into_iter().collect();
        let request = TestRequest::put("/orders/7")
            .build()
            .unwrap()
            .into_request(params);
        assert_eq!(request.param("id"), Some("7"));
        assert_eq!(request.method(), Method::PUT);
    }
}
