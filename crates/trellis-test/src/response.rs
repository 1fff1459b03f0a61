//! Test response wrapper.

use std::fmt;

use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use trellis_core::Reply;

use crate::error::TestError;

/// A dispatched response with helper methods for assertions.
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl TestResponse {
    /// Creates a test response from raw parts.
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns true if the status is successful (2xx).
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns a reference to the headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Gets a header value as a string.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Returns the JSON body.
    #[must_use]
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Returns the `code` field of an error envelope, if any.
    #[must_use]
    pub fn error_code(&self) -> Option<&str> {
        self.body.get("code").and_then(Value::as_str)
    }

    /// Deserializes the body.
    ///
    /// # Errors
    ///
    /// Returns `TestError::Json` if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(T::deserialize(&self.body)?)
    }

    /// Asserts that the status code equals the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match.
    #[track_caller]
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status, expected,
            "Expected status {}, got {} with body {}",
            expected, self.status, self.body
        );
        self
    }

    /// Asserts that a header exists with the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the header doesn't exist or doesn't match.
    #[track_caller]
    pub fn assert_header(&self, name: impl AsRef<str>, expected: impl AsRef<str>) -> &Self {
        let name = name.as_ref();
        let expected = expected.as_ref();
        let actual = self
            .header_str(name)
            .unwrap_or_else(|| panic!("Header '{}' not found", name));
        assert_eq!(
            actual, expected,
            "Header '{}': expected '{}', got '{}'",
            name, expected, actual
        );
        self
    }

    /// Asserts that the body equals the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the body doesn't match.
    #[track_caller]
    pub fn assert_json_eq(&self, expected: &Value) -> &Self {
        assert_eq!(&self.body, expected, "JSON body mismatch");
        self
    }

    /// Asserts that a JSON field exists and equals the expected value.
    ///
    /// `path` is dot separated; numeric segments index arrays.
    ///
    /// # Panics
    ///
    /// Panics if the field doesn't exist or doesn't match.
    #[track_caller]
    pub fn assert_json_field(&self, path: impl AsRef<str>, expected: &Value) -> &Self {
        let path = path.as_ref();
        let actual = json_path(&self.body, path)
            .unwrap_or_else(|| panic!("JSON path '{}' not found in: {}", path, self.body));
        assert_eq!(
            actual, expected,
            "JSON field '{}': expected {}, got {}",
            path, expected, actual
        );
        self
    }
}

impl From<Reply> for TestResponse {
    fn from(reply: Reply) -> Self {
        Self::new(reply.status, reply.headers, reply.body)
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .finish()
    }
}

fn json_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        if segment.is_empty() {
            continue;
        }
        current = match segment.parse::<usize>() {
            Ok(index) => current.get(index)?,
            Err(_) => current.get(segment)?,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{header, HeaderValue};
    use serde::Deserialize;
    use serde_json::json;

    fn create_response(status: StatusCode, body: Value) -> TestResponse {
        let mut headers = HeaderMap::new();
        headers.insert(header::LOCATION, HeaderValue::from_static("/orders/7"));
        TestResponse::new(status, headers, body)
    }

    #[test]
    fn test_from_reply() {
        let response = TestResponse::from(Reply::new(StatusCode::CREATED, json!({"id": 7})));
        response.assert_status(StatusCode::CREATED);
        assert!(response.is_success());
        assert!(response.headers().is_empty());
    }

    #[test]
    fn test_header() {
        let response = create_response(StatusCode::OK, json!({}));
        assert_eq!(response.header_str("location"), Some("/orders/7"));
        response.assert_header("Location", "/orders/7");
    }

    #[test]
    fn test_json() {
        #[derive(Deserialize)]
        struct Order {
            id: u32,
        }

        let response = create_response(StatusCode::OK, json!({"id": 7}));
        let order: Order = response.json().unwrap();
        assert_eq!(order.id, 7);
        assert!(response.json::<Vec<u32>>().is_err());
    }

    #[test]
    fn test_error_code() {
        let response = create_response(
            StatusCode::NOT_FOUND,
            json!({"code": "unknown_callback", "message": "Please use valid callback"}),
        );
        assert_eq!(response.error_code(), Some("unknown_callback"));
        assert!(!response.is_success());
    }

    #[test]
    fn test_assert_json_field() {
        let response = create_response(StatusCode::OK, json!({"items": [{"sku": "A-1"}]}));
        response
            .assert_json_field("items.0.sku", &json!("A-1"))
            .assert_json_eq(&json!({"items": [{"sku": "A-1"}]}));
    }

    #[test]
    #[should_panic(expected = "Expected status")]
    fn test_assert_status_mismatch() {
        create_response(StatusCode::OK, json!(null)).assert_status(StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_json_path() {
        let value = json!({"order": {"lines": [1, 2]}});
        assert_eq!(json_path(&value, "order.lines.1"), Some(&json!(2)));
        assert_eq!(json_path(&value, "order.total"), None);
    }
}
