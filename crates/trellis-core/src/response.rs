//! Response helper and callback payloads.
//!
//! Callbacks return a payload ([`IntoPayload`]). Status and headers travel
//! separately through a [`ResponseEmitter`]; the compiled request handler
//! creates one [`ResponseHead`] per request, exposes it through the request
//! scope, and folds it together with the payload into a [`Reply`].

use http::{HeaderMap, StatusCode};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::HandlerError;

/// The "set status and headers" capability.
pub trait ResponseEmitter: Send + Sync {
    /// Records the outgoing status and merges `headers` into the outgoing set.
    fn set_status_and_headers(&self, headers: HeaderMap, status: StatusCode);
}

#[derive(Debug, Default)]
struct HeadState {
    status: Option<StatusCode>,
    headers: HeaderMap,
}

/// Per-request status and headers.
///
/// # Example
///
/// ```rust
/// use trellis_core::{ResponseEmitter, ResponseHead};
/// use http::{HeaderMap, StatusCode};
/// use serde_json::json;
///
/// let head = ResponseHead::new();
/// head.set_status_and_headers(HeaderMap::new(), StatusCode::CREATED);
///
/// let reply = head.into_reply(json!({"id": 1}));
/// assert_eq!(reply.status, StatusCode::CREATED);
/// ```
#[derive(Debug, Default)]
pub struct ResponseHead {
    state: Mutex<HeadState>,
}

impl ResponseHead {
    /// Creates an empty head; the status defaults to 200 until set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the status recorded so far, if any.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.state.lock().status
    }

    /// Returns a copy of the headers recorded so far.
    #[must_use]
    pub fn headers(&self) -> HeaderMap {
        self.state.lock().headers.clone()
    }

    /// Combines the recorded head with a payload.
    #[must_use]
    pub fn into_reply(self, body: Value) -> Reply {
        let state = self.state.into_inner();
        Reply {
            status: state.status.unwrap_or(StatusCode::OK),
            headers: state.headers,
            body,
        }
    }

    /// Snapshot variant of [`into_reply`](Self::into_reply) for shared heads.
    #[must_use]
    pub fn to_reply(&self, body: Value) -> Reply {
        let state = self.state.lock();
        Reply {
            status: state.status.unwrap_or(StatusCode::OK),
            headers: state.headers.clone(),
            body,
        }
    }
}

impl ResponseEmitter for ResponseHead {
    fn set_status_and_headers(&self, headers: HeaderMap, status: StatusCode) {
        let mut state = self.state.lock();
        state.status = Some(status);
        state.headers.extend(headers);
    }
}

/// The value a compiled request handler hands back to the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// JSON body.
    pub body: Value,
}

impl Reply {
    /// A reply with no extra headers.
    #[must_use]
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    /// Renders a handler error as its status plus error envelope.
    ///
    /// Headers already recorded on the request's head are kept.
    #[must_use]
    pub fn from_error(err: &HandlerError, headers: HeaderMap) -> Self {
        Self {
            status: err.status(),
            headers,
            body: err.to_payload(),
        }
    }
}

/// Serializes the wrapped value as the JSON payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

/// Conversion from a callback's return value into a JSON payload.
pub trait IntoPayload {
    /// Performs the conversion.
    fn into_payload(self) -> Result<Value, HandlerError>;
}

impl IntoPayload for Value {
    fn into_payload(self) -> Result<Value, HandlerError> {
        Ok(self)
    }
}

impl<T: Serialize> IntoPayload for Json<T> {
    fn into_payload(self) -> Result<Value, HandlerError> {
        Ok(serde_json::to_value(self.0)?)
    }
}

impl IntoPayload for () {
    fn into_payload(self) -> Result<Value, HandlerError> {
        Ok(Value::Null)
    }
}

impl IntoPayload for String {
    fn into_payload(self) -> Result<Value, HandlerError> {
        Ok(Value::String(self))
    }
}

impl IntoPayload for &'static str {
    fn into_payload(self) -> Result<Value, HandlerError> {
        Ok(Value::String(self.to_string()))
    }
}

impl<T, E> IntoPayload for Result<T, E>
where
    T: IntoPayload,
    E: Into<HandlerError>,
{
    fn into_payload(self) -> Result<Value, HandlerError> {
        self.map_err(Into::into)?.into_payload()
    }
}
