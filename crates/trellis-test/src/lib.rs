//! # Trellis Test
//!
//! Test utilities for Trellis route declarations.
//!
//! [`RecordingServer`] implements [`EndpointRegistry`](trellis_router::EndpointRegistry),
//! so a [`RouteBuilder`](trellis_router::RouteBuilder) can register into it
//! directly. It then matches requests the way the HTTP server would, with no
//! network involved.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use http::StatusCode;
//! use serde_json::json;
//! use trellis_core::{Container, StaticNamespace};
//! use trellis_middleware::AllowAll;
//! use trellis_router::{Callback, RouteBuilder};
//! use trellis_test::RecordingServer;
//!
//! let mut server = RecordingServer::new();
//! let mut builder = RouteBuilder::new(
//!     &mut server,
//!     Arc::new(Container::new()),
//!     StaticNamespace::new("shop").with_version("v2"),
//!     AllowAll,
//! );
//! builder
//!     .post("orders", Callback::direct(|| json!({"created": true})), &[])
//!     .unwrap();
//! drop(builder);
//!
//! server
//!     .post("/shop/v2/orders")
//!     .json(&json!({"sku": "A-1"}))
//!     .send()
//!     .unwrap()
//!     .assert_status(StatusCode::OK)
//!     .assert_json_field("created", &json!(true));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod request;
mod response;
mod server;

pub use error::TestError;
pub use request::{TestRequest, TestRequestBuilder};
pub use response::TestResponse;
pub use server::{RecordedRoute, RecordingServer, ServerRequest, FORBIDDEN_CODE, NO_ROUTE_CODE};
