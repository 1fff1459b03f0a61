//! # Trellis Middleware
//!
//! The permission side of a route. Declarations attach middleware
//! identifiers (`"auth"`, `"admin"`, ...) to routes and groups; at request
//! time the compiled permission handler asks a [`MiddlewareGate`] whether the
//! request passes the whole ordered list.
//!
//! - [`MiddlewareGate`] - The boolean gate the route builder consults
//! - [`MiddlewareRegistry`] - A gate mapping identifiers to [`Middleware`] predicates
//! - [`AllowAll`] - A gate that never denies
//! - [`FnMiddleware`], [`RequireHeader`] - Ready-made predicates

#![doc(html_root_url = "https://docs.rs/trellis-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod gate;
mod middleware;

pub use gate::{AllowAll, MiddlewareGate, MiddlewareRegistry};
pub use middleware::{FnMiddleware, Middleware, RequireHeader};
