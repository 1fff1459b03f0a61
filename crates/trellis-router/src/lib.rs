//! Declarative route registration for Trellis.
//!
//! This crate compiles nested, prefixed, middleware-guarded route
//! declarations into a flat table of regex-pattern endpoints and hands each
//! one to an external [`EndpointRegistry`].
//!
//! # Features
//!
//! - **Path Templates**: `{id}` and `{id?}` tokens compiled to named regex groups
//! - **Groups**: Prefix and middleware scoping with guaranteed restore
//! - **Resources**: RESTful expansion with `only` / `except` filters
//! - **Callbacks**: Injected functions, controller actions, and a 404 fallback
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use trellis_core::{Actions, Container, Controller, Inject, Request, StaticNamespace};
//! use trellis_middleware::AllowAll;
//! use trellis_router::{CompiledRoute, ControllerRef, ResourceFilter, RouteBuilder};
//! use serde_json::{json, Value};
//!
//! struct OrderController;
//!
//! impl OrderController {
//!     fn index(&self) -> Value {
//!         json!([])
//!     }
//!
//!     fn show(&self, request: Inject<Request>) -> Value {
//!         json!({ "id": request.param("id") })
//!     }
//! }
//!
//! impl Controller for OrderController {
//!     fn actions(actions: &mut Actions<Self>) {
//!         actions.add("index", Self::index).add("show", Self::show);
//!     }
//! }
//!
//! let mut container = Container::new();
//! container.register(Arc::new(OrderController));
//!
//! let mut routes: Vec<CompiledRoute> = Vec::new();
//! let mut builder = RouteBuilder::new(
//!     &mut routes,
//!     Arc::new(container),
//!     StaticNamespace::new("shop").with_version("v2"),
//!     AllowAll,
//! );
//!
//! builder
//!     .resource(
//!         "orders",
//!         ControllerRef::of::<OrderController>(),
//!         Some(&ResourceFilter::only(["index", "show"])),
//!         &["auth"],
//!     )
//!     .unwrap();
//! assert_eq!(builder.registered(), 2);
//! drop(builder);
//!
//! assert_eq!(routes[1].path, r"/shop/v2/orders/(?P<id>[-\w]+)");
//! ```

#![doc(html_root_url = "https://docs.rs/trellis-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod builder;
mod callback;
mod error;
mod path;
mod registry;
mod resource;

pub use builder::{GroupContext, RouteBuilder};
pub use callback::{
    unknown_callback_payload, Callback, CallbackResolver, ControllerRef, ControllerTarget,
    ErasedCallback, UNKNOWN_CALLBACK_CODE, UNKNOWN_CALLBACK_MESSAGE,
};
pub use error::{RouteError, RouteResult};
pub use path::{scan_tokens, PathCompiler, PathToken, TemplateMode, SEGMENT_PATTERN};
pub use registry::{
    CompiledRoute, Endpoint, EndpointRegistry, PermissionHandler, RequestHandler,
};
pub use resource::{expand, ResourceAction, ResourceFilter, ResourceRoute};
