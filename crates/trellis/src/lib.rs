//! # Trellis
//!
//! **Declarative route registration for JSON APIs**
//!
//! Trellis compiles nested, prefixed, middleware-guarded route declarations
//! into a flat table of regex-pattern endpoints and hands each one to the
//! HTTP server through an [`EndpointRegistry`](router::EndpointRegistry).
//!
//! - **Path templates** – `orders/{id}` and `orders/{id?}` compile to named regex groups
//! - **Groups** – prefix and middleware scoping that always restores on exit
//! - **Resources** – `index`/`store`/`show`/`update`/`delete` expansion with filters
//! - **Dependency injection** – controllers and callback arguments come from a [`Container`](core::Container)
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use trellis::prelude::*;
//!
//! struct OrderController;
//!
//! impl OrderController {
//!     fn index(&self) -> Json<Vec<u32>> {
//!         Json(vec![1, 2])
//!     }
//! }
//!
//! impl Controller for OrderController {
//!     fn actions(actions: &mut Actions<Self>) {
//!         actions.add("index", Self::index);
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new()
//!     .with_string("[api]\nnamespace = \"shop\"\nversion = \"v2\"", "toml")?
//!     .load()?;
//!
//! let mut container = Container::new();
//! container.register(Arc::new(OrderController));
//!
//! let mut routes: Vec<CompiledRoute> = Vec::new();
//! let mut builder = trellis::route_builder(&mut routes, Arc::new(container), &config.api, AllowAll);
//! builder.group("/orders", &["auth"], |orders| {
//!     orders.get("", Callback::controller::<OrderController>("index"), &[])
//! })?;
//! drop(builder);
//!
//! assert_eq!(routes[0].path, "/shop/v2/orders");
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! | Module | Crate | Contents |
//! |--------|-------|----------|
//! | [`core`] | `trellis-core` | DI container, request, response head, handler errors |
//! | [`router`] | `trellis-router` | Path compiler, resource expander, callbacks, route builder |
//! | [`middleware`] | `trellis-middleware` | Middleware gate and registry |
//! | [`telemetry`] | `trellis-telemetry` | Logging and metrics setup |
//! | [`config`] | `trellis-config` | Typed configuration loading |

#![doc(html_root_url = "https://docs.rs/trellis/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::sync::Arc;

pub use trellis_config as config;
pub use trellis_core as core;
pub use trellis_middleware as middleware;
pub use trellis_router as router;
pub use trellis_telemetry as telemetry;

use trellis_config::ApiConfig;
use trellis_core::Container;
use trellis_middleware::MiddlewareGate;
use trellis_router::{EndpointRegistry, RouteBuilder};

/// Creates a route builder whose namespace, version and template mode come
/// from `api`.
pub fn route_builder<'r, G>(
    registry: &'r mut dyn EndpointRegistry,
    container: Arc<Container>,
    api: &ApiConfig,
    gate: G,
) -> RouteBuilder<'r>
where
    G: MiddlewareGate + 'static,
{
    RouteBuilder::new(registry, container, api.clone(), gate).with_template_mode(api.template_mode)
}

/// Prelude module for convenient imports.
///
/// ```rust
/// use trellis::prelude::*;
/// ```
pub mod prelude {
    pub use trellis_core::{
        Actions, ApiNamespace, Container, Controller, HandlerError, HandlerResult, Inject, Json,
        Reply, Request, ResponseEmitter, ResponseHead, Scope, StaticNamespace,
    };

    pub use trellis_router::{
        Callback, CompiledRoute, ControllerRef, EndpointRegistry, ResourceFilter, RouteBuilder,
        RouteError, RouteResult, TemplateMode,
    };

    pub use trellis_middleware::{AllowAll, Middleware, MiddlewareGate, MiddlewareRegistry};

    pub use trellis_config::{ConfigLoader, TrellisConfig};
}
