//! The declaration surface.
//!
//! A [`RouteBuilder`] turns nested, prefixed, middleware-guarded declarations
//! into a flat series of [`EndpointRegistry::register_endpoint`] calls. Group
//! state lives on an explicit stack owned by the builder; entering a group
//! pushes a copy of the current context extended with the group's prefix and
//! middleware, and leaving it pops back, whether the group body returned
//! `Ok`, returned `Err`, or panicked.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_core::{Container, StaticNamespace};
//! use trellis_middleware::AllowAll;
//! use trellis_router::{Callback, CompiledRoute, RouteBuilder};
//!
//! let mut routes: Vec<CompiledRoute> = Vec::new();
//! let mut builder = RouteBuilder::new(
//!     &mut routes,
//!     Arc::new(Container::new()),
//!     StaticNamespace::new("shop").with_version("v2"),
//!     AllowAll,
//! );
//!
//! builder
//!     .group("/orders", &["auth"], |orders| {
//!         orders.get("", Callback::direct(|| "list"), &[])?;
//!         orders.get("{id}", Callback::direct(|| "one"), &["owner"])
//!     })
//!     .unwrap();
//! drop(builder);
//!
//! assert_eq!(routes[0].path, "/shop/v2/orders");
//! assert_eq!(routes[1].path, r"/shop/v2/orders/(?P<id>[-\w]+)");
//! ```

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use http::Method;
use tracing::{debug, trace, warn};
use trellis_core::{
    ApiNamespace, Container, InjectionError, Reply, Request, ResponseEmitter, ResponseHead,
};
use trellis_middleware::MiddlewareGate;
use trellis_telemetry::metrics::{record_permission_check, record_route_registered};

use crate::callback::{Callback, CallbackResolver, ControllerRef};
use crate::error::{RouteError, RouteResult};
use crate::path::{PathCompiler, TemplateMode};
use crate::registry::{Endpoint, EndpointRegistry, PermissionHandler, RequestHandler};
use crate::resource::{expand, ResourceFilter};

/// The prefix and middleware in effect at some point of a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupContext {
    prefix: String,
    middleware: Vec<String>,
}

impl GroupContext {
    /// The accumulated prefix, e.g. `/admin/users`.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The accumulated middleware, outermost first.
    #[must_use]
    pub fn middleware(&self) -> &[String] {
        &self.middleware
    }

    fn nest(&self, prefix: &str, middleware: &[&str]) -> Self {
        let segment = prefix.trim_matches('/');
        let prefix = if segment.is_empty() {
            self.prefix.clone()
        } else {
            collapse_slashes(&format!("{}/{}", self.prefix, segment))
        };

        Self {
            prefix,
            middleware: self
                .middleware
                .iter()
                .cloned()
                .chain(middleware.iter().map(|m| (*m).to_string()))
                .collect(),
        }
    }
}

/// Declares routes against an [`EndpointRegistry`].
pub struct RouteBuilder<'r> {
    registry: &'r mut dyn EndpointRegistry,
    container: Arc<Container>,
    namespace: Arc<dyn ApiNamespace>,
    gate: Arc<dyn MiddlewareGate>,
    compiler: PathCompiler,
    resolver: CallbackResolver,
    root: GroupContext,
    stack: Vec<GroupContext>,
    registered: usize,
}

impl<'r> RouteBuilder<'r> {
    /// Creates a builder at the root context.
    pub fn new<N, G>(
        registry: &'r mut dyn EndpointRegistry,
        container: Arc<Container>,
        namespace: N,
        gate: G,
    ) -> Self
    where
        N: ApiNamespace + 'static,
        G: MiddlewareGate + 'static,
    {
        Self {
            registry,
            container,
            namespace: Arc::new(namespace),
            gate: Arc::new(gate),
            compiler: PathCompiler::default(),
            resolver: CallbackResolver,
            root: GroupContext::default(),
            stack: Vec::new(),
            registered: 0,
        }
    }

    /// Selects how path templates are compiled.
    #[must_use]
    pub fn with_template_mode(mut self, mode: TemplateMode) -> Self {
        self.compiler = PathCompiler::new(mode);
        self
    }

    /// The context new declarations will capture.
    #[must_use]
    pub fn current(&self) -> &GroupContext {
        self.stack.last().unwrap_or(&self.root)
    }

    /// Number of endpoints registered so far.
    #[must_use]
    pub fn registered(&self) -> usize {
        self.registered
    }

    /// Runs `body` with `prefix` and `middleware` added to the context.
    ///
    /// The previous context is restored when `body` finishes, including when
    /// it fails or unwinds.
    ///
    /// # Errors
    ///
    /// Returns whatever `body` returns.
    pub fn group<F>(&mut self, prefix: &str, middleware: &[&str], body: F) -> RouteResult<()>
    where
        F: FnOnce(&mut Self) -> RouteResult<()>,
    {
        let nested = self.current().nest(prefix, middleware);
        trace!(group.prefix = nested.prefix(), "Entering route group");

        let depth = self.stack.len();
        self.stack.push(nested);
        let mut guard = GroupGuard {
            builder: self,
            depth,
        };
        body(&mut *guard)
    }

    /// Declares a GET route.
    ///
    /// # Errors
    ///
    /// See [`route`](Self::route).
    pub fn get(&mut self, template: &str, callback: Callback, middleware: &[&str]) -> RouteResult<()> {
        self.route(Method::GET, template, callback, middleware)
    }

    /// Declares a POST route.
    ///
    /// # Errors
    ///
    /// See [`route`](Self::route).
    pub fn post(&mut self, template: &str, callback: Callback, middleware: &[&str]) -> RouteResult<()> {
        self.route(Method::POST, template, callback, middleware)
    }

    /// Declares a PUT route.
    ///
    /// # Errors
    ///
    /// See [`route`](Self::route).
    pub fn put(&mut self, template: &str, callback: Callback, middleware: &[&str]) -> RouteResult<()> {
        self.route(Method::PUT, template, callback, middleware)
    }

    /// Declares a PATCH route.
    ///
    /// # Errors
    ///
    /// See [`route`](Self::route).
    pub fn patch(&mut self, template: &str, callback: Callback, middleware: &[&str]) -> RouteResult<()> {
        self.route(Method::PATCH, template, callback, middleware)
    }

    /// Declares a DELETE route.
    ///
    /// # Errors
    ///
    /// See [`route`](Self::route).
    pub fn delete(&mut self, template: &str, callback: Callback, middleware: &[&str]) -> RouteResult<()> {
        self.route(Method::DELETE, template, callback, middleware)
    }

    /// Declares a route and registers it immediately.
    ///
    /// The route's middleware is the group middleware followed by
    /// `middleware`; duplicates are kept.
    ///
    /// # Errors
    ///
    /// - `RouteError::MalformedTemplate` if the template does not compile.
    /// - `RouteError::Injection` if `callback` names a controller the
    ///   container cannot provide.
    /// - `RouteError::UnknownAction` if the controller has no such action.
    pub fn route(
        &mut self,
        method: Method,
        template: &str,
        callback: Callback,
        middleware: &[&str],
    ) -> RouteResult<()> {
        self.check_callback(&callback)?;

        let context = self.current();
        let middleware: Vec<String> = context
            .middleware()
            .iter()
            .cloned()
            .chain(middleware.iter().map(|m| (*m).to_string()))
            .collect();
        let relative = join_path(context.prefix(), template);
        let path = format!(
            "{}{}",
            self.namespace.route_base(),
            self.compiler.compile(&relative)?
        );

        debug!(
            http.method = %method,
            route.namespace = self.namespace.namespace(),
            route.path = %path,
            middleware = middleware.len(),
            "Registered endpoint"
        );
        record_route_registered(method.as_str());

        let endpoint = Endpoint {
            method,
            handler: self.request_handler(callback),
            permission: self.permission_handler(middleware),
        };
        self.registry
            .register_endpoint(self.namespace.namespace(), &path, endpoint);
        self.registered += 1;
        Ok(())
    }

    /// Declares the RESTful routes of one controller under `path`.
    ///
    /// # Errors
    ///
    /// See [`route`](Self::route). Expansion stops at the first failure.
    pub fn resource(
        &mut self,
        path: &str,
        controller: ControllerRef,
        filter: Option<&ResourceFilter>,
        middleware: &[&str],
    ) -> RouteResult<()> {
        for entry in expand(path, filter) {
            let callback = controller.action(entry.action.name());
            self.route(entry.method, &entry.path, callback, middleware)?;
        }
        Ok(())
    }

    /// Declares several resources, in iteration order, without filters.
    ///
    /// # Errors
    ///
    /// See [`route`](Self::route). Stops at the first failure.
    pub fn resources<I, S>(&mut self, resources: I, middleware: &[&str]) -> RouteResult<()>
    where
        I: IntoIterator<Item = (S, ControllerRef)>,
        S: AsRef<str>,
    {
        for (path, controller) in resources {
            self.resource(path.as_ref(), controller, None, middleware)?;
        }
        Ok(())
    }

    fn check_callback(&self, callback: &Callback) -> RouteResult<()> {
        match callback {
            Callback::Controller(target) => {
                if !target.is_provided_by(&self.container) {
                    return Err(RouteError::Injection(InjectionError {
                        type_name: target.controller(),
                        reason: "controller is not registered in the container".to_string(),
                    }));
                }
                if !target.has_action() {
                    return Err(RouteError::UnknownAction {
                        controller: target.controller(),
                        action: target.action().to_string(),
                    });
                }
            }
            Callback::Invalid(description) => {
                warn!(callback = %description, "Route declared with an invalid callback; it will answer 404");
            }
            Callback::Direct(_) => {}
        }
        Ok(())
    }

    fn request_handler(&self, callback: Callback) -> RequestHandler {
        let container = Arc::clone(&self.container);
        let resolver = self.resolver;

        Arc::new(move |request: Request| {
            let head = Arc::new(ResponseHead::new());
            let mut scope = container.scope();
            scope.set(Arc::new(request));
            scope.set(Arc::clone(&head));

            let emitter: &dyn ResponseEmitter = head.as_ref();
            match resolver.resolve(&callback, &scope, emitter) {
                Ok(body) => head.to_reply(body),
                Err(err) => Reply::from_error(&err, head.headers()),
            }
        })
    }

    fn permission_handler(&self, middleware: Vec<String>) -> PermissionHandler {
        let gate = Arc::clone(&self.gate);
        let middleware: Arc<[String]> = middleware.into();

        Arc::new(move |request: &Request| {
            let allowed = gate.is_allowed(&middleware, request);
            record_permission_check(allowed);
            allowed
        })
    }
}

/// Pops the group context on drop.
struct GroupGuard<'b, 'r> {
    builder: &'b mut RouteBuilder<'r>,
    depth: usize,
}

impl<'r> Deref for GroupGuard<'_, 'r> {
    type Target = RouteBuilder<'r>;

    fn deref(&self) -> &Self::Target {
        self.builder
    }
}

impl DerefMut for GroupGuard<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.builder
    }
}

impl Drop for GroupGuard<'_, '_> {
    fn drop(&mut self) {
        self.builder.stack.truncate(self.depth);
        trace!(group.prefix = self.builder.current().prefix(), "Left route group");
    }
}

/// Joins a group prefix and a template with exactly one slash and strips the
/// leading slash.
fn join_path(prefix: &str, template: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let template = template.trim_start_matches('/');

    let joined = match (prefix.is_empty(), template.is_empty()) {
        (true, _) => template.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}/{template}"),
    };

    collapse_slashes(joined.trim_start_matches('/'))
}

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_slash = false;
    for ch in path.chars() {
        let slash = ch == '/';
        if !(slash && previous_slash) {
            out.push(ch);
        }
        previous_slash = slash;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CompiledRoute;
    use bytes::Bytes;
    use http::{HeaderMap, StatusCode, Uri};
    use serde_json::{json, Value};
    use trellis_core::{Actions, Controller, Inject, StaticNamespace};
    use trellis_middleware::{AllowAll, MiddlewareRegistry, RequireHeader};

    struct PostController;

    impl PostController {
        fn index(&self) -> Value {
            json!(["a", "b"])
        }

        fn show(&self, request: Inject<Request>) -> Value {
            json!({ "id": request.param("id") })
        }
    }

    impl Controller for PostController {
        fn actions(actions: &mut Actions<Self>) {
            actions.add("index", Self::index).add("show", Self::show);
        }
    }

    fn request(method: Method) -> Request {
        Request::new(
            method,
            Uri::from_static("/shop/v2/anything"),
            HeaderMap::new(),
            Bytes::new(),
        )
    }

    fn paths(routes: &[CompiledRoute]) -> Vec<&str> {
        routes.iter().map(|r| r.path.as_str()).collect()
    }

    fn declare<F>(container: Container, body: F) -> RouteResult<Vec<CompiledRoute>>
    where
        F: FnOnce(&mut RouteBuilder<'_>) -> RouteResult<()>,
    {
        let mut routes = Vec::new();
        let mut builder = RouteBuilder::new(
            &mut routes,
            Arc::new(container),
            StaticNamespace::new("shop").with_version("v2"),
            AllowAll,
        );
        body(&mut builder)?;
        drop(builder);
        Ok(routes)
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "orders"), "orders");
        assert_eq!(join_path("/orders", "{id}"), "orders/{id}");
        assert_eq!(join_path("/orders/", "/{id}"), "orders/{id}");
        assert_eq!(join_path("/orders", ""), "orders");
        assert_eq!(join_path("/a/", "//b"), "a/b");
        assert_eq!(join_path("", ""), "");
    }

    #[test]
    fn test_group_prefix_and_namespace() {
        let routes = declare(Container::new(), |b| {
            b.group("/orders", &[], |g| g.get("{id}", Callback::direct(|| "x"), &[]))
        })
        .unwrap();

        assert_eq!(paths(&routes), [r"/shop/v2/orders/(?P<id>[-\w]+)"]);
        assert_eq!(routes[0].namespace, "shop");
        assert_eq!(routes[0].endpoint.method, Method::GET);
    }

    #[test]
    fn test_unversioned_namespace() {
        let mut routes = Vec::new();
        let mut builder = RouteBuilder::new(
            &mut routes,
            Arc::new(Container::new()),
            StaticNamespace::new("shop"),
            AllowAll,
        );
        builder.post("orders", Callback::direct(|| "x"), &[]).unwrap();
        drop(builder);

        assert_eq!(paths(&routes), ["/shop/orders"]);
        assert_eq!(routes[0].endpoint.method, Method::POST);
    }

    #[test]
    fn test_nested_groups_and_sibling_isolation() {
        let mut seen = Vec::new();
        declare(Container::new(), |b| {
            b.group("admin", &["auth"], |admin| {
                admin.group("/users/", &["admin"], |users| {
                    seen.push(users.current().clone());
                    Ok(())
                })?;
                seen.push(admin.current().clone());
                admin.group("posts", &[], |posts| {
                    seen.push(posts.current().clone());
                    Ok(())
                })
            })?;
            seen.push(b.current().clone());
            Ok(())
        })
        .unwrap();

        assert_eq!(seen[0].prefix(), "/admin/users");
        assert_eq!(seen[0].middleware(), ["auth", "admin"]);
        assert_eq!(seen[1].prefix(), "/admin");
        assert_eq!(seen[1].middleware(), ["auth"]);
        assert_eq!(seen[2].prefix(), "/admin/posts");
        assert_eq!(seen[2].middleware(), ["auth"]);
        assert_eq!(seen[3], GroupContext::default());
    }

    #[test]
    fn test_empty_group_prefix_adds_no_segment() {
        let routes = declare(Container::new(), |b| {
            b.group("", &["auth"], |outer| {
                assert_eq!(outer.current().prefix(), "");
                outer.group("/", &[], |slash| {
                    slash.group("x//y", &[], |inner| {
                        assert_eq!(inner.current().prefix(), "/x/y");
                        assert_eq!(inner.current().middleware(), ["auth"]);
                        inner.get("z", Callback::direct(|| "z"), &[])
                    })
                })
            })
        })
        .unwrap();

        assert_eq!(paths(&routes), ["/shop/v2/x/y/z"]);
    }

    #[test]
    fn test_group_restores_context_on_error() {
        let mut routes = Vec::new();
        let mut builder = RouteBuilder::new(
            &mut routes,
            Arc::new(Container::new()),
            StaticNamespace::new("shop"),
            AllowAll,
        );

        let result = builder.group("/broken", &["auth"], |g| {
            g.get("{id", Callback::direct(|| "x"), &[])
        });
        assert!(matches!(result, Err(RouteError::MalformedTemplate { .. })));
        assert_eq!(builder.current(), &GroupContext::default());

        builder.get("health", Callback::direct(|| "ok"), &[]).unwrap();
        assert_eq!(builder.registered(), 1);
        drop(builder);
        assert_eq!(paths(&routes), ["/shop/health"]);
    }

    #[test]
    fn test_group_restores_context_on_panic() {
        let mut routes = Vec::new();
        let mut builder = RouteBuilder::new(
            &mut routes,
            Arc::new(Container::new()),
            StaticNamespace::new("shop"),
            AllowAll,
        );

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            builder.group("/boom", &["auth"], |_| panic!("declaration failed"))
        }));
        assert!(outcome.is_err());
        assert_eq!(builder.current(), &GroupContext::default());
    }

    #[test]
    fn test_middleware_accumulates_with_duplicates() {
        let mut gate = MiddlewareRegistry::new();
        gate.register("auth", RequireHeader::present(http::header::AUTHORIZATION));

        let mut routes = Vec::new();
        let mut builder = RouteBuilder::new(
            &mut routes,
            Arc::new(Container::new()),
            StaticNamespace::new("shop"),
            gate,
        );
        builder
            .group("", &["auth"], |g| {
                g.get("open", Callback::direct(|| "x"), &["auth"])?;
                g.get("typo", Callback::direct(|| "x"), &["atuh"])
            })
            .unwrap();
        drop(builder);

        let anonymous = request(Method::GET);
        assert!(!routes[0].endpoint.is_permitted(&anonymous));

        let mut headers = HeaderMap::new();
        headers.insert(http::header::AUTHORIZATION, "Bearer t".parse().unwrap());
        let signed = Request::new(Method::GET, Uri::from_static("/"), headers, Bytes::new());
        assert!(routes[0].endpoint.is_permitted(&signed));
        assert!(!routes[1].endpoint.is_permitted(&signed));
    }

    #[test]
    fn test_request_handler_binds_request() {
        let mut container = Container::new();
        container.register(Arc::new(PostController));

        let routes = declare(container, |b| {
            b.get("posts/{id}", Callback::controller::<PostController>("show"), &[])
        })
        .unwrap();

        let params = [("id", "42")].into_iter().collect();
        let reply = routes[0].endpoint.handle(request(Method::GET).with_params(params));
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body, json!({"id": "42"}));
    }

    #[test]
    fn test_handler_can_set_status() {
        let routes = declare(Container::new(), |b| {
            b.post(
                "orders",
                Callback::direct(|head: Inject<ResponseHead>| {
                    head.set_status_and_headers(HeaderMap::new(), StatusCode::CREATED);
                    json!({"id": 1})
                }),
                &[],
            )
        })
        .unwrap();

        let reply = routes[0].endpoint.handle(request(Method::POST));
        assert_eq!(reply.status, StatusCode::CREATED);
    }

    #[test]
    fn test_invalid_callback_answers_404_payload() {
        let routes = declare(Container::new(), |b| {
            b.get("broken", Callback::invalid("42"), &[])
        })
        .unwrap();

        let reply = routes[0].endpoint.handle(request(Method::GET));
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert_eq!(
            reply.body,
            json!({"code": "unknown_callback", "message": "Please use valid callback"})
        );
    }

    #[test]
    fn test_handler_error_renders_envelope() {
        let routes = declare(Container::new(), |b| {
            b.get(
                "fail",
                Callback::direct(|| -> Result<Value, trellis_core::HandlerError> {
                    Err(trellis_core::HandlerError::bad_request("nope"))
                }),
                &[],
            )
        })
        .unwrap();

        let reply = routes[0].endpoint.handle(request(Method::GET));
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.body["code"], "bad_request");
    }

    #[test]
    fn test_unregistered_controller_fails_at_declaration() {
        let err = declare(Container::new(), |b| {
            b.get("posts", Callback::controller::<PostController>("index"), &[])
        })
        .unwrap_err();
        assert!(matches!(err, RouteError::Injection(_)));
    }

    #[test]
    fn test_unknown_action_fails_at_declaration() {
        let mut container = Container::new();
        container.register(Arc::new(PostController));

        let err = declare(container, |b| {
            b.get("posts", Callback::controller::<PostController>("archive"), &[])
        })
        .unwrap_err();
        assert!(matches!(err, RouteError::UnknownAction { action, .. } if action == "archive"));
    }

    #[test]
    fn test_resource_only() {
        let mut container = Container::new();
        container.register(Arc::new(PostController));

        let routes = declare(container, |b| {
            b.resource(
                "posts",
                ControllerRef::of::<PostController>(),
                Some(&ResourceFilter::only(["show", "index"])),
                &["auth"],
            )
        })
        .unwrap();

        let summary: Vec<_> = routes
            .iter()
            .map(|r| (r.endpoint.method.clone(), r.path.as_str()))
            .collect();
        assert_eq!(
            summary,
            [
                (Method::GET, "/shop/v2/posts"),
                (Method::GET, r"/shop/v2/posts/(?P<id>[-\w]+)"),
            ]
        );
    }

    #[test]
    fn test_resource_without_filter_needs_every_action() {
        let mut container = Container::new();
        container.register(Arc::new(PostController));

        let err = declare(container, |b| {
            b.resource("posts", ControllerRef::of::<PostController>(), None, &[])
        })
        .unwrap_err();
        assert!(matches!(err, RouteError::UnknownAction { action, .. } if action == "store"));
    }

    #[test]
    fn test_legacy_mode() {
        let mut routes = Vec::new();
        let mut builder = RouteBuilder::new(
            &mut routes,
            Arc::new(Container::new()),
            StaticNamespace::new("shop"),
            AllowAll,
        )
        .with_template_mode(TemplateMode::Legacy);
        builder
            .get("users/{id}/posts/{slug?}", Callback::direct(|| "x"), &[])
            .unwrap();
        drop(builder);

        assert_eq!(
            paths(&routes),
            [r"/shop/users(?:/(?P<id>[-\w]+))?/posts(?:/(?P<slug>[-\w]+))?"]
        );
    }
}
