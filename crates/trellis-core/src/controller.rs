//! Controllers and their action tables.
//!
//! A controller is a type resolved from the container whose methods are
//! addressed by name, the way a `(ControllerType, "show")` pair addresses a
//! route callback. Each action's non-receiver parameters are injected from
//! the request scope, so an action can ask for `Inject<Request>` or any
//! registered service.
//!
//! # Example
//!
//! ```rust
//! use trellis_core::{Actions, Controller, Container, Inject, Json, Request};
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! struct PostController;
//!
//! impl PostController {
//!     fn index(&self) -> Json<Vec<&'static str>> {
//!         Json(vec!["hello", "world"])
//!     }
//!
//!     fn show(&self, request: Inject<Request>) -> Value {
//!         json!({ "id": request.param("id") })
//!     }
//! }
//!
//! impl Controller for PostController {
//!     fn actions(actions: &mut Actions<Self>) {
//!         actions.add("index", Self::index).add("show", Self::show);
//!     }
//! }
//!
//! let table = Actions::<PostController>::collect();
//! assert_eq!(table.names().collect::<Vec<_>>(), ["index", "show"]);
//!
//! let mut container = Container::new();
//! container.register(Arc::new(PostController));
//!
//! let index = table.get("index").unwrap();
//! let controller = container.get::<PostController>().unwrap();
//! let payload = index(controller.as_ref(), &container.scope()).unwrap();
//! assert_eq!(payload, json!(["hello", "world"]));
//! ```

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::di::{FromScope, InjectionError, Scope};
use crate::{HandlerError, IntoPayload};

/// A type-erased controller action.
pub type ActionFn<C> = Arc<dyn Fn(&C, &Scope<'_>) -> Result<Value, HandlerError> + Send + Sync>;

/// A type whose methods can serve as route callbacks.
pub trait Controller: Send + Sync + Sized + 'static {
    /// Registers the actions this controller exposes.
    fn actions(actions: &mut Actions<Self>);
}

/// The named actions of controller `C`, in registration order.
pub struct Actions<C> {
    table: IndexMap<&'static str, ActionFn<C>>,
}

impl<C: Send + Sync + 'static> Actions<C> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: IndexMap::new(),
        }
    }

    /// Adds an action. A later action under the same name replaces the earlier one.
    pub fn add<F, Args>(&mut self, name: &'static str, action: F) -> &mut Self
    where
        F: ControllerAction<C, Args>,
        F::Output: IntoPayload,
    {
        let erased: ActionFn<C> = Arc::new(
            move |controller: &C, scope: &Scope<'_>| -> Result<Value, HandlerError> {
                action.invoke(controller, scope)?.into_payload()
            },
        );
        self.table.insert(name, erased);
        self
    }

    /// Returns the action registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ActionFn<C>> {
        self.table.get(name).cloned()
    }

    /// Returns true if an action is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Iterates over action names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.table.keys().copied()
    }
}

impl<C: Controller> Actions<C> {
    /// Builds the table declared by [`Controller::actions`].
    #[must_use]
    pub fn collect() -> Self {
        let mut actions = Self::new();
        C::actions(&mut actions);
        actions
    }
}

impl<C: Send + Sync + 'static> Default for Actions<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for Actions<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actions")
            .field("controller", &std::any::type_name::<C>())
            .field("names", &self.table.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A method on `C` whose remaining arguments are resolvable from a [`Scope`].
///
/// Implemented for `Fn(&C, ...)` with up to six injected arguments.
pub trait ControllerAction<C, Args>: Send + Sync + 'static {
    /// The action's return type.
    type Output;

    /// Resolves the arguments and invokes the action on `controller`.
    fn invoke(&self, controller: &C, scope: &Scope<'_>) -> Result<Self::Output, InjectionError>;
}

macro_rules! impl_controller_action {
    ($($arg:ident),*) => {
        impl<F, C, R, $($arg,)*> ControllerAction<C, ($($arg,)*)> for F
        where
            F: Fn(&C, $($arg),*) -> R + Send + Sync + 'static,
            $($arg: FromScope,)*
        {
            type Output = R;

            #[allow(non_snake_case, unused_variables)]
            fn invoke(&self, controller: &C, scope: &Scope<'_>) -> Result<R, InjectionError> {
                $(let $arg = $arg::from_scope(scope)?;)*
                Ok((self)(controller, $($arg),*))
            }
        }
    };
}

impl_controller_action!();
impl_controller_action!(A1);
impl_controller_action!(A1, A2);
impl_controller_action!(A1, A2, A3);
impl_controller_action!(A1, A2, A3, A4);
impl_controller_action!(A1, A2, A3, A4, A5);
impl_controller_action!(A1, A2, A3, A4, A5, A6);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Container, Inject};
    use serde_json::json;

    struct Greeter {
        greeting: &'static str,
    }

    struct Name {
        first: &'static str,
    }

    impl Greeter {
        fn hello(&self, name: Inject<Name>) -> String {
            format!("{}, {}", self.greeting, name.first)
        }

        fn fail(&self) -> Result<Value, HandlerError> {
            Err(HandlerError::not_found("nobody home"))
        }
    }

    impl Controller for Greeter {
        fn actions(actions: &mut Actions<Self>) {
            actions.add("hello", Self::hello).add("fail", Self::fail);
        }
    }

    #[test]
    fn test_collect_and_invoke() {
        let mut container = Container::new();
        container.register(Arc::new(Name { first: "Ada" }));

        let greeter = Greeter { greeting: "Hi" };
        let hello = Actions::<Greeter>::collect().get("hello").unwrap();
        let out = hello(&greeter, &container.scope()).unwrap();
        assert_eq!(out, json!("Hi, Ada"));
    }

    #[test]
    fn test_missing_injection_becomes_handler_error() {
        let container = Container::new();
        let greeter = Greeter { greeting: "Hi" };
        let hello = Actions::<Greeter>::collect().get("hello").unwrap();

        let err = hello(&greeter, &container.scope()).unwrap_err();
        assert_eq!(err.code(), "injection_failed");
    }

    #[test]
    fn test_action_error_passes_through() {
        let container = Container::new();
        let greeter = Greeter { greeting: "Hi" };
        let fail = Actions::<Greeter>::collect().get("fail").unwrap();

        let err = fail(&greeter, &container.scope()).unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn test_unknown_action() {
        let table = Actions::<Greeter>::collect();
        assert!(table.get("destroy").is_none());
        assert!(table.contains("hello"));
    }
}
