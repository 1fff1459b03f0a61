//! Route callbacks and their resolution.
//!
//! A route callback is one of three things:
//!
//! - a free function or closure whose parameters are injected from the
//!   request scope ([`Callback::direct`]),
//! - a `(controller, action)` pair, where the controller is resolved from
//!   the container ([`Callback::controller`]),
//! - something that names no callable at all ([`Callback::invalid`]).
//!
//! The third case is not an error. It answers every request with status 404
//! and the `unknown_callback` payload.

use std::fmt;
use std::sync::Arc;

use http::{HeaderMap, StatusCode};
use serde_json::{json, Value};
use tracing::debug;
use trellis_core::{
    Actions, Container, Controller, HandlerError, Injectable, IntoPayload, ResponseEmitter, Scope,
};
use trellis_telemetry::metrics::record_unknown_callback;

/// A callback with its injection already erased.
pub type ErasedCallback = Arc<dyn Fn(&Scope<'_>) -> Result<Value, HandlerError> + Send + Sync>;

/// Code of the unknown-callback payload.
pub const UNKNOWN_CALLBACK_CODE: &str = "unknown_callback";

/// Message of the unknown-callback payload.
pub const UNKNOWN_CALLBACK_MESSAGE: &str = "Please use valid callback";

/// Returns `{"code": "unknown_callback", "message": "Please use valid callback"}`.
#[must_use]
pub fn unknown_callback_payload() -> Value {
    json!({
        "code": UNKNOWN_CALLBACK_CODE,
        "message": UNKNOWN_CALLBACK_MESSAGE,
    })
}

/// A route callback descriptor.
#[derive(Clone)]
pub enum Callback {
    /// A function invoked with injected arguments.
    Direct(ErasedCallback),
    /// A controller action.
    Controller(ControllerTarget),
    /// Names no callable. The string describes what was given.
    Invalid(String),
}

impl Callback {
    /// Wraps a function whose arguments are resolved from the request scope.
    ///
    /// # Example
    ///
    /// ```
    /// use trellis_router::Callback;
    /// use trellis_core::{Inject, Request};
    ///
    /// let health = Callback::direct(|| "ok");
    /// let echo = Callback::direct(|req: Inject<Request>| req.path().to_string());
    /// # let _ = (health, echo);
    /// ```
    pub fn direct<F, Args>(callback: F) -> Self
    where
        F: Injectable<Args>,
        F::Output: IntoPayload,
    {
        Self::Direct(Arc::new(
            move |scope: &Scope<'_>| -> Result<Value, HandlerError> {
                scope.call::<F, Args>(&callback)?.into_payload()
            },
        ))
    }

    /// Refers to `action` on controller `C`.
    #[must_use]
    pub fn controller<C: Controller>(action: &str) -> Self {
        Self::Controller(ControllerTarget::new(&Actions::<C>::collect(), action))
    }

    /// A descriptor that names no callable.
    pub fn invalid(description: impl Into<String>) -> Self {
        Self::Invalid(description.into())
    }

    fn describe(&self) -> String {
        match self {
            Self::Direct(_) => "direct".to_string(),
            Self::Controller(target) => format!("{}::{}", target.controller, target.action),
            Self::Invalid(description) => format!("invalid({description})"),
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Callback").field(&self.describe()).finish()
    }
}

/// The controller half of a callback.
#[derive(Clone)]
pub struct ControllerTarget {
    controller: &'static str,
    action: String,
    provided: fn(&Container) -> bool,
    invoke: Option<ErasedCallback>,
}

impl ControllerTarget {
    /// Looks `action` up in an already collected action table.
    #[must_use]
    pub fn new<C: Controller>(actions: &Actions<C>, action: &str) -> Self {
        let invoke = actions.get(action).map(|action_fn| -> ErasedCallback {
            Arc::new(move |scope: &Scope<'_>| -> Result<Value, HandlerError> {
                let instance = scope.get::<C>()?;
                action_fn(instance.as_ref(), scope)
            })
        });

        Self {
            controller: std::any::type_name::<C>(),
            action: action.to_string(),
            provided: |container: &Container| container.contains::<C>(),
            invoke,
        }
    }

    /// The controller's type name.
    #[must_use]
    pub fn controller(&self) -> &'static str {
        self.controller
    }

    /// The action name.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Returns true if the controller exposes the action.
    #[must_use]
    pub fn has_action(&self) -> bool {
        self.invoke.is_some()
    }

    /// Returns true if `container` can provide the controller.
    #[must_use]
    pub fn is_provided_by(&self, container: &Container) -> bool {
        (self.provided)(container)
    }
}

/// A reference to a controller type, for resource maps.
///
/// # Example
///
/// ```
/// use trellis_router::ControllerRef;
/// use trellis_core::{Actions, Controller};
///
/// struct TagController;
///
/// impl TagController {
///     fn index(&self) -> &'static str {
///         "tags"
///     }
/// }
///
/// impl Controller for TagController {
///     fn actions(actions: &mut Actions<Self>) {
///         actions.add("index", Self::index);
///     }
/// }
///
/// let tags = ControllerRef::of::<TagController>();
/// assert!(tags.name().ends_with("TagController"));
/// ```
#[derive(Clone, Copy)]
pub struct ControllerRef {
    name: &'static str,
    callback: fn(&str) -> Callback,
}

impl ControllerRef {
    /// Refers to controller `C`.
    #[must_use]
    pub fn of<C: Controller>() -> Self {
        Self {
            name: std::any::type_name::<C>(),
            callback: Callback::controller::<C>,
        }
    }

    /// The controller's type name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The callback for `action` on this controller.
    #[must_use]
    pub fn action(&self, action: &str) -> Callback {
        (self.callback)(action)
    }
}

impl fmt::Debug for ControllerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ControllerRef").field(&self.name).finish()
    }
}

/// Turns a callback into a payload for one request.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallbackResolver;

impl CallbackResolver {
    /// Invokes `callback` against `scope`.
    ///
    /// Unresolvable callbacks set status 404 on `response` and return the
    /// unknown-callback payload as a successful value.
    ///
    /// # Errors
    ///
    /// Returns the callback's own error, or a 500 `injection_failed` error
    /// when an argument or the controller cannot be resolved.
    pub fn resolve(
        &self,
        callback: &Callback,
        scope: &Scope<'_>,
        response: &dyn ResponseEmitter,
    ) -> Result<Value, HandlerError> {
        match callback {
            Callback::Direct(invoke) => invoke(scope),
            Callback::Controller(target) => match &target.invoke {
                Some(invoke) => invoke(scope),
                None => Ok(unknown_callback(callback, response)),
            },
            Callback::Invalid(_) => Ok(unknown_callback(callback, response)),
        }
    }
}

fn unknown_callback(callback: &Callback, response: &dyn ResponseEmitter) -> Value {
    debug!(callback = %callback.describe(), "Unresolvable callback");
    record_unknown_callback();
    response.set_status_and_headers(HeaderMap::new(), StatusCode::NOT_FOUND);
    unknown_callback_payload()
}
