//! Declaration-time errors.

use thiserror::Error;
use trellis_core::InjectionError;

/// Errors raised while declaring routes.
///
/// All of these are programming errors in the route table and surface
/// before any endpoint reaches the registry.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The path template has unbalanced braces, a bad parameter name, or
    /// compiles to an invalid pattern.
    #[error("malformed route template `{template}`: {reason}")]
    MalformedTemplate {
        /// The offending template.
        template: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The controller does not expose the named action.
    #[error("controller `{controller}` has no action `{action}`")]
    UnknownAction {
        /// Controller type name.
        controller: &'static str,
        /// Requested action.
        action: String,
    },

    /// The container cannot provide the controller.
    #[error(transparent)]
    Injection(#[from] InjectionError),
}

impl RouteError {
    /// Creates a malformed-template error.
    pub fn malformed(template: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedTemplate {
            template: template.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for declaration operations.
pub type RouteResult<T> = Result<T, RouteError>;
