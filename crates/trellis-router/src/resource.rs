//! RESTful resource expansion.
//!
//! A resource declaration stands for up to five routes, always in this order:
//!
//! | Action | Method | Path |
//! |--------|--------|------|
//! | `index` | GET | `base` |
//! | `store` | POST | `base` |
//! | `show` | GET | `base/{id}` |
//! | `update` | PATCH | `base/{id}` |
//! | `delete` | DELETE | `base/{id}` |

use http::Method;
use serde::Deserialize;

/// One of the five resource actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceAction {
    /// List the collection.
    Index,
    /// Create a member.
    Store,
    /// Read one member.
    Show,
    /// Modify one member.
    Update,
    /// Remove one member.
    Delete,
}

impl ResourceAction {
    /// All actions in expansion order.
    pub const ALL: [Self; 5] = [
        Self::Index,
        Self::Store,
        Self::Show,
        Self::Update,
        Self::Delete,
    ];

    /// The action name, which is also the controller action it maps to.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Store => "store",
            Self::Show => "show",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Looks an action up by name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }

    /// The HTTP method the action is served on.
    #[must_use]
    pub fn method(self) -> Method {
        match self {
            Self::Index | Self::Show => Method::GET,
            Self::Store => Method::POST,
            Self::Update => Method::PATCH,
            Self::Delete => Method::DELETE,
        }
    }

    const fn is_member(self) -> bool {
        matches!(self, Self::Show | Self::Update | Self::Delete)
    }
}

/// Restricts which actions a resource declaration produces.
///
/// Names that are not resource actions are ignored.
///
/// Deserializes from `{"type": "only", "items": ["index", "show"]}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "items", rename_all = "snake_case")]
pub enum ResourceFilter {
    /// Keep only the named actions.
    Only(Vec<String>),
    /// Drop the named actions.
    Except(Vec<String>),
}

impl ResourceFilter {
    /// Builds an `Only` filter.
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(names.into_iter().map(Into::into).collect())
    }

    /// Builds an `Except` filter.
    pub fn except<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Except(names.into_iter().map(Into::into).collect())
    }

    /// Returns true if `action` survives the filter.
    #[must_use]
    pub fn admits(&self, action: ResourceAction) -> bool {
        let named = |names: &[String]| names.iter().any(|n| n == action.name());
        match self {
            Self::Only(names) => named(names),
            Self::Except(names) => !named(names),
        }
    }
}

/// One expanded resource route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRoute {
    /// The action, which names the controller method.
    pub action: ResourceAction,
    /// HTTP method.
    pub method: Method,
    /// Path template, relative to the current group.
    pub path: String,
}

/// Expands a resource rooted at `base`.
///
/// # Example
///
/// ```
/// use trellis_router::{expand, ResourceAction, ResourceFilter};
///
/// let routes = expand("posts", Some(&ResourceFilter::only(["show", "index"])));
/// let actions: Vec<_> = routes.iter().map(|r| r.action).collect();
/// assert_eq!(actions, [ResourceAction::Index, ResourceAction::Show]);
/// assert_eq!(routes[1].path, "posts/{id}");
/// ```
#[must_use]
pub fn expand(base: &str, filter: Option<&ResourceFilter>) -> Vec<ResourceRoute> {
    let member = format!("{}/{{id}}", base.trim_end_matches('/'));

    ResourceAction::ALL
        .into_iter()
        .filter(|action| filter.map_or(true, |f| f.admits(*action)))
        .map(|action| ResourceRoute {
            action,
            method: action.method(),
            path: if action.is_member() {
                member.clone()
            } else {
                base.to_string()
            },
        })
        .collect()
}
