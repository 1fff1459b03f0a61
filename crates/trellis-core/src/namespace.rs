//! Namespace and version provider.

/// Supplies the `/<namespace>[/<version>]` head of every final route path.
pub trait ApiNamespace: Send + Sync {
    /// The API family, e.g. `"shop"`.
    fn namespace(&self) -> &str;

    /// The release line, e.g. `"v2"`. `None` or an empty string means the
    /// version segment is omitted.
    fn version(&self) -> Option<&str>;

    /// Returns `/<namespace>/<version>/` or `/<namespace>/`.
    fn route_base(&self) -> String {
        match self.version().filter(|v| !v.is_empty()) {
            Some(version) => format!("/{}/{}/", self.namespace(), version),
            None => format!("/{}/", self.namespace()),
        }
    }
}

/// A fixed namespace/version pair.
///
/// # Example
///
/// ```rust
/// use trellis_core::{ApiNamespace, StaticNamespace};
///
/// let api = StaticNamespace::new("shop").with_version("v2");
/// assert_eq!(api.route_base(), "/shop/v2/");
///
/// let unversioned = StaticNamespace::new("shop");
/// assert_eq!(unversioned.route_base(), "/shop/");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticNamespace {
    namespace: String,
    version: Option<String>,
}

impl StaticNamespace {
    /// Creates an unversioned namespace.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            version: None,
        }
    }

    /// Sets the version segment.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

impl ApiNamespace for StaticNamespace {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_version_is_omitted() {
        let api = StaticNamespace::new("shop").with_version("");
        assert_eq!(api.route_base(), "/shop/");
    }
}
