//! Per-path method dispatch.

use http::Method;
use smallvec::SmallVec;

use crate::error::RouteError;

/// Maps HTTP methods to RPC targets for a single path.
///
/// ```rust
/// use tandem_router::MethodRouter;
/// use http::Method;
///
/// let methods = MethodRouter::new()
///     .get("/pkg.Svc/Get")
///     .delete("/pkg.Svc/Delete");
///
/// assert_eq!(methods.target(&Method::GET), Some("/pkg.Svc/Get"));
/// assert_eq!(methods.target(&Method::POST), None);
/// assert_eq!(methods.allow_header(), "GET, DELETE");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodRouter {
    routes: SmallVec<[(Method, String); 4]>,
}

impl MethodRouter {
    /// Creates an empty method router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `GET`.
    #[must_use]
    pub fn get(self, target: impl Into<String>) -> Self {
        self.method(Method::GET, target)
    }

    /// Binds `POST`.
    #[must_use]
    pub fn post(self, target: impl Into<String>) -> Self {
        self.method(Method::POST, target)
    }

    /// Binds `PUT`.
    #[must_use]
    pub fn put(self, target: impl Into<String>) -> Self {
        self.method(Method::PUT, target)
    }

    /// Binds `PATCH`.
    #[must_use]
    pub fn patch(self, target: impl Into<String>) -> Self {
        self.method(Method::PATCH, target)
    }

    /// Binds `DELETE`.
    #[must_use]
    pub fn delete(self, target: impl Into<String>) -> Self {
        self.method(Method::DELETE, target)
    }

    /// Binds an arbitrary method, replacing any earlier binding for it.
    #[must_use]
    pub fn method(mut self, method: Method, target: impl Into<String>) -> Self {
        let target = target.into();
        if let Some(slot) = self.routes.iter_mut().find(|(m, _)| *m == method) {
            slot.1 = target;
        } else {
            self.routes.push((method, target));
        }
        self
    }

    /// Returns the target bound to `method`.
    #[must_use]
    pub fn target(&self, method: &Method) -> Option<&str> {
        self.routes
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, t)| t.as_str())
    }

    /// Returns true if no method is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Methods bound on this path, in registration order.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<Method> {
        self.routes.iter().map(|(m, _)| m.clone()).collect()
    }

    /// Value for an `Allow` response header.
    #[must_use]
    pub fn allow_header(&self) -> String {
        self.routes
            .iter()
            .map(|(m, _)| m.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Folds `other` into this router. Rebinding a method is an error.
    pub(crate) fn merge(&mut self, other: MethodRouter, pattern: &str) -> Result<(), RouteError> {
        for (method, _) in &other.routes {
            if let Some(existing) = self.target(method) {
                return Err(RouteError::Duplicate {
                    method: method.to_string(),
                    pattern: pattern.to_string(),
                    existing: existing.to_string(),
                });
            }
        }
        self.routes.extend(other.routes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_router() {
        let methods = MethodRouter::new();
        assert!(methods.is_empty());
        assert!(methods.allowed_methods().is_empty());
        assert_eq!(methods.allow_header(), "");
    }

    #[test]
    fn test_builder_binds_methods() {
        let methods = MethodRouter::new()
            .get("get")
            .post("post")
            .put("put")
            .patch("patch")
            .delete("delete");

        assert_eq!(methods.target(&Method::GET), Some("get"));
        assert_eq!(methods.target(&Method::POST), Some("post"));
        assert_eq!(methods.target(&Method::PUT), Some("put"));
        assert_eq!(methods.target(&Method::PATCH), Some("patch"));
        assert_eq!(methods.target(&Method::DELETE), Some("delete"));
        assert_eq!(methods.target(&Method::HEAD), None);
    }

    #[test]
    fn test_method_rebinding_in_builder_replaces() {
        let methods = MethodRouter::new().get("first").get("second");
        assert_eq!(methods.target(&Method::GET), Some("second"));
        assert_eq!(methods.allowed_methods(), vec![Method::GET]);
    }

    #[test]
    fn test_extension_methods() {
        let purge = Method::from_bytes(b"PURGE").unwrap();
        let methods = MethodRouter::new().method(purge.clone(), "purge");
        assert_eq!(methods.target(&purge), Some("purge"));
    }

    #[test]
    fn test_merge_adds_methods() {
        let mut methods = MethodRouter::new().get("get");
        methods
            .merge(MethodRouter::new().post("post"), "/x")
            .unwrap();

        assert_eq!(methods.target(&Method::GET), Some("get"));
        assert_eq!(methods.target(&Method::POST), Some("post"));
        assert_eq!(methods.allow_header(), "GET, POST");
    }

    #[test]
    fn test_merge_rejects_duplicate() {
        let mut methods = MethodRouter::new().get("original");
        let err = methods
            .merge(MethodRouter::new().get("other"), "/x")
            .unwrap_err();

        assert!(matches!(err, RouteError::Duplicate { .. }));
        assert_eq!(methods.target(&Method::GET), Some("original"));
    }
}
