//! The route table.

use http::Method;

use crate::error::RouteError;
use crate::method_router::MethodRouter;
use crate::node::Node;
use crate::RouteMatch;

/// Outcome of resolving a request against the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// Both path and method matched.
    Matched(RouteMatch<'a>),
    /// The path matched but the method is not bound on it.
    MethodNotAllowed {
        /// Methods that are bound on the path.
        allowed: Vec<Method>,
    },
    /// No route matches the path.
    NotFound,
}

/// Radix tree route table.
///
/// # Route Priority
///
/// When several patterns could match, the most specific wins:
///
/// 1. **Static segments** (`/v1/tickets/search`)
/// 2. **Parameter segments** (`/v1/tickets/{ticket_id}`)
/// 3. **Wildcard segments** (`/v1/*rest`)
///
/// A more specific branch that fails deeper in the path falls back to the
/// next candidate, and bindings from the abandoned branch are discarded.
#[derive(Debug, Clone, Default)]
pub struct Router {
    root: Node,
    route_count: usize,
}

impl Router {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::root(),
            route_count: 0,
        }
    }

    /// Registers the methods in `methods` on `pattern`.
    ///
    /// Methods already bound on the same pattern are rejected rather than
    /// silently replaced.
    pub fn insert(&mut self, pattern: &str, methods: MethodRouter) -> Result<(), RouteError> {
        let added = methods.allowed_methods().len();
        self.root.insert(pattern, methods)?;
        self.route_count += added;
        Ok(())
    }

    /// Registers a single `method pattern -> target` route.
    ///
    /// ```rust
    /// use tandem_router::Router;
    /// use http::Method;
    ///
    /// let mut router = Router::new();
    /// router.route(Method::POST, "/v1/echo", "/pkg.Diag/Echo").unwrap();
    /// assert_eq!(router.len(), 1);
    /// ```
    pub fn route(
        &mut self,
        method: Method,
        pattern: &str,
        target: impl Into<String>,
    ) -> Result<(), RouteError> {
        self.insert(pattern, MethodRouter::new().method(method, target))
    }

    /// Resolves a request, distinguishing unknown paths from unbound methods.
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        match self.root.match_path(path) {
            None => Resolution::NotFound,
            Some((methods, params)) => match methods.target(method) {
                Some(target) => Resolution::Matched(RouteMatch::new(target, params)),
                None => Resolution::MethodNotAllowed {
                    allowed: methods.allowed_methods(),
                },
            },
        }
    }

    /// Resolves a request, collapsing every miss into `None`.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        match self.resolve(method, path) {
            Resolution::Matched(m) => Some(m),
            _ => None,
        }
    }

    /// Number of `(method, pattern)` routes registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.route_count
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.route_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CREATE: &str = "/matchmaking.v1.FrontendService/CreateTicket";
    const GET: &str = "/matchmaking.v1.FrontendService/GetTicket";
    const DELETE: &str = "/matchmaking.v1.FrontendService/DeleteTicket";

    fn frontend_routes() -> Router {
        let mut router = Router::new();
        router
            .insert("/v1/frontendservice/tickets", MethodRouter::new().post(CREATE))
            .unwrap();
        router
            .insert(
                "/v1/frontendservice/tickets/{ticket_id}",
                MethodRouter::new().get(GET).delete(DELETE),
            )
            .unwrap();
        router
    }

    #[test]
    fn test_router_new() {
        let router = Router::new();
        assert!(router.is_empty());
        assert_eq!(router.len(), 0);
    }

    #[test]
    fn test_counts_method_routes() {
        assert_eq!(frontend_routes().len(), 3);
    }

    #[test]
    fn test_resolve_static() {
        let router = frontend_routes();
        let m = router
            .match_route(&Method::POST, "/v1/frontendservice/tickets")
            .unwrap();
        assert_eq!(m.target, CREATE);
        assert!(m.params.is_empty());
    }

    #[test]
    fn test_resolve_param() {
        let router = frontend_routes();

        let m = router
            .match_route(&Method::GET, "/v1/frontendservice/tickets/t-42")
            .unwrap();
        assert_eq!(m.target, GET);
        assert_eq!(m.params.get("ticket_id"), Some("t-42"));

        let m = router
            .match_route(&Method::DELETE, "/v1/frontendservice/tickets/t-42")
            .unwrap();
        assert_eq!(m.target, DELETE);
    }

    #[test]
    fn test_resolve_method_not_allowed() {
        let router = frontend_routes();
        let resolution = router.resolve(&Method::PUT, "/v1/frontendservice/tickets/t-1");
        assert_eq!(
            resolution,
            Resolution::MethodNotAllowed {
                allowed: vec![Method::GET, Method::DELETE]
            }
        );
    }

    #[test]
    fn test_resolve_not_found() {
        let router = frontend_routes();
        assert_eq!(
            router.resolve(&Method::GET, "/v1/backendservice/matches"),
            Resolution::NotFound
        );
        // A prefix of a registered route is not itself a route.
        assert_eq!(
            router.resolve(&Method::GET, "/v1/frontendservice"),
            Resolution::NotFound
        );
    }

    #[test]
    fn test_trailing_slash_is_normalized() {
        let router = frontend_routes();
        assert!(router
            .match_route(&Method::POST, "/v1/frontendservice/tickets/")
            .is_some());
    }

    #[test]
    fn test_static_beats_param() {
        let mut router = Router::new();
        router.route(Method::GET, "/tickets/count", "count").unwrap();
        router.route(Method::GET, "/tickets/{ticket_id}", "get").unwrap();

        assert_eq!(
            router.match_route(&Method::GET, "/tickets/count").unwrap().target,
            "count"
        );
        assert_eq!(
            router.match_route(&Method::GET, "/tickets/t-1").unwrap().target,
            "get"
        );
    }

    #[test]
    fn test_wildcard() {
        let mut router = Router::new();
        router.route(Method::GET, "/files/*path", "serve").unwrap();

        let m = router
            .match_route(&Method::GET, "/files/images/logo.png")
            .unwrap();
        assert_eq!(m.params.get("path"), Some("images/logo.png"));
    }

    #[test]
    fn test_same_pattern_in_two_inserts_merges() {
        let mut router = Router::new();
        router.route(Method::GET, "/tickets/{ticket_id}", "get").unwrap();
        router
            .route(Method::DELETE, "/tickets/{ticket_id}", "delete")
            .unwrap();

        assert_eq!(router.len(), 2);
        assert_eq!(
            router
                .match_route(&Method::DELETE, "/tickets/t-1")
                .unwrap()
                .target,
            "delete"
        );
    }

    #[test]
    fn test_duplicate_route_is_rejected() {
        let mut router = frontend_routes();
        let err = router
            .route(Method::POST, "/v1/frontendservice/tickets", "other")
            .unwrap_err();
        assert!(matches!(err, RouteError::Duplicate { .. }));
        assert_eq!(router.len(), 3);
    }

    #[test]
    fn test_root_route() {
        let mut router = Router::new();
        router.route(Method::GET, "/", "root").unwrap();
        assert_eq!(router.match_route(&Method::GET, "/").unwrap().target, "root");
    }

    proptest! {
        #[test]
        fn prop_param_binds_any_segment(value in "[A-Za-z0-9_.~-]{1,24}") {
            let router = frontend_routes();
            let path = format!("/v1/frontendservice/tickets/{value}");
            let m = router.match_route(&Method::GET, &path).unwrap();
            prop_assert_eq!(m.params.get("ticket_id"), Some(value.as_str()));
        }

        #[test]
        fn prop_unregistered_prefix_never_matches(segment in "[a-z]{1,12}") {
            prop_assume!(segment != "v1");
            let router = frontend_routes();
            let path = format!("/{segment}/frontendservice/tickets");
            prop_assert_eq!(router.resolve(&Method::POST, &path), Resolution::NotFound);
        }
    }
}
