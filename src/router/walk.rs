//! Depth-first traversal of a router tree.

use super::core::Router;
use super::route::Route;

/// What the walker does after visiting a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    /// Do not descend into this route's subrouter. Siblings are still visited.
    SkipRouter,
}

impl Router {
    /// Visit every route in pre-order.
    ///
    /// The visitor receives the route, the router that owns it and the chain
    /// of ancestor routes (outermost first). Returning `Err` stops the walk
    /// and the error is returned as is.
    ///
    /// ```rust
    /// use routemux::{Router, Walk};
    ///
    /// let mut router = Router::new();
    /// let api = router.path_prefix("/api").subrouter();
    /// api.path("/users");
    /// api.path("/posts");
    ///
    /// let mut paths = Vec::new();
    /// router
    ///     .walk(|route, _, _| {
    ///         paths.extend(route.get_path_template().map(str::to_string));
    ///         Ok::<_, ()>(Walk::Continue)
    ///     })
    ///     .unwrap();
    /// assert_eq!(paths, ["/api", "/api/users", "/api/posts"]);
    /// ```
    pub fn walk<E, F>(&self, mut visit: F) -> Result<(), E>
    where
        F: FnMut(&Route, &Router, &[&Route]) -> Result<Walk, E>,
    {
        let mut ancestors = Vec::new();
        self.walk_inner(&mut visit, &mut ancestors)
    }

    fn walk_inner<'a, E, F>(&'a self, visit: &mut F, ancestors: &mut Vec<&'a Route>) -> Result<(), E>
    where
        F: FnMut(&Route, &Router, &[&Route]) -> Result<Walk, E>,
    {
        for route in self.routes() {
            if visit(route, self, ancestors)? == Walk::SkipRouter {
                continue;
            }
            if let Some(sub) = route.get_subrouter() {
                ancestors.push(route);
                let result = sub.walk_inner(visit, ancestors);
                ancestors.pop();
                result?;
            }
        }
        Ok(())
    }
}
