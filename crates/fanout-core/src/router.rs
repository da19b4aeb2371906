//! Router implementation using radix tree (matchit)
//!
//! Paths are registered with a [`MethodRouter`] holding one handler per
//! HTTP method. A path that is known but requested with the wrong method
//! yields [`RouteMatch::MethodNotAllowed`] so the server can answer `405`
//! with an `Allow` header.
//!
//! ```rust,ignore
//! use fanout_core::{get, post, Router};
//!
//! let router = Router::new()
//!     .route("/ws", get(accept))
//!     .route("/notify", post(submit));
//! ```

use crate::request::Request;
use crate::response::{IntoResponse, Response};
use http::Method;
use matchit::Router as MatchitRouter;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type-erased async handler
pub type BoxedHandler =
    Arc<dyn Fn(Request) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync>;

fn into_boxed_handler<F, Fut, R>(handler: F) -> BoxedHandler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    Arc::new(move |req: Request| {
        let fut = handler(req);
        Box::pin(async move { fut.await.into_response() })
            as Pin<Box<dyn Future<Output = Response> + Send>>
    })
}

/// HTTP method router for a single path
#[derive(Clone, Default)]
pub struct MethodRouter {
    handlers: HashMap<Method, BoxedHandler>,
}

impl MethodRouter {
    /// Create a new empty method router
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler for `method`, replacing any earlier one
    pub fn on<F, Fut, R>(mut self, method: Method, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        self.handlers.insert(method, into_boxed_handler(handler));
        self
    }

    /// Add a GET handler
    pub fn get<F, Fut, R>(self, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        self.on(Method::GET, handler)
    }

    /// Add a POST handler
    pub fn post<F, Fut, R>(self, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        self.on(Method::POST, handler)
    }

    fn get_handler(&self, method: &Method) -> Option<&BoxedHandler> {
        self.handlers.get(method)
    }

    /// Methods with a handler, sorted by name
    fn allowed_methods(&self) -> Vec<Method> {
        let mut allowed: Vec<Method> = self.handlers.keys().cloned().collect();
        allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        allowed
    }
}

/// Create a GET route handler
pub fn get<F, Fut, R>(handler: F) -> MethodRouter
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    MethodRouter::new().get(handler)
}

/// Create a POST route handler
pub fn post<F, Fut, R>(handler: F) -> MethodRouter
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    MethodRouter::new().post(handler)
}

/// Result of matching a request against the route table
pub enum RouteMatch<'a> {
    /// A handler exists for this method and path
    Found(&'a BoxedHandler),
    /// No route for this path
    NotFound,
    /// The path exists but not for this method
    MethodNotAllowed {
        /// Methods registered for the path
        allowed: Vec<Method>,
    },
}

/// Main router
pub struct Router {
    inner: MatchitRouter<MethodRouter>,
    paths: Vec<String>,
}

impl Router {
    /// Create a new router
    pub fn new() -> Self {
        Self {
            inner: MatchitRouter::new(),
            paths: Vec::new(),
        }
    }

    /// Add a route
    ///
    /// # Panics
    ///
    /// Panics if `path` is already registered or conflicts with a
    /// registered route. Routes are fixed at startup, so this is a
    /// programming error.
    pub fn route(mut self, path: &str, method_router: MethodRouter) -> Self {
        if let Err(err) = self.inner.insert(path, method_router) {
            panic!("route conflict on '{}': {}", path, err);
        }
        self.paths.push(path.to_string());
        self
    }

    /// Match a request path and method
    pub fn match_route(&self, path: &str, method: &Method) -> RouteMatch<'_> {
        match self.inner.at(path) {
            Ok(matched) => match matched.value.get_handler(method) {
                Some(handler) => RouteMatch::Found(handler),
                None => RouteMatch::MethodNotAllowed {
                    allowed: matched.value.allowed_methods(),
                },
            },
            Err(_) => RouteMatch::NotFound,
        }
    }

    /// Registered paths, sorted
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.paths.iter().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router {
        Router::new()
            .route("/ws", get(|_req| async { "ws" }))
            .route("/notify", post(|_req| async { "notify" }))
    }

    #[test]
    fn test_match_found() {
        let router = router();
        assert!(matches!(
            router.match_route("/notify", &Method::POST),
            RouteMatch::Found(_)
        ));
    }

    #[test]
    fn test_match_not_found() {
        let router = router();
        assert!(matches!(
            router.match_route("/missing", &Method::GET),
            RouteMatch::NotFound
        ));
        assert!(matches!(
            router.match_route("/notify/extra", &Method::POST),
            RouteMatch::NotFound
        ));
    }

    #[test]
    fn test_match_wrong_method_lists_allowed() {
        let router = router();
        match router.match_route("/notify", &Method::GET) {
            RouteMatch::MethodNotAllowed { allowed } => assert_eq!(allowed, vec![Method::POST]),
            _ => panic!("expected MethodNotAllowed"),
        }
    }

    #[test]
    fn test_chained_methods_share_a_path() {
        let router = Router::new().route(
            "/items",
            get(|_req| async { "list" }).post(|_req| async { "create" }),
        );

        assert!(matches!(
            router.match_route("/items", &Method::GET),
            RouteMatch::Found(_)
        ));
        match router.match_route("/items", &Method::DELETE) {
            RouteMatch::MethodNotAllowed { allowed } => {
                assert_eq!(allowed, vec![Method::GET, Method::POST])
            }
            _ => panic!("expected MethodNotAllowed"),
        }
    }

    #[test]
    #[should_panic(expected = "route conflict")]
    fn test_duplicate_path_panics() {
        let _ = Router::new()
            .route("/ws", get(|_req| async { "a" }))
            .route("/ws", get(|_req| async { "b" }));
    }

    #[tokio::test]
    async fn test_found_handler_produces_response() {
        let router = router();
        let RouteMatch::Found(handler) = router.match_route("/ws", &Method::GET) else {
            panic!("expected Found");
        };

        let req = Request::from_http(
            http::Request::builder()
                .uri("/ws")
                .body(http_body_util::Empty::<bytes::Bytes>::new())
                .unwrap(),
        );
        assert_eq!(handler(req).await.status(), http::StatusCode::OK);
    }

    #[test]
    fn test_paths_sorted() {
        assert_eq!(router().paths(), vec!["/notify", "/ws"]);
    }
}
