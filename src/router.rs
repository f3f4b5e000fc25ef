//! [`Router`](crate::Router) dispatches requests to handlers via regular
//! expression routes.
//!
//! Routes are matched against the request method and the whole request
//! path. Capturing groups in the pattern become positional parameters:
//!
//! ```rust,no_run
//! use waypoint::{Request, Responder, Router};
//!
//! async fn index(_: Request, res: Responder) {
//!     res.text("Hello, World!");
//! }
//!
//! async fn post(req: Request, res: Responder) {
//!     let (user, post) = (req.param(0).unwrap_or(""), req.param(1).unwrap_or(""));
//!     res.text(format!("post {} by user {}", post, user));
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let router = Router::default()
//!         .get("/", index)
//!         .get(r"/users/(\d+)/posts/([\w-]+)", post);
//!
//!     hyper::Server::bind(&([127, 0, 0, 1], 3000).into())
//!         .serve(router.into_service())
//!         .await
//!         .unwrap();
//! }
//!```
//!
//! Paths are anchored, so a route only matches the whole path:
//! ```ignore
//!  Path: /users/(\d+)
//!
//!  Requests:
//!   /users/42                 match: ["42"]
//!   /users/abc                no match
//!   /users/42/posts           no match
//! ```
//!
//! A path registered with a trailing slash matches with and without it:
//! ```ignore
//!  Path: /users/
//!
//!  Requests:
//!   /users                    match
//!   /users/                   match
//! ```
//!
//! When several routes match the same method and path, the one registered
//! first wins. Registering the same method and pattern again replaces the
//! handler of the earlier registration and keeps its position.
use crate::config::{BodyOptions, Config};
use crate::error::Result;
use crate::path::{self, Params, Pattern};
use crate::request::Request;
use crate::response::Responder;
use crate::route::Route;

use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::{future, ready, FutureExt};
use hyper::header::{HeaderValue, ALLOW};
use hyper::service::Service;
use hyper::{Body, Method, Response, StatusCode};
use tokio::sync::oneshot;

/// Router dispatches requests to different handlers via configurable routes.
pub struct Router {
    prefix: String,
    entries: Vec<Entry>,
    middlewares: Vec<Arc<dyn Middleware>>,
    not_found: Option<Arc<dyn Handler>>,
    method_not_allowed: Option<Arc<dyn Handler>>,
    handle_method_not_allowed: bool,
    body: Arc<BodyOptions>,
}

/// A registered route together with its compiled pattern.
#[derive(Debug, Clone)]
pub struct Entry {
    route: Route,
    pattern: Pattern,
}

impl Entry {
    pub fn method(&self) -> &Method {
        self.route.method()
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        self.route.handler()
    }

    pub fn route(&self) -> &Route {
        &self.route
    }
}

impl Router {
    /// Creates a router whose routes are all registered under `prefix`.
    /// ```rust
    /// use waypoint::{Request, Responder, Router};
    ///
    /// let router = Router::with_prefix("/api")
    ///     .get("/ping", |_: Request, res: Responder| async { res.text("pong") });
    ///
    /// assert!(router.lookup(&hyper::Method::GET, "/api/ping").is_some());
    /// assert!(router.lookup(&hyper::Method::GET, "/ping").is_none());
    /// ```
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            prefix: path::normalize_prefix(prefix),
            ..Self::default()
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            prefix: path::normalize_prefix(&config.prefix),
            handle_method_not_allowed: config.handle_method_not_allowed,
            body: Arc::new(config.body.clone()),
            ..Self::default()
        }
    }

    /// The normalized prefix, empty for the root.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Insert a handler into the router for a specific path at the specified method.
    ///
    /// # Panics
    ///
    /// Panics if the path is not a valid pattern. Use [`Router::try_handle`]
    /// to get the error instead.
    pub fn handle(self, method: Method, path: &str, handler: impl Handler + 'static) -> Self {
        self.route(crate::route::route(method, path, handler))
    }

    /// Like [`Router::handle`], returning [`Error::InvalidPattern`](crate::Error::InvalidPattern) for an invalid path.
    pub fn try_handle(
        self,
        method: Method,
        path: &str,
        handler: impl Handler + 'static,
    ) -> Result<Self> {
        self.try_route(crate::route::route(method, path, handler))
    }

    /// Register a handler for `GET` requests
    pub fn get(self, path: &str, handler: impl Handler + 'static) -> Self {
        self.handle(Method::GET, path, handler)
    }

    /// Register a handler for `HEAD` requests
    pub fn head(self, path: &str, handler: impl Handler + 'static) -> Self {
        self.handle(Method::HEAD, path, handler)
    }

    /// Register a handler for `OPTIONS` requests
    pub fn options(self, path: &str, handler: impl Handler + 'static) -> Self {
        self.handle(Method::OPTIONS, path, handler)
    }

    /// Register a handler for `POST` requests
    pub fn post(self, path: &str, handler: impl Handler + 'static) -> Self {
        self.handle(Method::POST, path, handler)
    }

    /// Register a handler for `PUT` requests
    pub fn put(self, path: &str, handler: impl Handler + 'static) -> Self {
        self.handle(Method::PUT, path, handler)
    }

    /// Register a handler for `PATCH` requests
    pub fn patch(self, path: &str, handler: impl Handler + 'static) -> Self {
        self.handle(Method::PATCH, path, handler)
    }

    /// Register a handler for `DELETE` requests
    pub fn delete(self, path: &str, handler: impl Handler + 'static) -> Self {
        self.handle(Method::DELETE, path, handler)
    }

    /// Registers a declared [`Route`] under the router prefix.
    ///
    /// # Panics
    ///
    /// Panics if the prefixed path is not a valid pattern.
    pub fn route(mut self, route: Route) -> Self {
        match self.insert(route) {
            Ok(()) => self,
            Err(err) => panic!("{}", err),
        }
    }

    /// Like [`Router::route`], returning [`Error::InvalidPattern`](crate::Error::InvalidPattern) for an invalid path.
    pub fn try_route(mut self, route: Route) -> Result<Self> {
        self.insert(route)?;
        Ok(self)
    }

    /// Registers every route, e.g. the output of [`group`](crate::route::group).
    pub fn routes(self, routes: impl IntoIterator<Item = Route>) -> Self {
        routes.into_iter().fold(self, Router::route)
    }

    /// Copies the routes of `other` into this router under this router's prefix.
    ///
    /// Routes keep the prefix they were registered with in `other`. Changes
    /// made to `other` afterwards do not affect this router. Middlewares and
    /// fallback handlers of `other` are not copied.
    /// ```rust
    /// use waypoint::{Request, Responder, Router};
    ///
    /// async fn users(_: Request, res: Responder) {
    ///     res.text("[]");
    /// }
    ///
    /// let v1 = Router::with_prefix("/v1").get("/users", users);
    /// let api = Router::with_prefix("/api").merge(&v1);
    ///
    /// assert_eq!(api.entries()[0].pattern().as_str(), "^/api/v1/users$");
    /// ```
    pub fn merge(self, other: &Router) -> Self {
        other
            .entries
            .iter()
            .map(|entry| entry.route.clone())
            .fold(self, Router::route)
    }

    /// Registers a middleware that runs for every request before route lookup.
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Configurable handler which is called when no matching route is
    /// found. Without one, unmatched requests get an empty `404 Not Found`.
    pub fn not_found(mut self, handler: impl Handler + 'static) -> Self {
        self.not_found = Some(Arc::new(handler));
        self
    }

    /// If enabled, the router checks if another method is allowed for the
    /// current route, if the current request can not be routed.
    /// If this is the case, the request is answered with `MethodNotAllowed`
    /// and HTTP status code 405.
    /// If no other Method is allowed, the request is delegated to the `NotFound`
    /// handler.
    pub fn handle_method_not_allowed(mut self) -> Self {
        self.handle_method_not_allowed = true;
        self
    }

    /// A configurable handler which is called when a request
    /// cannot be routed and `handle_method_not_allowed` is true.
    /// The handler is responsible for the `Allow` header, see [`Router::allowed`].
    pub fn method_not_allowed(mut self, handler: impl Handler + 'static) -> Self {
        self.method_not_allowed = Some(Arc::new(handler));
        self
    }

    /// Sets the options used by the body decoders of every request.
    pub fn body_options(mut self, options: BodyOptions) -> Self {
        self.body = Arc::new(options);
        self
    }

    /// The registered routes, in registration order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Lookup allows the manual lookup of the route for a specific method and path.
    /// The first route registered for the method whose pattern matches wins.
    /// ```rust
    /// use waypoint::{Request, Responder, Router};
    /// use hyper::Method;
    ///
    /// let router = Router::default()
    ///     .get(r"/users/(\d+)", |_: Request, res: Responder| async { res.headers() });
    ///
    /// let (entry, params) = router.lookup(&Method::GET, "/users/42").unwrap();
    /// assert_eq!(entry.pattern().as_str(), r"^/users/(\d+)$");
    /// assert_eq!(params.as_slice(), ["42"]);
    /// ```
    pub fn lookup(&self, method: &Method, path: &str) -> Option<(&Entry, Params)> {
        self.entries
            .iter()
            .filter(|entry| entry.method() == method)
            .find_map(|entry| entry.pattern.captures(path).map(|params| (entry, params)))
    }

    /// Returns the methods with a route matching `path`, in registration order.
    /// ```rust
    /// use waypoint::{Request, Responder, Router};
    ///
    /// async fn noop(_: Request, res: Responder) {
    ///     res.headers();
    /// }
    ///
    /// let router = Router::default()
    ///     .get("/home", noop)
    ///     .post("/home", noop);
    ///
    /// assert_eq!(router.allowed("/home"), ["GET", "POST"]);
    /// assert!(router.allowed("/away").is_empty());
    /// ```
    pub fn allowed(&self, path: &str) -> Vec<&str> {
        let mut allowed: Vec<&str> = Vec::new();
        for entry in self.entries.iter().filter(|entry| entry.pattern.is_match(path)) {
            let method = entry.method().as_str();
            if !allowed.contains(&method) {
                allowed.push(method);
            }
        }
        allowed
    }

    fn insert(&mut self, route: Route) -> Result<()> {
        let pattern = Pattern::with_prefix(&self.prefix, route.path())?;
        let route = Route::from_parts(
            route.method().clone(),
            pattern.as_str().to_owned(),
            route.handler().clone(),
        );

        let existing = self.entries.iter_mut().find(|entry| {
            entry.method() == route.method() && entry.pattern.as_str() == pattern.as_str()
        });

        match existing {
            Some(entry) => {
                tracing::debug!(method = %route.method(), pattern = %pattern.as_str(), "Replacing route handler");
                entry.route = route;
            }
            None => self.entries.push(Entry { route, pattern }),
        }

        Ok(())
    }
}

/// The default configuration: no prefix, no fallback handlers.
impl Default for Router {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            entries: Vec::new(),
            middlewares: Vec::new(),
            not_found: None,
            method_not_allowed: None,
            handle_method_not_allowed: false,
            body: Arc::new(BodyOptions::default()),
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("prefix", &self.prefix)
            .field("entries", &self.entries)
            .field("middlewares", &self.middlewares.len())
            .field("not_found", &self.not_found.is_some())
            .field("handle_method_not_allowed", &self.handle_method_not_allowed)
            .finish()
    }
}

/// Represents a HTTP handler function.
/// This trait is implemented for asynchronous functions that take a [`Request`]
/// and a [`Responder`] and answer through the responder.
/// ```rust
/// # use waypoint::{Handler, Request, Responder};
/// async fn hello(_: Request, res: Responder) {
///     res.text("hello");
/// }
///
/// let handler: Box<dyn Handler> = Box::new(hello);
/// ```
pub trait Handler: Send + Sync {
    fn handle(&self, req: Request, res: Responder) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

impl<F, R> Handler for F
where
    F: Fn(Request, Responder) -> R + Send + Sync,
    R: Future<Output = ()> + Send + 'static,
{
    fn handle(&self, req: Request, res: Responder) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(self(req, res))
    }
}

/// What a middleware decided about a request.
#[derive(Debug)]
pub enum Flow {
    /// Continue with the next middleware and then route dispatch.
    Next,
    /// Answer the request with this response; no route handler runs.
    Respond(Response<Body>),
}

/// Runs for every request, in registration order, before route lookup.
/// ```rust
/// use waypoint::{Flow, Request, Router};
///
/// let router = Router::default().middleware(|req: &Request| {
///     tracing::info!(method = %req.method(), path = %req.path(), "request");
///     Flow::Next
/// });
/// ```
pub trait Middleware: Send + Sync {
    fn call(&self, req: &Request) -> Flow;
}

impl<F> Middleware for F
where
    F: Fn(&Request) -> Flow + Send + Sync,
{
    fn call(&self, req: &Request) -> Flow {
        self(req)
    }
}

#[doc(hidden)]
pub struct MakeRouterService(RouterService);

impl<T> Service<T> for MakeRouterService {
    type Response = RouterService;
    type Error = hyper::Error;
    type Future = future::Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _: T) -> Self::Future {
        let service = self.0.clone();
        future::ok(service)
    }
}

#[doc(hidden)]
#[derive(Clone)]
pub struct RouterService(Arc<Router>);

impl RouterService {
    fn new(router: Router) -> Self {
        RouterService(Arc::new(router))
    }
}

impl Service<hyper::Request<Body>> for RouterService {
    type Response = Response<Body>;
    type Error = hyper::Error;
    type Future = ResponseFut;

    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: hyper::Request<Body>) -> Self::Future {
        self.0.serve(req)
    }
}

impl Router {
    /// Converts the `Router` into a `Service` which you can serve directly with `Hyper`.
    /// If you have an existing `Service` that you want to incorporate a `Router` into, see
    /// [`Router::serve`](crate::Router::serve).
    /// ```rust,no_run
    /// # use waypoint::Router;
    /// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
    /// // Our router...
    /// let router = Router::default();
    ///
    /// // Convert it into a service...
    /// let service = router.into_service();
    ///
    /// // Serve with hyper
    /// hyper::Server::bind(&([127, 0, 0, 1], 3030).into())
    ///     .serve(service)
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn into_service(self) -> MakeRouterService {
        MakeRouterService(RouterService::new(self))
    }

    /// Dispatches a request and returns the future of its response.
    ///
    /// Middlewares run first. Then the first matching route's handler is
    /// spawned with its own [`Request`] and [`Responder`]; the returned
    /// future resolves once the handler has answered, while the handler
    /// itself may keep running. Unmatched requests go to the not-found
    /// handler, or get an empty `404`.
    ///
    /// A handler that panics or drops its responder without answering yields
    /// `500 Internal Server Error`.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub fn serve(&self, req: hyper::Request<Body>) -> ResponseFut {
        let mut req = Request::new(req, self.body.clone());

        for middleware in &self.middlewares {
            if let Flow::Respond(response) = middleware.call(&req) {
                tracing::debug!(method = %req.method(), path = %req.path(), "Answered by middleware");
                return ResponseFutKind::Ready(Some(response)).into();
            }
        }

        let matched = self
            .lookup(req.method(), req.path())
            .map(|(entry, params)| (entry.handler().clone(), entry.pattern.as_str().to_owned(), params));

        if let Some((handler, pattern, params)) = matched {
            tracing::debug!(method = %req.method(), path = %req.path(), pattern = %pattern, params = ?params, "Route matched");
            req.set_params(params);
            return dispatch(handler, req);
        }

        if self.handle_method_not_allowed {
            let allow = self.allowed(req.path()).join(", ");

            if !allow.is_empty() {
                tracing::debug!(method = %req.method(), path = %req.path(), allow = %allow, "Method not allowed");
                return match self.method_not_allowed {
                    Some(ref handler) => dispatch(handler.clone(), req),
                    None => ResponseFutKind::MethodNotAllowed(allow).into(),
                };
            }
        }

        tracing::debug!(method = %req.method(), path = %req.path(), "No route matched");
        match self.not_found {
            Some(ref handler) => dispatch(handler.clone(), req),
            None => ResponseFutKind::NotFound.into(),
        }
    }
}

fn dispatch(handler: Arc<dyn Handler>, req: Request) -> ResponseFut {
    let method = req.method().clone();
    let path = req.path().to_owned();
    let (res, rx) = Responder::channel();

    // the responder is dropped while unwinding, which answers with a 500
    match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(req, res))) {
        Ok(fut) => {
            tokio::spawn(async move {
                if AssertUnwindSafe(fut).catch_unwind().await.is_err() {
                    tracing::error!(method = %method, path = %path, "Handler panicked");
                }
            });
        }
        Err(_) => tracing::error!(method = %method, path = %path, "Handler panicked"),
    }

    ResponseFutKind::Pending(rx).into()
}

/// The response future returned by [`Router::serve`].
pub struct ResponseFut {
    kind: ResponseFutKind,
}

impl From<ResponseFutKind> for ResponseFut {
    fn from(kind: ResponseFutKind) -> Self {
        Self { kind }
    }
}

enum ResponseFutKind {
    Pending(oneshot::Receiver<Response<Body>>),
    Ready(Option<Response<Body>>),
    MethodNotAllowed(String),
    NotFound,
}

fn empty(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

impl Future for ResponseFut {
    type Output = hyper::Result<Response<Body>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let ready = match self.get_mut().kind {
            ResponseFutKind::Pending(ref mut rx) => match ready!(Pin::new(rx).poll(cx)) {
                Ok(response) => response,
                Err(_) => empty(StatusCode::INTERNAL_SERVER_ERROR),
            },
            ResponseFutKind::Ready(ref mut response) => response
                .take()
                .unwrap_or_else(|| empty(StatusCode::INTERNAL_SERVER_ERROR)),
            ResponseFutKind::NotFound => empty(StatusCode::NOT_FOUND),
            ResponseFutKind::MethodNotAllowed(ref allowed) => {
                let mut response = empty(StatusCode::METHOD_NOT_ALLOWED);
                if let Ok(value) = HeaderValue::from_str(allowed) {
                    response.headers_mut().insert(ALLOW, value);
                }
                response
            }
        };

        Poll::Ready(Ok(ready))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    async fn noop(_: Request, res: Responder) {
        res.headers();
    }

    #[test]
    fn first_registered_wins() {
        let router = Router::default()
            .get(r"/items/(\d+)", noop)
            .get(r"/items/(\w+)", noop);

        for _ in 0..10 {
            let (entry, params) = router.lookup(&Method::GET, "/items/7").unwrap();
            assert_eq!(entry.pattern().as_str(), r"^/items/(\d+)$");
            assert_eq!(params.as_slice(), ["7"]);
        }

        let (entry, _) = router.lookup(&Method::GET, "/items/seven").unwrap();
        assert_eq!(entry.pattern().as_str(), r"^/items/(\w+)$");
    }

    #[test]
    fn duplicate_registration_replaces_in_place() {
        let first: Arc<dyn Handler> = Arc::new(noop);
        let router = Router::default()
            .get("/a", noop)
            .get("/b", noop)
            .route(Route::from_parts(Method::GET, "^/a$".into(), first.clone()));

        assert_eq!(router.entries().len(), 2);
        assert_eq!(router.entries()[0].pattern().as_str(), "^/a$");
        assert!(Arc::ptr_eq(router.entries()[0].handler(), &first));
    }

    #[test]
    fn method_gates_lookup() {
        let router = Router::default().post("/submit", noop);

        assert!(router.lookup(&Method::POST, "/submit").is_some());
        assert!(router.lookup(&Method::GET, "/submit").is_none());
    }

    #[test]
    fn merge_copies_under_prefix() {
        let v1 = Router::with_prefix("/v1").get("/users", noop);
        let api = Router::with_prefix("/api").merge(&v1);

        // later changes to the merged router stay local
        let v1 = v1.get("/posts", noop);
        assert_eq!(v1.entries().len(), 2);
        assert_eq!(api.entries().len(), 1);

        assert!(api.lookup(&Method::GET, "/api/v1/users").is_some());
        assert!(api.lookup(&Method::GET, "/v1/users").is_none());
        assert!(api.lookup(&Method::GET, "/api/v1/posts").is_none());
    }

    #[test]
    fn merge_applies_left_to_right() {
        let c = Router::with_prefix("/c").get("/x", noop);
        let b = Router::with_prefix("/b").merge(&c);
        let a = Router::with_prefix("/a").merge(&b);

        assert_eq!(a.entries()[0].pattern().as_str(), "^/a/b/c/x$");
    }

    #[test]
    fn try_handle_reports_invalid_pattern() {
        let err = Router::default()
            .try_handle(Method::GET, "/broken/(", noop)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
        assert!(err.to_string().starts_with("invalid route pattern `^/broken/($`: "));
    }

    #[test]
    #[should_panic(expected = "invalid route pattern `^/broken/[$`: ")]
    fn handle_panics_on_invalid_pattern() {
        let _ = Router::default().get("/broken/[", noop);
    }

    #[test]
    fn config_prefix() {
        let config = Config {
            prefix: "/api/".into(),
            ..Config::default()
        };
        let router = Router::from_config(&config).get("/", noop);

        assert_eq!(router.prefix(), "/api");
        assert!(router.lookup(&Method::GET, "/api").is_some());
        assert!(router.lookup(&Method::GET, "/api/").is_some());
    }
}
