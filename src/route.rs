//! Standalone route declarations.
//!
//! Routes can be declared apart from a [`Router`](crate::Router), grouped
//! under a shared prefix and registered later:
//!
//! ```rust
//! use waypoint::route::{get, group, put};
//! use waypoint::{Request, Responder, Router};
//!
//! async fn list(_: Request, res: Responder) {
//!     res.text("[]");
//! }
//!
//! async fn update(_: Request, res: Responder) {
//!     res.headers();
//! }
//!
//! let users = group("/users", vec![get("/", list), put(r"/(\d+)", update)]);
//! assert_eq!(users[1].path(), r"^/users/(\d+)$");
//!
//! let router = Router::default().routes(users);
//! assert_eq!(router.entries().len(), 2);
//! ```

use std::fmt;
use std::sync::Arc;

use hyper::Method;

use crate::path;
use crate::router::Handler;

/// A method, an anchored path pattern and the handler answering it.
#[derive(Clone)]
pub struct Route {
    method: Method,
    path: String,
    handler: Arc<dyn Handler>,
}

impl Route {
    pub(crate) fn from_parts(method: Method, path: String, handler: Arc<dyn Handler>) -> Self {
        Self {
            method,
            path,
            handler,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The anchored pattern source, e.g. `^/users/(\d+)$`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .finish()
    }
}

/// Declares a route. The path is normalized and anchored but not compiled;
/// an invalid pattern is reported when the route is registered.
pub fn route(method: Method, path: &str, handler: impl Handler + 'static) -> Route {
    Route::from_parts(method, path::anchor(&path::normalize(path)), Arc::new(handler))
}

/// Declares a `GET` route.
pub fn get(path: &str, handler: impl Handler + 'static) -> Route {
    route(Method::GET, path, handler)
}

/// Declares a `HEAD` route.
pub fn head(path: &str, handler: impl Handler + 'static) -> Route {
    route(Method::HEAD, path, handler)
}

/// Declares an `OPTIONS` route.
pub fn options(path: &str, handler: impl Handler + 'static) -> Route {
    route(Method::OPTIONS, path, handler)
}

/// Declares a `POST` route.
pub fn post(path: &str, handler: impl Handler + 'static) -> Route {
    route(Method::POST, path, handler)
}

/// Declares a `PUT` route.
pub fn put(path: &str, handler: impl Handler + 'static) -> Route {
    route(Method::PUT, path, handler)
}

/// Declares a `PATCH` route.
pub fn patch(path: &str, handler: impl Handler + 'static) -> Route {
    route(Method::PATCH, path, handler)
}

/// Declares a `DELETE` route.
pub fn delete(path: &str, handler: impl Handler + 'static) -> Route {
    route(Method::DELETE, path, handler)
}

/// Rewrites the path of every route with `prefix`.
pub fn group(prefix: &str, routes: impl IntoIterator<Item = Route>) -> Vec<Route> {
    routes
        .into_iter()
        .map(|route| Route {
            path: path::join(prefix, &route.path),
            ..route
        })
        .collect()
}
