//! # Waypoint
//!
//! Waypoint is a small HTTP request router and body decoding layer for hyper.
//!
//! Routes are regular expressions matched against the request method and the
//! whole request path. Capturing groups become positional parameters. Handlers
//! get a [`Request`] to read the head, the parameters and a negotiated body,
//! and a [`Responder`] to write exactly one response.
//!
//! ## Features
//!
//! **Deterministic matching:** Every pattern is anchored at both ends, so a
//! route only matches a whole path. When several routes match the same
//! request, the one registered first wins. Registering the same method and
//! pattern twice replaces the earlier handler in place.
//!
//! **Composable tables:** Routers carry a prefix. Routes can be declared on
//! their own and grouped under a prefix with [`route::group`], and a router
//! can be merged into another one, which copies its routes under the outer
//! prefix.
//!
//! **Parameters per request:** Captured parameters live in the [`Request`] of
//! the request that produced them. Concurrent requests never see each
//! other's parameters.
//!
//! **Body decoders:** `text/plain`, `application/json`,
//! `application/x-www-form-urlencoded` and `multipart/form-data`. Multipart
//! file parts are streamed straight to disk.
//!
//! ## Usage
//!
//! Here is a simple example:
//!
//! ```rust,no_run
//! use waypoint::{Request, Responder, Router};
//! use serde_json::Value;
//!
//! async fn index(_: Request, res: Responder) {
//!     res.text("Hello, World!");
//! }
//!
//! async fn echo(mut req: Request, res: Responder) {
//!     match req.json::<Value>().await {
//!         Ok(value) => {
//!             let _ = res.json(&value);
//!         }
//!         Err(err) => res
//!             .status(hyper::StatusCode::BAD_REQUEST)
//!             .text(err.to_string()),
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let router = Router::default()
//!         .get("/", index)
//!         .post("/echo", echo);
//!
//!     hyper::Server::bind(&([127, 0, 0, 1], 3000).into())
//!         .serve(router.into_service())
//!         .await
//!         .unwrap();
//! }
//! ```
//!
//! ### Positional parameters
//!
//! ```ignore
//! Pattern: /users/(\d+)
//!
//!  /users/42                 match: ["42"]
//!  /users/abc                no match
//!  /users/42/profile         no match
//! ```
//!
//! Decode failures are not turned into responses automatically: a handler
//! decides how to answer a [`Error::ContentTypeMismatch`] or a malformed body.
//!
//! ### Not Found Handler
//!
//! Requests that match no route get an empty `404 Not Found`, unless a
//! handler is set with [`Router::not_found`].
//!
//! ### Static files
//!
//! You can use the router to serve pages from a static file directory:
//!
//! ```rust
//! use waypoint::{files, Router};
//!
//! let router = Router::default().route(files("public"));
//! ```

#![forbid(unsafe_code)]

pub mod body;
pub mod config;
pub mod cookies;
pub mod error;
mod files;
pub mod path;
mod request;
mod response;
pub mod route;

#[doc(hidden)]
pub mod router;

#[doc(inline)]
pub use router::{Entry, Flow, Handler, Middleware, ResponseFut, Router};

pub use config::{BodyOptions, Config, FormDataOptions};
pub use error::{Error, Result};
pub use files::files;
pub use path::{Params, Pattern};
pub use request::Request;
pub use response::Responder;
