//! Static file serving.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use hyper::StatusCode;
use percent_encoding::percent_decode_str;

use crate::request::Request;
use crate::response::Responder;
use crate::route::{get, Route};

/// Any path whose last segment has a file extension.
const FILE_EXTENSION_PATTERN: &str = r"/.+\.\w[\w\d]*";

/// Serves static files from `dir`. Relative directories are resolved against
/// the working directory.
///
/// The returned `GET` route matches every path ending in a file extension,
/// so register it after more specific routes. Missing files and paths
/// containing `..` are answered with `404 Not Found`.
///
/// ```rust
/// use waypoint::{files, Router};
///
/// let router = Router::default().route(files("public"));
/// assert_eq!(router.entries()[0].pattern().as_str(), r"^/.+\.\w[\w\d]*$");
/// ```
pub fn files(dir: impl Into<PathBuf>) -> Route {
    let dir = Arc::new(dir.into());

    get(FILE_EXTENSION_PATTERN, move |req: Request, res: Responder| {
        let dir = dir.clone();
        async move {
            match resolve(&dir, req.path()) {
                Some(path) => res.file(path).await,
                None => res.status(StatusCode::NOT_FOUND).headers(),
            }
        }
    })
}

fn resolve(dir: &Path, request_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(request_path).decode_utf8_lossy();
    let relative = Path::new(decoded.trim_start_matches('/'));

    if relative
        .components()
        .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }

    Some(dir.join(relative))
}
