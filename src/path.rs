//! Route path normalization and pattern compilation.
//!
//! A route path is either a literal (`/users/42`) or a regular expression
//! (`/users/(\d+)`). Before compiling, a path is normalized:
//!
//! ```ignore
//!  Input          Normalized      Matches
//!  users          /users          /users
//!  /users/        /users/?        /users, /users/
//!  ^/users$       /users          /users
//!  (empty)        /               /
//! ```
//!
//! The compiled pattern is always anchored at both ends, so `/users` never
//! matches `/users/42`.

use std::ops::Index;
use std::slice;

use regex::Regex;

use crate::error::{Error, Result};

/// Removes the `^` and `$` anchors, if present.
pub fn unanchor(path: &str) -> &str {
    let path = path.strip_prefix('^').unwrap_or(path);
    path.strip_suffix('$').unwrap_or(path)
}

/// Wraps a path in `^` and `$` anchors, without doubling existing ones.
pub fn anchor(path: &str) -> String {
    format!("^{}$", unanchor(path))
}

/// Normalizes a route path: strips anchors, collapses leading slashes into
/// one and turns trailing slashes into a single optional one.
pub fn normalize(path: &str) -> String {
    let path = unanchor(path);

    // already tolerant, e.g. a path taken from a compiled route
    let (path, tolerant) = match path.strip_suffix("/?") {
        Some(rest) => (rest, true),
        None => (path, false),
    };

    let body = path.trim_start_matches('/');
    let trailing = tolerant || (body.ends_with('/') && !body.ends_with("\\/"));
    let body = if trailing { body.trim_end_matches('/') } else { body };

    if body.is_empty() {
        "/".to_owned()
    } else if trailing {
        format!("/{}/?", body)
    } else {
        format!("/{}", body)
    }
}

/// Normalizes a prefix: strips anchors and trailing slashes and ensures a
/// leading slash. The root prefix normalizes to an empty string.
pub fn normalize_prefix(prefix: &str) -> String {
    let prefix = unanchor(prefix).trim_end_matches('/');
    if prefix.is_empty() {
        String::new()
    } else {
        with_leading_slash(prefix)
    }
}

/// Joins a prefix and a path into an anchored pattern source.
///
/// ```
/// # use waypoint::path::join;
/// assert_eq!(join("/api", "/ping"), "^/api/ping$");
/// assert_eq!(join("/api/", "^/ping$"), "^/api/ping$");
/// assert_eq!(join("/api", "/"), "^/api/?$");
/// assert_eq!(join("", "users/"), "^/users/?$");
/// ```
pub fn join(prefix: &str, path: &str) -> String {
    let prefix = normalize_prefix(prefix);
    let path = normalize(path);

    if prefix.is_empty() {
        anchor(&path)
    } else if path == "/" {
        anchor(&format!("{}/?", prefix))
    } else {
        anchor(&format!("{}{}", prefix, path))
    }
}

fn with_leading_slash(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

/// An anchored matcher compiled from a route path.
///
/// The expression is wrapped in a non-capturing group before anchoring, so a
/// top-level alternation such as `/a|/b` still has to match the whole path.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Normalizes and compiles a route path.
    pub fn compile(path: &str) -> Result<Self> {
        Self::from_source(anchor(&normalize(path)))
    }

    /// Compiles `path` under `prefix`. See [`join`].
    pub fn with_prefix(prefix: &str, path: &str) -> Result<Self> {
        Self::from_source(join(prefix, path))
    }

    fn from_source(source: String) -> Result<Self> {
        // an unbalanced path like `/a)|(b` would otherwise close the group
        let compiled = Regex::new(&source)
            .and_then(|_| Regex::new(&format!("^(?:{})$", unanchor(&source))));

        match compiled {
            Ok(regex) => Ok(Self { source, regex }),
            Err(source_err) => Err(Error::InvalidPattern {
                pattern: source,
                source: source_err,
            }),
        }
    }

    /// The anchored pattern source, e.g. `^/users/(\d+)$`.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Matches `path` and returns the capturing groups, without the whole match.
    ///
    /// Groups that did not participate in the match yield empty strings so
    /// that positions stay stable.
    pub fn captures(&self, path: &str) -> Option<Params> {
        let captures = self.regex.captures(path)?;
        let params = captures
            .iter()
            .skip(1)
            .map(|group| group.map_or_else(String::new, |m| m.as_str().to_owned()))
            .collect();
        Some(Params(params))
    }
}

/// Positional parameters captured from the request path.
///
/// Computed per request and owned by that request's [`Request`](crate::Request).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<String>);

impl Params {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for Params {
    fn from(params: Vec<String>) -> Self {
        Params(params)
    }
}

impl Index<usize> for Params {
    type Output = str;

    fn index(&self, index: usize) -> &str {
        &self.0[index]
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = &'a String;
    type IntoIter = slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
