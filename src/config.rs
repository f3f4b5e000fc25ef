//! Router and body decoding configuration.
//!
//! All types derive serde traits so an application can embed them in its own
//! configuration file.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for a [`Router`](crate::Router).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Prefix applied to every route registered on the router, e.g. `/api`.
    pub prefix: String,

    /// Body decoding settings.
    pub body: BodyOptions,

    /// Answer `405 Method Not Allowed` when the path matches a route
    /// registered under another method.
    pub handle_method_not_allowed: bool,
}

/// Settings shared by every body decoder.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BodyOptions {
    /// Directory multipart file parts are written to. Relative paths are
    /// resolved against the working directory.
    pub upload_dir: PathBuf,

    /// Fail a decode when no chunk arrives for this many milliseconds.
    pub read_timeout_ms: Option<u64>,
}

impl BodyOptions {
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }
}

/// Per-call options for the multipart decoder.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FormDataOptions {
    /// Overrides [`BodyOptions::upload_dir`].
    pub directory: Option<PathBuf>,
}

impl FormDataOptions {
    pub fn directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: Some(directory.into()),
        }
    }
}
