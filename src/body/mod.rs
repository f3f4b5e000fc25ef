//! Request body decoders.
//!
//! Every decoder fully drains the request stream before resolving. The public
//! decoders for a specific media type check the declared `content-type`
//! first; the check is a substring match because real headers carry
//! `charset` and `boundary` parameters. The [`Request`](crate::Request)
//! methods run that check once, before taking the body, and then use the
//! unchecked readers.

mod json;
mod multipart;
mod text;
mod urlencoded;

pub use json::json;
pub use multipart::{form_data, FileData, FormData, FormValue};
pub use text::text;
pub use urlencoded::{urlencoded, Form};

pub(crate) use json::read_json;
pub(crate) use multipart::read_form_data;
pub(crate) use urlencoded::read_urlencoded;

use std::io;
use std::time::Duration;

use hyper::body::{Bytes, HttpBody};
use hyper::header::{HeaderMap, CONTENT_TYPE};
use hyper::Body;

use crate::error::{Error, Result};

/// Media types the decoders recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Text,
    Json,
    FormUrlEncoded,
    MultipartFormData,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Text => "text/plain",
            ContentType::Json => "application/json",
            ContentType::FormUrlEncoded => "application/x-www-form-urlencoded",
            ContentType::MultipartFormData => "multipart/form-data",
        }
    }

    /// Whether a `content-type` header value declares this media type.
    pub fn matches(self, value: &str) -> bool {
        value.contains(self.as_str())
    }
}

/// The declared `content-type`, or an empty string.
pub(crate) fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

/// Fails with [`Error::ContentTypeMismatch`] unless the headers declare `expected`.
pub fn expect(headers: &HeaderMap, expected: ContentType) -> Result<()> {
    let found = content_type(headers);
    if expected.matches(found) {
        Ok(())
    } else {
        Err(Error::ContentTypeMismatch {
            expected: expected.as_str(),
            found: found.to_owned(),
        })
    }
}

/// Reads the next chunk, failing if the stream errors or stays idle past `timeout`.
pub(crate) async fn next_chunk(body: &mut Body, timeout: Option<Duration>) -> Result<Option<Bytes>> {
    let next = match timeout {
        Some(limit) => match tokio::time::timeout(limit, body.data()).await {
            Ok(next) => next,
            Err(_) => {
                return Err(Error::stream(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "request body idle timeout",
                )))
            }
        },
        None => body.data().await,
    };

    next.transpose().map_err(Error::stream)
}

/// Drains the whole body into memory.
pub(crate) async fn collect(mut body: Body, timeout: Option<Duration>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    while let Some(chunk) = next_chunk(&mut body, timeout).await? {
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}
