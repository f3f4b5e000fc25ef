//! The response accessor handed to handlers.
//!
//! A [`Responder`] owns the response side of one request. Builder steps
//! (`status`, `header`, `cookie`, `body`) return the responder; terminal
//! steps (`end`, `headers`, `text`, `json`, `file`, `send`) consume it, so a
//! request can only be answered once.

use std::io;
use std::path::Path;

use hyper::body::Bytes;
use hyper::header::{
    HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, LAST_MODIFIED, SET_COOKIE,
};
use hyper::{Body, Response, StatusCode};
use serde::Serialize;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::sync::oneshot;

use crate::body::ContentType;
use crate::cookies::{self, Attributes};
use crate::error::{Error, Result};

const FILE_CHUNK_SIZE: usize = 64 * 1024;

/// Writes the response for a single request.
#[derive(Debug)]
pub struct Responder {
    tx: oneshot::Sender<Response<Body>>,
    status: StatusCode,
    headers: HeaderMap,
    chunks: Vec<Bytes>,
}

impl Responder {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<Response<Body>>) {
        let (tx, rx) = oneshot::channel();
        let responder = Self {
            tx,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            chunks: Vec::new(),
        };
        (responder, rx)
    }

    /// Sets the status code. Defaults to `200 OK`.
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Sets a header, replacing defaults the terminal step would write.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Appends a `set-cookie` header.
    pub fn cookie(mut self, key: &str, value: &str, attributes: &Attributes) -> Self {
        match HeaderValue::from_str(&cookies::create(key, value, attributes)) {
            Ok(cookie) => {
                self.headers.append(SET_COOKIE, cookie);
            }
            Err(_) => tracing::warn!(cookie = %key, "Cookie attributes are not a valid header value"),
        }
        self
    }

    /// Appends a chunk to the body written by [`Responder::end`].
    pub fn body(mut self, chunk: impl Into<Bytes>) -> Self {
        self.chunks.push(chunk.into());
        self
    }

    /// Sends the status, headers and accumulated body chunks.
    /// `content-type` defaults to `text/plain` when there is a body.
    pub fn end(mut self) {
        let mut defaults = HeaderMap::new();
        if !self.chunks.is_empty() {
            defaults.insert(CONTENT_TYPE, HeaderValue::from_static(ContentType::Text.as_str()));
        }

        let body = match self.chunks.len() {
            0 => Body::empty(),
            1 => Body::from(self.chunks.remove(0)),
            _ => Body::from(self.chunks.concat()),
        };
        self.finish(defaults, body);
    }

    /// Sends the status and headers with an empty body.
    pub fn headers(self) {
        self.finish(HeaderMap::new(), Body::empty());
    }

    /// Sends a `text/plain` body.
    pub fn text(self, payload: impl Into<String>) {
        let mut defaults = HeaderMap::new();
        defaults.insert(CONTENT_TYPE, HeaderValue::from_static(ContentType::Text.as_str()));
        self.finish(defaults, Body::from(payload.into()));
    }

    /// Serializes `payload` and sends it as `application/json`.
    ///
    /// If serialization fails the request is answered with `500` and the
    /// error is returned.
    pub fn json<T: Serialize + ?Sized>(self, payload: &T) -> Result<()> {
        match serde_json::to_vec(payload) {
            Ok(bytes) => {
                let mut defaults = HeaderMap::new();
                defaults.insert(CONTENT_TYPE, HeaderValue::from_static(ContentType::Json.as_str()));
                self.finish(defaults, Body::from(bytes));
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to serialize JSON response");
                self.status(StatusCode::INTERNAL_SERVER_ERROR).headers();
                Err(Error::Encode(err))
            }
        }
    }

    /// Streams a file.
    ///
    /// `content-type` is guessed from the extension, `content-length` and
    /// `last-modified` come from the file metadata. A missing file is
    /// answered with `404 Not Found`.
    pub async fn file(self, path: impl AsRef<Path>) {
        let path = path.as_ref();

        let opened = match File::open(path).await {
            Ok(file) => match file.metadata().await {
                Ok(metadata) if metadata.is_file() => Ok((file, metadata)),
                Ok(_) => Err(io::Error::new(io::ErrorKind::NotFound, "not a regular file")),
                Err(err) => Err(err),
            },
            Err(err) => Err(err),
        };

        let (file, metadata) = match opened {
            Ok(opened) => opened,
            Err(err) => {
                tracing::debug!(path = ?path, error = %err, "File not found");
                return self.status(StatusCode::NOT_FOUND).headers();
            }
        };

        let mut defaults = HeaderMap::new();
        let mime = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or_else(|| ContentType::Text.as_str());
        defaults.insert(CONTENT_TYPE, HeaderValue::from_static(mime));
        defaults.insert(CONTENT_LENGTH, HeaderValue::from(metadata.len()));
        if let Ok(modified) = metadata.modified() {
            if let Ok(value) = HeaderValue::from_str(&httpdate::fmt_http_date(modified)) {
                defaults.insert(LAST_MODIFIED, value);
            }
        }

        let (sender, body) = Body::channel();
        tokio::spawn(stream_file(file, sender));
        self.finish(defaults, body);
    }

    /// Sends a fully built response as is.
    pub fn send(self, response: Response<Body>) {
        if self.tx.send(response).is_err() {
            tracing::debug!("Response dropped, the request is gone");
        }
    }

    fn finish(self, defaults: HeaderMap, body: Body) {
        let Responder {
            tx,
            status,
            headers,
            ..
        } = self;

        let mut response = Response::new(body);
        *response.status_mut() = status;
        response.headers_mut().extend(defaults);
        for name in headers.keys() {
            response.headers_mut().remove(name);
        }
        for (name, value) in headers.iter() {
            response.headers_mut().append(name, value.clone());
        }

        if tx.send(response).is_err() {
            tracing::debug!("Response dropped, the request is gone");
        }
    }
}

async fn stream_file(mut file: File, mut sender: hyper::body::Sender) {
    let mut buf = vec![0; FILE_CHUNK_SIZE];
    loop {
        match file.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if sender.send_data(Bytes::copy_from_slice(&buf[..n])).await.is_err() {
                    break;
                }
            }
            Err(err) => {
                tracing::debug!(error = %err, "Failed to read file");
                sender.abort();
                break;
            }
        }
    }
}
