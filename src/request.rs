//! The request accessor handed to handlers.

use std::sync::Arc;

use hyper::header::{HeaderMap, COOKIE};
use hyper::http::request::Parts;
use hyper::{Body, Method, Uri, Version};
use serde::de::DeserializeOwned;

use crate::body::{self, ContentType, Form, FormData};
use crate::config::{BodyOptions, FormDataOptions};
use crate::cookies::{self, Cookies};
use crate::error::{Error, Result};
use crate::path::Params;

/// A single inbound request: its head, the parameters captured by the
/// matched route and the not yet consumed body.
///
/// Each dispatch builds its own `Request`, so captured parameters never leak
/// between concurrent requests.
#[derive(Debug)]
pub struct Request {
    parts: Parts,
    params: Params,
    body: Option<Body>,
    options: Arc<BodyOptions>,
}

impl Request {
    pub(crate) fn new(req: hyper::Request<Body>, options: Arc<BodyOptions>) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            parts,
            params: Params::default(),
            body: Some(body),
            options,
        }
    }

    pub(crate) fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// The request path, without the query string.
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn version(&self) -> Version {
        self.parts.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Returns the first value of a header, if it is present and valid text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Positional parameters captured by the matched route.
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index)
    }

    /// Cookies sent with the request, from every `cookie` header.
    pub fn cookies(&self) -> Cookies {
        let joined = self
            .parts
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect::<Vec<_>>()
            .join("; ");
        cookies::parse(&joined)
    }

    /// Takes the raw body stream. Later decodes fail with [`Error::BodyConsumed`].
    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }

    /// The only `content-type` check of a decode. A mismatch leaves the body in place.
    fn consume(&mut self, expected: Option<ContentType>) -> Result<Body> {
        if let Some(expected) = expected {
            body::expect(&self.parts.headers, expected)?;
        }
        self.body.take().ok_or(Error::BodyConsumed)
    }

    /// Reads the body as UTF-8 text.
    pub async fn text(&mut self) -> Result<String> {
        let body = self.consume(None)?;
        body::text(body, self.options.read_timeout()).await
    }

    /// Reads an `application/json` body.
    pub async fn json<T: DeserializeOwned>(&mut self) -> Result<T> {
        let body = self.consume(Some(ContentType::Json))?;
        body::read_json(body, self.options.read_timeout()).await
    }

    /// Reads an `application/x-www-form-urlencoded` body.
    pub async fn urlencoded(&mut self) -> Result<Form> {
        let body = self.consume(Some(ContentType::FormUrlEncoded))?;
        body::read_urlencoded(body, self.options.read_timeout()).await
    }

    /// Reads a `multipart/form-data` body, storing files in the configured upload directory.
    pub async fn form_data(&mut self) -> Result<FormData> {
        self.form_data_with(&FormDataOptions::default()).await
    }

    /// Reads a `multipart/form-data` body with per-call options.
    pub async fn form_data_with(&mut self, options: &FormDataOptions) -> Result<FormData> {
        let body = self.consume(Some(ContentType::MultipartFormData))?;
        let directory = options
            .directory
            .as_deref()
            .unwrap_or(self.options.upload_dir.as_path());
        body::read_form_data(body, &self.parts.headers, directory, self.options.read_timeout()).await
    }
}
