use std::time::Duration;

use hyper::header::HeaderMap;
use hyper::Body;
use serde::de::DeserializeOwned;

use super::{collect, expect, ContentType};
use crate::error::{Error, Result};

/// Decodes an `application/json` body into `T`.
pub async fn json<T>(body: Body, headers: &HeaderMap, timeout: Option<Duration>) -> Result<T>
where
    T: DeserializeOwned,
{
    expect(headers, ContentType::Json)?;
    read_json(body, timeout).await
}

/// Decodes without looking at `content-type`; the caller has checked it.
pub(crate) async fn read_json<T>(body: Body, timeout: Option<Duration>) -> Result<T>
where
    T: DeserializeOwned,
{
    let bytes = collect(body, timeout).await?;
    serde_json::from_slice(&bytes).map_err(Error::decode)
}
