use std::collections::BTreeMap;
use std::time::Duration;

use hyper::header::HeaderMap;
use hyper::Body;

use super::{collect, expect, ContentType};
use crate::error::Result;

/// Decoded `application/x-www-form-urlencoded` pairs. Duplicate keys keep the last value.
pub type Form = BTreeMap<String, String>;

/// Decodes an `application/x-www-form-urlencoded` body.
pub async fn urlencoded(body: Body, headers: &HeaderMap, timeout: Option<Duration>) -> Result<Form> {
    expect(headers, ContentType::FormUrlEncoded)?;
    read_urlencoded(body, timeout).await
}

pub(crate) async fn read_urlencoded(body: Body, timeout: Option<Duration>) -> Result<Form> {
    let bytes = collect(body, timeout).await?;
    Ok(form_urlencoded::parse(&bytes).into_owned().collect())
}
