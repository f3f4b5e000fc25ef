use std::time::Duration;

use hyper::Body;

use super::collect;
use crate::error::{Error, Result};

/// Decodes the body as a UTF-8 string. Any `content-type` is accepted.
pub async fn text(body: Body, timeout: Option<Duration>) -> Result<String> {
    let bytes = collect(body, timeout).await?;
    String::from_utf8(bytes).map_err(Error::decode)
}
