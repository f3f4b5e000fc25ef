//! Cookie header parsing and `set-cookie` value creation.
//!
//! Cookies travel as `key=value; Attr1; Attr2=val2`. Keys and values are
//! percent-encoded with the same set as JavaScript's `encodeURIComponent`.

use std::collections::BTreeMap;
use std::fmt::{self, Write};

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

const COOKIE_DELIMITER: &str = "; ";
const COOKIE_PAIR_DELIMITER: char = '=';

const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Parsed cookies. A key sent without `=` maps to `None`.
pub type Cookies = BTreeMap<String, Option<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        })
    }
}

/// Attributes written after the cookie pair.
///
/// The defaults are `Path=/; Secure; HttpOnly; SameSite=Strict`, so the
/// cookie is sent with every request to the server. Setting `path`
/// explicitly is recommended.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Attributes {
    pub path: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
    pub domain: Option<String>,
    pub expires: Option<String>,
    pub max_age: Option<i64>,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            path: Some("/".to_owned()),
            secure: true,
            http_only: true,
            same_site: Some(SameSite::Strict),
            domain: None,
            expires: None,
            max_age: None,
        }
    }
}

/// Parses a `cookie` header value.
pub fn parse(data: &str) -> Cookies {
    data.split(COOKIE_DELIMITER)
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once(COOKIE_PAIR_DELIMITER) {
            Some((key, value)) => (decode(key), Some(decode(value))),
            None => (decode(pair), None),
        })
        .collect()
}

/// Creates a `set-cookie` header value.
///
/// ```
/// use waypoint::cookies::{create, Attributes};
///
/// assert_eq!(
///     create("session", "a b", &Attributes::default()),
///     "session=a%20b; Path=/; Secure; HttpOnly; SameSite=Strict"
/// );
/// ```
pub fn create(key: &str, value: &str, attributes: &Attributes) -> String {
    let mut cookie = format!(
        "{}{}{}",
        utf8_percent_encode(key, COMPONENT),
        COOKIE_PAIR_DELIMITER,
        utf8_percent_encode(value, COMPONENT)
    );

    // writing to a String cannot fail
    let _ = write_attributes(&mut cookie, attributes);
    cookie
}

fn write_attributes(out: &mut String, attributes: &Attributes) -> fmt::Result {
    if let Some(path) = &attributes.path {
        write!(out, "{}Path={}", COOKIE_DELIMITER, path)?;
    }
    if attributes.secure {
        write!(out, "{}Secure", COOKIE_DELIMITER)?;
    }
    if attributes.http_only {
        write!(out, "{}HttpOnly", COOKIE_DELIMITER)?;
    }
    if let Some(same_site) = attributes.same_site {
        write!(out, "{}SameSite={}", COOKIE_DELIMITER, same_site)?;
    }
    if let Some(domain) = &attributes.domain {
        write!(out, "{}Domain={}", COOKIE_DELIMITER, domain)?;
    }
    if let Some(expires) = &attributes.expires {
        write!(out, "{}Expires={}", COOKIE_DELIMITER, expires)?;
    }
    if let Some(max_age) = attributes.max_age {
        write!(out, "{}Max-Age={}", COOKIE_DELIMITER, max_age)?;
    }
    Ok(())
}

fn decode(part: &str) -> String {
    percent_decode_str(part).decode_utf8_lossy().into_owned()
}
