//! Shared helpers for driving a router without a network listener.

use hyper::body::to_bytes;
use hyper::{Body, Method, Request, Response, StatusCode};
use waypoint::Router;

/// A response reduced to what the tests look at.
pub struct Captured {
    pub status: StatusCode,
    pub headers: hyper::HeaderMap,
    pub body: Vec<u8>,
}

#[allow(dead_code)]
impl Captured {
    pub fn text(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|value| value.to_str().unwrap())
    }
}

pub async fn capture(response: Response<Body>) -> Captured {
    let (parts, body) = response.into_parts();
    Captured {
        status: parts.status,
        headers: parts.headers,
        body: to_bytes(body).await.unwrap().to_vec(),
    }
}

/// Sends a request with an empty body.
pub async fn send(router: &Router, method: Method, uri: &str) -> Captured {
    let req = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
    capture(router.serve(req).await.unwrap()).await
}

/// Sends a request with a body and a content-type.
#[allow(dead_code)]
pub async fn send_body(
    router: &Router,
    method: Method,
    uri: &str,
    content_type: &str,
    body: impl Into<Body>,
) -> Captured {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", content_type)
        .body(body.into())
        .unwrap();
    capture(router.serve(req).await.unwrap()).await
}
