mod common;

use common::send;
use hyper::{Method, StatusCode};
use waypoint::cookies::{Attributes, SameSite};
use waypoint::{files, Request, Responder, Router};

#[tokio::test]
async fn serves_files_by_extension() {
    let dir = std::env::temp_dir().join(format!("waypoint-public-{}", std::process::id()));
    std::fs::create_dir_all(dir.join("css")).unwrap();
    std::fs::write(dir.join("css/site.css"), "body { margin: 0 }").unwrap();

    let router = Router::default()
        .get("/", |_: Request, res: Responder| async { res.text("index") })
        .route(files(&dir));

    let css = send(&router, Method::GET, "/css/site.css").await;
    assert_eq!(css.status, StatusCode::OK);
    assert_eq!(css.header("content-type"), Some("text/css"));
    assert_eq!(css.header("content-length"), Some("18"));
    assert_eq!(css.text(), "body { margin: 0 }");

    assert_eq!(send(&router, Method::GET, "/css/missing.css").await.status, StatusCode::NOT_FOUND);
    assert_eq!(send(&router, Method::GET, "/../etc/passwd.txt").await.status, StatusCode::NOT_FOUND);
    assert_eq!(send(&router, Method::GET, "/").await.text(), "index");

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn cookies_in_and_out() {
    let router = Router::default().get("/session", |req: Request, res: Responder| async move {
        let cookies = req.cookies();
        let visits: u32 = cookies
            .get("visits")
            .and_then(|value| value.as_deref())
            .and_then(|value| value.parse().ok())
            .unwrap_or(0);

        let attributes = Attributes {
            path: Some("/session".to_owned()),
            same_site: Some(SameSite::Lax),
            ..Attributes::default()
        };
        res.cookie("visits", &(visits + 1).to_string(), &attributes)
            .text(cookies.get("name").cloned().flatten().unwrap_or_default());
    });

    let req = hyper::Request::builder()
        .uri("/session")
        .header("cookie", "visits=2; name=ada%20lovelace")
        .header("cookie", "flag")
        .body(hyper::Body::empty())
        .unwrap();
    let captured = common::capture(router.serve(req).await.unwrap()).await;

    assert_eq!(captured.text(), "ada lovelace");
    assert_eq!(
        captured.header("set-cookie"),
        Some("visits=3; Path=/session; Secure; HttpOnly; SameSite=Lax")
    );
}
