mod common;

use std::path::PathBuf;

use common::{send, send_body, Captured};
use hyper::{Body, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use waypoint::{BodyOptions, Error, FormDataOptions, Request, Responder, Router};

const BOUNDARY: &str = "X-WAYPOINT-BOUNDARY";

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("waypoint-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn multipart_body() -> String {
    [
        format!("--{}\r\n", BOUNDARY),
        "Content-Disposition: form-data; name=\"title\"\r\n\r\n".to_owned(),
        "holiday\r\n".to_owned(),
        format!("--{}\r\n", BOUNDARY),
        "Content-Disposition: form-data; name=\"photo\"; filename=\"../beach.png\"\r\n".to_owned(),
        "Content-Type: image/png\r\n\r\n".to_owned(),
        "not really a png\r\n".to_owned(),
        format!("--{}--\r\n", BOUNDARY),
    ]
    .concat()
}

fn multipart_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

/// Answers with the decode error as text and a 400.
fn reject(res: Responder, err: Error) {
    res.status(StatusCode::BAD_REQUEST).text(err.to_string());
}

fn json_of(captured: &Captured) -> Value {
    serde_json::from_slice(&captured.body).unwrap()
}

#[derive(Debug, Serialize, Deserialize)]
struct Greeting {
    name: String,
    times: u32,
}

#[tokio::test]
async fn json_round_trip() {
    let router = Router::default().post("/greet", |mut req: Request, res: Responder| async move {
        match req.json::<Greeting>().await {
            Ok(mut greeting) => {
                greeting.times += 1;
                res.json(&greeting).unwrap();
            }
            Err(err) => reject(res, err),
        }
    });

    let captured = send_body(
        &router,
        Method::POST,
        "/greet",
        "application/json; charset=utf-8",
        r#"{"name":"ada","times":1}"#,
    )
    .await;

    assert_eq!(captured.status, StatusCode::OK);
    assert_eq!(captured.header("content-type"), Some("application/json"));
    assert_eq!(json_of(&captured), json!({ "name": "ada", "times": 2 }));
}

fn json_samples() -> Vec<Value> {
    vec![
        json!({ "name": "ada", "tags": ["math", "engines"], "born": 1815 }),
        json!([1, { "a": [] }]),
        json!("s"),
        json!(1.5),
        json!(-3),
        json!(true),
        json!(null),
    ]
}

#[tokio::test]
async fn json_responses_decode_to_the_same_value() {
    let (decoded_tx, mut decoded_rx) = mpsc::unbounded_channel();

    let router = Router::default()
        .get(r"/samples/(\d+)", |req: Request, res: Responder| async move {
            let index: usize = req.param(0).and_then(|p| p.parse().ok()).unwrap_or(0);
            res.json(&json_samples()[index]).unwrap();
        })
        .post("/decode", move |mut req: Request, res: Responder| {
            let decoded_tx = decoded_tx.clone();
            async move {
                match req.json::<Value>().await {
                    Ok(value) => {
                        decoded_tx.send(value).unwrap();
                        res.headers();
                    }
                    Err(err) => reject(res, err),
                }
            }
        });

    for (index, expected) in json_samples().into_iter().enumerate() {
        let encoded = send(&router, Method::GET, &format!("/samples/{}", index)).await;
        assert_eq!(encoded.header("content-type"), Some("application/json"));

        let content_type = encoded.header("content-type").unwrap().to_owned();
        let decoded = send_body(&router, Method::POST, "/decode", &content_type, encoded.body).await;
        assert_eq!(decoded.status, StatusCode::OK);
        assert_eq!(decoded_rx.recv().await.unwrap(), expected);
    }
}

#[tokio::test]
async fn json_errors_are_left_to_the_handler() {
    let router = Router::default().post("/greet", |mut req: Request, res: Responder| async move {
        match req.json::<Greeting>().await {
            Ok(_) => res.headers(),
            Err(Error::ContentTypeMismatch { .. }) => res.status(StatusCode::UNSUPPORTED_MEDIA_TYPE).headers(),
            Err(err) => reject(res, err),
        }
    });

    let mismatch = send_body(&router, Method::POST, "/greet", "text/plain", "{}").await;
    assert_eq!(mismatch.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let malformed = send_body(&router, Method::POST, "/greet", "application/json", "{\"name\":").await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn text_body() {
    let router = Router::default().put("/note", |mut req: Request, res: Responder| async move {
        match req.text().await {
            Ok(text) => res.text(text.to_uppercase()),
            Err(err) => reject(res, err),
        }
    });

    let captured = send_body(&router, Method::PUT, "/note", "text/plain", "remember the milk").await;
    assert_eq!(captured.text(), "REMEMBER THE MILK");
}

#[tokio::test]
async fn body_is_consumed_once() {
    let router = Router::default().put("/note", |mut req: Request, res: Responder| async move {
        let first = req.text().await;
        let second = req.text().await;
        assert!(first.is_ok());
        assert!(matches!(second, Err(Error::BodyConsumed)));
        res.headers();
    });

    let captured = send_body(&router, Method::PUT, "/note", "text/plain", "once").await;
    assert_eq!(captured.status, StatusCode::OK);
}

#[tokio::test]
async fn urlencoded_form() {
    let router = Router::default().post("/login", |mut req: Request, res: Responder| async move {
        match req.urlencoded().await {
            Ok(form) => res.json(&form).unwrap(),
            Err(err) => reject(res, err),
        }
    });

    let captured = send_body(
        &router,
        Method::POST,
        "/login",
        "application/x-www-form-urlencoded",
        "user=ada+lovelace&pass=p%26ss&user=ada",
    )
    .await;

    assert_eq!(captured.status, StatusCode::OK);
    assert_eq!(json_of(&captured), json!({ "user": "ada", "pass": "p&ss" }));
}

#[tokio::test]
async fn multipart_into_upload_dir() {
    let dir = scratch_dir("uploads");
    let router = Router::default()
        .body_options(BodyOptions {
            upload_dir: dir.clone(),
            ..BodyOptions::default()
        })
        .post("/upload", |mut req: Request, res: Responder| async move {
            match req.form_data().await {
                Ok(form) => res.json(&form).unwrap(),
                Err(err) => reject(res, err),
            }
        });

    let captured = send_body(&router, Method::POST, "/upload", &multipart_type(), multipart_body()).await;
    assert_eq!(captured.status, StatusCode::OK);

    let form = json_of(&captured);
    assert_eq!(form["title"], "holiday");
    assert_eq!(form["photo"]["filename"], "beach.png");
    assert_eq!(form["photo"]["mime"], "image/png");
    assert_eq!(form["photo"]["encoding"], "7bit");

    let stored = std::fs::read(dir.join("beach.png")).unwrap();
    assert_eq!(stored, b"not really a png");

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn multipart_directory_per_call() {
    let configured = scratch_dir("configured");
    let override_dir = scratch_dir("override");

    let target = override_dir.clone();
    let router = Router::default()
        .body_options(BodyOptions {
            upload_dir: configured.clone(),
            ..BodyOptions::default()
        })
        .post("/upload", move |mut req: Request, res: Responder| {
            let options = FormDataOptions::directory(target.clone());
            async move {
                match req.form_data_with(&options).await {
                    Ok(form) => res.text(form.len().to_string()),
                    Err(err) => reject(res, err),
                }
            }
        });

    let captured = send_body(&router, Method::POST, "/upload", &multipart_type(), multipart_body()).await;
    assert_eq!(captured.text(), "2");
    assert!(override_dir.join("beach.png").is_file());
    assert!(!configured.exists());

    std::fs::remove_dir_all(&override_dir).unwrap();
}

#[tokio::test]
async fn multipart_rejects_other_content_types() {
    let router = Router::default().post("/upload", |mut req: Request, res: Responder| async move {
        match req.form_data().await {
            Ok(_) => res.headers(),
            Err(err) => reject(res, err),
        }
    });

    let captured = send_body(&router, Method::POST, "/upload", "application/json", "{}").await;
    assert_eq!(captured.status, StatusCode::BAD_REQUEST);
    assert!(captured.text().contains("multipart/form-data"));
}

#[tokio::test]
async fn aborted_upload_fails_the_decode() {
    let router = Router::default().put("/note", |mut req: Request, res: Responder| async move {
        match req.text().await {
            Ok(_) => res.headers(),
            Err(Error::Stream(_)) => res.status(StatusCode::BAD_REQUEST).headers(),
            Err(err) => reject(res, err),
        }
    });

    let (mut sender, body) = Body::channel();
    tokio::spawn(async move {
        let _ = sender.send_data("partial".into()).await;
        sender.abort();
    });

    let captured = send_body(&router, Method::PUT, "/note", "text/plain", body).await;
    assert_eq!(captured.status, StatusCode::BAD_REQUEST);
}
