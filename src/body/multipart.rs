use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::stream;
use hyper::header::HeaderMap;
use hyper::Body;
use serde::Serialize;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::{content_type, expect, next_chunk, ContentType};
use crate::error::{Error, Result};

const DEFAULT_ENCODING: &str = "7bit";

/// A file part already written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileData {
    pub mime: String,
    pub path: PathBuf,
    pub filename: String,
    pub encoding: String,
}

/// The value of a single multipart part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FormValue {
    Text(String),
    File(FileData),
}

impl FormValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormValue::Text(text) => Some(text),
            FormValue::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileData> {
        match self {
            FormValue::File(file) => Some(file),
            FormValue::Text(_) => None,
        }
    }
}

/// Decoded `multipart/form-data`, keyed by part name. Duplicate names keep the last part.
pub type FormData = BTreeMap<String, FormValue>;

/// Decodes a `multipart/form-data` body.
///
/// File parts are streamed chunk by chunk into `directory` under the part's
/// file name; only field parts are buffered in memory. The returned map is
/// complete once the closing boundary has been read.
///
/// Files written before a failure are left on disk.
pub async fn form_data(
    body: Body,
    headers: &HeaderMap,
    directory: &Path,
    timeout: Option<Duration>,
) -> Result<FormData> {
    expect(headers, ContentType::MultipartFormData)?;
    read_form_data(body, headers, directory, timeout).await
}

/// Same as [`form_data`] minus the `content-type` check.
pub(crate) async fn read_form_data(
    body: Body,
    headers: &HeaderMap,
    directory: &Path,
    timeout: Option<Duration>,
) -> Result<FormData> {
    let boundary = multer::parse_boundary(content_type(headers)).map_err(from_multer)?;

    let chunks = stream::unfold(body, move |mut body| async move {
        match next_chunk(&mut body, timeout).await {
            Ok(Some(chunk)) => Some((Ok(chunk), body)),
            Ok(None) => None,
            Err(err) => Some((Err(err), body)),
        }
    });

    let directory = std::env::current_dir()?.join(directory);
    let mut multipart = multer::Multipart::new(chunks, boundary);
    let mut decoded = FormData::new();

    while let Some(mut field) = multipart.next_field().await.map_err(from_multer)? {
        let name = match field.name() {
            Some(name) => name.to_owned(),
            None => continue,
        };

        let filename = match field.file_name() {
            Some(filename) => filename.to_owned(),
            None => {
                let value = field.text().await.map_err(from_multer)?;
                decoded.insert(name, FormValue::Text(value));
                continue;
            }
        };

        let filename = match Path::new(&filename).file_name() {
            Some(base) => base.to_string_lossy().into_owned(),
            // no file was selected for this input
            None => continue,
        };

        let mime = field
            .content_type()
            .map(|mime| mime.to_string())
            .unwrap_or_else(|| {
                mime_guess::from_path(&filename)
                    .first_or_octet_stream()
                    .to_string()
            });
        let encoding = field
            .headers()
            .get("content-transfer-encoding")
            .and_then(|value| value.to_str().ok())
            .unwrap_or(DEFAULT_ENCODING)
            .to_owned();

        fs::create_dir_all(&directory).await?;
        let path = directory.join(&filename);
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .await?;

        let mut written = 0u64;
        while let Some(chunk) = field.chunk().await.map_err(from_multer)? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!(field = %name, path = ?path, bytes = written, "Multipart file stored");

        decoded.insert(
            name,
            FormValue::File(FileData {
                mime,
                path,
                filename,
                encoding,
            }),
        );
    }

    Ok(decoded)
}

fn from_multer(err: multer::Error) -> Error {
    match err {
        multer::Error::StreamReadFailed(source) => match source.downcast::<Error>() {
            Ok(err) => *err,
            Err(source) => Error::Stream(source),
        },
        other => Error::decode(other),
    }
}
