use std::path::{Path, PathBuf};

use bytes::Bytes;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::{
    constants::{ALLOWED_MIME_TYPES, MAX_UPLOAD_BYTES},
    error::{Result, VisualSearchError},
};

/// Where an upload comes from.
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// A file on disk.
    Path(PathBuf),
    /// A file handed over by a file input, a drop or a camera capture.
    Bytes {
        name: String,
        mime: Option<String>,
        bytes: Bytes,
    },
    /// A remote image that is fetched and treated as a file.
    Url(Url),
}

/// An accepted upload. Only constructed through validation.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub mime: String,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

fn mime_from_extension(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "jpg" | "jpeg" | "jfif" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        "txt" => "text/plain",
        "pdf" => "application/pdf",
        _ => return None,
    })
}

/// Resolve the MIME type from the declared type, falling back to the extension.
pub fn resolve_mime(name: &str, declared: Option<&str>) -> Option<String> {
    let declared = declared
        .map(|m| m.split(';').next().unwrap_or(m).trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty() && m != "application/octet-stream");

    declared.or_else(|| mime_from_extension(name).map(str::to_string))
}

/// Check size and type against the upload policy, returning the resolved MIME type.
pub fn validate(name: &str, declared_mime: Option<&str>, size: u64) -> Result<String> {
    if size > MAX_UPLOAD_BYTES {
        return Err(VisualSearchError::FileTooLarge {
            size,
            max: MAX_UPLOAD_BYTES,
        });
    }

    match resolve_mime(name, declared_mime) {
        Some(mime) if ALLOWED_MIME_TYPES.contains(&mime.as_str()) => Ok(mime),
        Some(mime) => Err(VisualSearchError::UnsupportedType(mime)),
        None => Err(VisualSearchError::UnsupportedType(name.to_string())),
    }
}

/// Turn an upload source into a validated file.
///
/// Local files are size-checked before they are read.
pub async fn load(source: UploadSource, client: &reqwest::Client) -> Result<UploadedFile> {
    match source {
        UploadSource::Path(path) => {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            let size = tokio::fs::metadata(&path).await?.len();
            let mime = validate(&name, None, size)?;
            let bytes = Bytes::from(tokio::fs::read(&path).await?);
            Ok(UploadedFile { name, mime, bytes })
        }
        UploadSource::Bytes { name, mime, bytes } => {
            let mime = validate(&name, mime.as_deref(), bytes.len() as u64)?;
            Ok(UploadedFile { name, mime, bytes })
        }
        UploadSource::Url(url) => fetch(&url, client).await,
    }
}

async fn fetch(url: &Url, client: &reqwest::Client) -> Result<UploadedFile> {
    debug!("Fetching image from {}", url);
    let response = client.get(url.clone()).send().await?.error_for_status()?;

    let name = url
        .path_segments()
        .and_then(|mut s| s.next_back())
        .filter(|s| !s.is_empty())
        .unwrap_or("image")
        .to_string();
    let declared = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if let Some(len) = response.content_length() {
        validate(&name, declared.as_deref(), len)?;
    }

    let bytes = response.bytes().await?;
    let mime = validate(&name, declared.as_deref(), bytes.len() as u64)?;
    Ok(UploadedFile { name, mime, bytes })
}
