//! Upload receiver: photos arriving from phones on the LAN.
//!
//! Files are stored flat in one directory as
//! `{YYYYmmdd_HHMMSS}_{sanitised stem}.{ext}`; that name is the image
//! identifier used everywhere else.

use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    axum::{
        Json,
        extract::{Multipart, Path as UrlPath, State},
        http::header,
        response::{IntoResponse, Response},
    },
    chrono::{DateTime, Local},
    serde_json::{Value, json},
    tokio::{
        fs::{File, OpenOptions},
        io::AsyncWriteExt,
    },
    tracing::{debug, info},
};

use crate::{
    error::{ApiError, ApiResult},
    state::GatewayState,
};

pub const ALLOWED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "heic", "heif"];

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No file provided")]
    NoFile,
    #[error("No file selected")]
    NoFileName,
    #[error("Invalid file type")]
    InvalidType,
    #[error("invalid file name {0:?}")]
    InvalidName(String),
    #[error("File not found")]
    NotFound(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Lowercased extension of `name` when it is an accepted image type.
pub fn allowed_extension(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Reduce a client-supplied name to `[A-Za-z0-9_.-]`.
///
/// Path separators and whitespace runs become `_`, other characters are
/// dropped, and leading or trailing dots and underscores are trimmed, so the
/// result never names a parent directory or hidden file.
pub fn sanitize_filename(name: &str) -> String {
    let spaced = name.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(['.', '_'])
        .to_string()
}

/// Stored name for an upload called `original` received at `now`.
pub fn stored_name(original: &str, now: DateTime<Local>) -> Result<String, UploadError> {
    if original.trim().is_empty() {
        return Err(UploadError::NoFileName);
    }
    let ext = allowed_extension(original).ok_or(UploadError::InvalidType)?;
    let stem = original
        .rsplit_once('.')
        .map_or(original, |(stem, _)| stem);
    let stem = match sanitize_filename(stem) {
        s if s.is_empty() => "upload".to_string(),
        s => s,
    };
    Ok(format!("{}_{stem}.{ext}", now.format("%Y%m%d_%H%M%S")))
}

fn content_type(name: &str) -> &'static str {
    match allowed_extension(name).as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        Some("heif") => "image/heif",
        _ => "application/octet-stream",
    }
}

/// The directory uploaded photos live in.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the stored image `name`. Names that are not a single plain
    /// file name are rejected.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, UploadError> {
        let plain = !name.is_empty()
            && !name.contains(['/', '\\', '\0'])
            && name != "."
            && name != ".."
            && Path::new(name).file_name().is_some_and(|f| f == name);
        if !plain {
            return Err(UploadError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(name))
    }

    /// Store `bytes` under a timestamped name and return that name. A name
    /// already taken within the same second gets a numeric suffix.
    pub async fn save(
        &self,
        original: &str,
        bytes: &[u8],
        now: DateTime<Local>,
    ) -> Result<String, UploadError> {
        let name = stored_name(original, now)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut candidate = name.clone();
        let mut n = 1;
        // `create_new` claims a name atomically; a taken one moves to the next suffix.
        let (path, mut file) = loop {
            let path = self.dir.join(&candidate);
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    candidate = match name.rsplit_once('.') {
                        Some((stem, ext)) => format!("{stem}_{n}.{ext}"),
                        None => format!("{name}_{n}"),
                    };
                    n += 1;
                },
                Err(e) => return Err(e.into()),
            }
        };

        if let Err(e) = write_all(&mut file, bytes).await {
            drop(file);
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e.into());
        }
        Ok(candidate)
    }

    /// Stored images, newest first.
    pub async fn list(&self) -> Result<Vec<String>, UploadError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && allowed_extension(name).is_some()
            {
                names.push(name.to_string());
            }
        }
        names.sort_unstable_by(|a, b| b.cmp(a));
        Ok(names)
    }

    pub async fn read(&self, name: &str) -> Result<Vec<u8>, UploadError> {
        let path = self.resolve(name)?;
        tokio::fs::read(&path).await.map_err(|e| not_found_or_io(e, name))
    }

    pub async fn delete(&self, name: &str) -> Result<(), UploadError> {
        let path = self.resolve(name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| not_found_or_io(e, name))
    }
}

async fn write_all(file: &mut File, bytes: &[u8]) -> io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await
}

fn not_found_or_io(err: io::Error, name: &str) -> UploadError {
    if err.kind() == io::ErrorKind::NotFound {
        UploadError::NotFound(name.to_string())
    } else {
        UploadError::Io(err)
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// `POST /upload`, multipart field `file`.
pub async fn upload_handler(
    State(state): State<Arc<GatewayState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let original = field.file_name().unwrap_or_default().to_string();
        if original.is_empty() {
            return Err(UploadError::NoFileName.into());
        }
        // Reject the type before buffering the body.
        allowed_extension(&original).ok_or(UploadError::InvalidType)?;
        let bytes = field.bytes().await?;

        let filename = state.uploads.save(&original, &bytes, Local::now()).await?;
        info!(filename = %filename, size = bytes.len(), "photo received");
        return Ok(Json(json!({ "success": true, "filename": filename })));
    }
    Err(UploadError::NoFile.into())
}

/// `GET /uploads/{filename}`
pub async fn serve_handler(
    State(state): State<Arc<GatewayState>>,
    UrlPath(filename): UrlPath<String>,
) -> ApiResult<Response> {
    let bytes = state.uploads.read(&filename).await.map_err(|e| match e {
        UploadError::InvalidName(_) | UploadError::NotFound(_) => {
            debug!(filename = %filename, "upload not served");
            ApiError::NotFound("File not found".into())
        },
        other => other.into(),
    })?;
    Ok(([(header::CONTENT_TYPE, content_type(&filename))], bytes).into_response())
}

/// `GET /images`
pub async fn list_handler(State(state): State<Arc<GatewayState>>) -> ApiResult<Json<Value>> {
    let images = state.uploads.list().await?;
    Ok(Json(json!({ "images": images })))
}

/// `DELETE /delete/{filename}`
pub async fn delete_handler(
    State(state): State<Arc<GatewayState>>,
    UrlPath(filename): UrlPath<String>,
) -> ApiResult<Json<Value>> {
    state.uploads.delete(&filename).await.map_err(|e| match e {
        UploadError::InvalidName(_) => ApiError::NotFound("File not found".into()),
        other => other.into(),
    })?;
    info!(filename = %filename, "photo deleted");
    Ok(Json(json!({ "success": true })))
}
