//! Model file resolution.
//!
//! A model is looked up on disk first. If it is missing and a URL is configured it is
//! downloaded once into a `.download` temp file next to the target and renamed into
//! place when complete, so a half-written file is never picked up. No checksum is
//! verified.

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use spinespy_types::reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::{self as async_fs, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};

pub type AssetResult<T> = Result<T, AssetError>;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Model file {0} not found and no download URL configured")]
    Missing(PathBuf),

    #[error("Download of {url} failed: {message}")]
    Download { url: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Giving up on {url} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },
}

/// BlazePose full landmark model, 256x256 NHWC input
pub const POSE_MODEL_FILE: &str = "pose_landmarks_detector_full.onnx";
pub const POSE_MODEL_URL: &str =
    "https://huggingface.co/unity/sentis-blaze-pose/resolve/main/pose_landmarks_detector_full.onnx";

/// Where a model lives and where to fetch it from when it doesn't
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ModelSource {
    /// Absolute, or relative to the models directory
    pub path: PathBuf,
    pub url: Option<String>,
}

impl ModelSource {
    pub fn new(path: impl Into<PathBuf>, url: Option<&str>) -> Self {
        Self {
            path: path.into(),
            url: url.map(str::to_string),
        }
    }

    /// The bundled pose model, downloaded on first use
    pub fn default_pose() -> Self {
        Self::new(POSE_MODEL_FILE, Some(POSE_MODEL_URL))
    }

    pub fn resolve(&self, models_dir: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            models_dir.join(&self.path)
        }
    }
}

#[derive(Clone, Debug)]
pub struct DownloadPolicy {
    pub attempts: u32,
    /// Wait before the second attempt, doubled after every failure
    pub backoff: Duration,
}

impl Default for DownloadPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Make sure the model exists locally and return its path.
pub async fn ensure_asset(
    source: &ModelSource,
    models_dir: &Path,
    client: &Client,
    policy: &DownloadPolicy,
) -> AssetResult<PathBuf> {
    let path = source.resolve(models_dir);
    if async_fs::try_exists(&path).await.unwrap_or(false) {
        tracing::debug!(path = %path.display(), "model found");
        return Ok(path);
    }

    let Some(url) = source.url.as_deref() else {
        return Err(AssetError::Missing(path));
    };

    let attempts = policy.attempts.max(1);
    let mut backoff = policy.backoff;
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        tracing::info!(url, path = %path.display(), attempt, "downloading model");
        match download(client, url, &path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "model downloaded");
                return Ok(path);
            }
            Err(error) => {
                tracing::warn!(%error, attempt, attempts, "model download failed");
                last_error = error.to_string();
            }
        }

        if attempt < attempts {
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }

    Err(AssetError::RetriesExhausted {
        url: url.to_string(),
        attempts,
        last_error,
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let temp_extension = path
        .extension()
        .map(|ext| format!("{}.download", ext.to_string_lossy()))
        .unwrap_or_else(|| "download".to_string());
    path.with_extension(temp_extension)
}

async fn download(client: &Client, url: &str, path: &Path) -> AssetResult<()> {
    let download_error = |message: String| AssetError::Download {
        url: url.to_string(),
        message,
    };

    let res = client
        .get(url)
        .send()
        .await
        .and_then(|res| res.error_for_status())
        .map_err(|e| download_error(e.to_string()))?;

    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent).await?;
    }

    let temp_path = temp_path(path);
    let file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .create(true)
        .open(&temp_path)
        .await?;
    let mut file = BufWriter::with_capacity(1 << 20, file);

    let mut stream = res.bytes_stream();
    let mut downloaded = 0u64;
    while let Some(item) = stream.next().await {
        let chunk = match item {
            Ok(chunk) => chunk,
            Err(e) => {
                drop(file);
                let _ = async_fs::remove_file(&temp_path).await;
                return Err(download_error(e.to_string()));
            }
        };
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
    }

    file.flush().await?;
    file.get_mut().sync_all().await?;
    drop(file);

    async_fs::rename(&temp_path, path).await?;
    tracing::debug!(bytes = downloaded, "download complete");
    Ok(())
}
