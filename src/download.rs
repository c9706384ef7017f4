//! Pretrained model downloading and caching
//!
//! Named models resolve to a per-user cache directory; the first request for
//! a model that is not cached streams it from its release URL to a partial
//! file and atomically renames it into place, so a crashed download never
//! leaves a truncated model behind.

use crate::error::{RemovalError, Result};
use crate::models::NamedModel;
use futures_util::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Downloader for named pretrained models
#[derive(Debug)]
pub struct ModelDownloader {
    client: Client,
    cache_dir: PathBuf,
}

impl ModelDownloader {
    /// Create a downloader using the default per-user cache directory
    pub fn new() -> Result<Self> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| RemovalError::model("Could not determine cache directory"))?
            .join("bgremove-server")
            .join("models");
        Ok(Self::with_cache_dir(cache_dir))
    }

    /// Create a downloader with an explicit cache directory
    #[must_use]
    pub fn with_cache_dir(cache_dir: PathBuf) -> Self {
        Self {
            client: Client::new(),
            cache_dir,
        }
    }

    /// Cache path a named model resolves to
    #[must_use]
    pub fn model_path(&self, model: &NamedModel) -> PathBuf {
        self.cache_dir.join(format!("{}.onnx", model.name))
    }

    /// Return the cached path for a model, downloading it first if needed
    pub async fn ensure_cached(&self, model: &NamedModel) -> Result<PathBuf> {
        let target = self.model_path(model);
        if is_usable_model_file(&target) {
            tracing::debug!(model = model.name, path = %target.display(), "Model already cached");
            return Ok(target);
        }

        std::fs::create_dir_all(&self.cache_dir)?;
        tracing::info!(model = model.name, url = model.url, "Downloading model");

        let partial = target.with_extension("onnx.partial");
        let digest = self.download_to(model, &partial).await.map_err(|e| {
            // Never leave a partial file behind on failure
            let _ = std::fs::remove_file(&partial);
            e
        })?;

        std::fs::rename(&partial, &target)?;
        tracing::info!(
            model = model.name,
            path = %target.display(),
            sha256 = %digest,
            "Model downloaded and cached"
        );
        Ok(target)
    }

    /// Stream the model to `destination`, returning its SHA-256 digest
    async fn download_to(&self, model: &NamedModel, destination: &Path) -> Result<String> {
        let response = self
            .client
            .get(model.url)
            .send()
            .await
            .map_err(|e| RemovalError::model(format!("Download request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(RemovalError::model(format!(
                "Download of '{}' failed with HTTP {}",
                model.name,
                response.status()
            )));
        }

        let mut file = tokio::fs::File::create(destination).await?;
        let mut hasher = Sha256::new();
        let mut stream = response.bytes_stream();
        let mut total: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| RemovalError::model(format!("Download stream failed: {e}")))?;
            hasher.update(&chunk);
            total += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        if total == 0 {
            return Err(RemovalError::model(format!(
                "Download of '{}' produced an empty file",
                model.name
            )));
        }

        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// A cached model file is usable when it exists and is non-empty
fn is_usable_model_file(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::find_named_model;

    #[test]
    fn test_model_path_layout() {
        let downloader = ModelDownloader::with_cache_dir(PathBuf::from("/tmp/cache"));
        let model = find_named_model("u2netp").unwrap();
        assert_eq!(
            downloader.model_path(&model),
            PathBuf::from("/tmp/cache/u2netp.onnx")
        );
    }

    #[tokio::test]
    async fn test_cached_file_short_circuits_download() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = ModelDownloader::with_cache_dir(dir.path().to_path_buf());
        let model = find_named_model("u2netp").unwrap();

        // Pre-seed the cache; ensure_cached must not touch the network.
        std::fs::write(downloader.model_path(&model), b"model-bytes").unwrap();

        let path = downloader.ensure_cached(&model).await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"model-bytes");
    }

    #[test]
    fn test_empty_cached_file_is_not_usable() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.onnx");
        std::fs::write(&empty, b"").unwrap();

        assert!(!is_usable_model_file(&empty));
        assert!(!is_usable_model_file(&dir.path().join("missing.onnx")));
    }
}
