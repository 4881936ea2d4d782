// Model Downloader - snapshot download into a local directory
// Uses HuggingFace Hub for transfer and caching, then copies the files out

use anyhow::{Context, Result};
use hf_hub::api::sync::ApiBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

/// Repository files never needed by the PyTorch worker
pub const IGNORE_PATTERNS: &[&str] = &["*.msgpack", "*.h5", "*.ot", "*.md"];

/// Downloads a full repository snapshot, minus ignored files
pub struct HubDownloader {
    token: Option<String>,
    /// Hub base URL; `None` keeps `HF_ENDPOINT` or huggingface.co
    endpoint: Option<String>,
    ignore: Vec<glob::Pattern>,
}

impl HubDownloader {
    pub fn new(token: Option<String>) -> Result<Self> {
        let ignore = IGNORE_PATTERNS
            .iter()
            .map(|p| glob::Pattern::new(p).with_context(|| format!("Invalid pattern: {}", p)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            token,
            endpoint: None,
            ignore,
        })
    }

    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// True if `file` matches one of the ignore patterns
    pub fn is_ignored(&self, file: &str) -> bool {
        self.ignore.iter().any(|p| p.matches(file))
    }

    /// Download `repo_id` into `output_dir`.
    ///
    /// This is a blocking operation - use `spawn_blocking` from async code.
    pub fn download(&self, repo_id: &str, output_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut builder = ApiBuilder::from_env()
            .with_token(self.token.clone())
            .with_progress(false);
        if let Some(endpoint) = &self.endpoint {
            builder = builder.with_endpoint(endpoint.clone());
        }
        let api = builder
            .build()
            .context("Failed to create HuggingFace Hub client")?;
        let repo = api.model(repo_id.to_string());

        let info = repo
            .info()
            .with_context(|| format!("Failed to fetch repository info for {}", repo_id))?;

        let files: Vec<String> = info
            .siblings
            .into_iter()
            .map(|s| s.rfilename)
            .filter(|f| !self.is_ignored(f))
            .collect();

        tracing::info!(repo = repo_id, files = files.len(), sha = %info.sha, "Downloading snapshot");

        let progress = progress_bar(files.len() as u64);
        let mut written = Vec::with_capacity(files.len());

        for file in &files {
            progress.set_message(file.clone());

            let cached = repo
                .get(file)
                .with_context(|| format!("Failed to download {}", file))?;

            let dest = output_dir.join(file);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
            // Cache entries are symlinks into the blob store; copy the content
            std::fs::copy(&cached, &dest)
                .with_context(|| format!("Failed to copy {} to {}", file, dest.display()))?;

            tracing::debug!(file = %file, dest = %dest.display(), "File downloaded");
            written.push(dest);
            progress.inc(1);
        }

        progress.finish_and_clear();
        tracing::info!("✓ Download complete: {} files", written.len());

        Ok(written)
    }
}

fn progress_bar(total: u64) -> ProgressBar {
    if !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(total);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {wide_msg}")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignore_patterns() {
        let downloader = HubDownloader::new(None).unwrap();

        assert!(downloader.is_ignored("README.md"));
        assert!(downloader.is_ignored("flax_model.msgpack"));
        assert!(downloader.is_ignored("tf_model.h5"));
        assert!(downloader.is_ignored("docs/notes.md"));
        assert!(!downloader.is_ignored("config.json"));
        assert!(!downloader.is_ignored("pytorch_model-00001-of-00002.bin"));
        assert!(!downloader.is_ignored("model.safetensors"));
    }

    #[test]
    #[ignore] // Requires network - run with: cargo test -- --ignored
    fn test_download_small_model() {
        let dir = tempfile::TempDir::new().unwrap();
        let downloader = HubDownloader::new(None).unwrap();

        let files = downloader
            .download("hf-internal-testing/tiny-random-gpt2", dir.path())
            .unwrap();
        assert!(files.iter().any(|f| f.ends_with("config.json")));
    }
}
