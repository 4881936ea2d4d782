// Model provisioning
//
// Checks whether the configured model is present locally and, if not,
// downloads it from the HuggingFace Hub and runs a best-effort validation.

mod download;
mod validate;

pub use download::{HubDownloader, IGNORE_PATTERNS};
pub use validate::{validate_model_dir, ValidationCheck, ValidationReport};

use std::path::{Path, PathBuf};

/// Hub namespaces that are never treated as local paths
pub const RESERVED_PREFIXES: &[&str] = &["lmsys/", "meta-llama/"];

/// Environment variable consulted when no token is passed explicitly
pub const TOKEN_ENV: &str = "HUGGINGFACE_TOKEN";

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("failed to download {model}: {reason}")]
    Download { model: String, reason: String },

    #[error("failed to prepare {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Local directory where downloaded models live (default `models/`)
#[derive(Debug, Clone)]
pub struct ModelStore {
    root: PathBuf,
    endpoint: Option<String>,
}

impl Default for ModelStore {
    fn default() -> Self {
        Self::new("models")
    }
}

impl ModelStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            endpoint: None,
        }
    }

    /// Download from another hub mirror instead of `HF_ENDPOINT`/huggingface.co
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// `<root>/<last path segment of model_ref>`
    pub fn default_dir(&self, model_ref: &str) -> PathBuf {
        let name = model_ref
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(model_ref);
        self.root.join(name)
    }

    /// Local path for `model_ref`, if one exists
    pub fn resolve_local(&self, model_ref: &str) -> Option<PathBuf> {
        let direct = Path::new(model_ref);
        if !is_reserved_remote(model_ref) && direct.exists() {
            return Some(direct.to_path_buf());
        }

        let default = self.default_dir(model_ref);
        default.exists().then_some(default)
    }

    pub fn is_model_available(&self, model_ref: &str) -> bool {
        self.resolve_local(model_ref).is_some()
    }

    /// Return a local path for `model_ref`, downloading it if needed.
    ///
    /// Only a failed transfer is an error; validation problems after the
    /// download are logged and the path is returned anyway.
    pub fn ensure_model_available(
        &self,
        model_ref: &str,
        output_dir: Option<&Path>,
        token: Option<&str>,
    ) -> Result<PathBuf, ProvisionError> {
        if let Some(path) = self.resolve_local(model_ref) {
            tracing::info!(path = %path.display(), "✅ Modelo encontrado localmente");
            return Ok(path);
        }

        let output_dir = output_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.default_dir(model_ref));

        let created = !output_dir.exists();
        std::fs::create_dir_all(&output_dir).map_err(|source| ProvisionError::Io {
            path: output_dir.clone(),
            source,
        })?;

        let token = token
            .map(str::to_string)
            .or_else(|| std::env::var(TOKEN_ENV).ok())
            .filter(|t| !t.is_empty());

        tracing::info!(
            model = model_ref,
            output = %output_dir.display(),
            authenticated = token.is_some(),
            "🔄 Descargando modelo"
        );

        let download = HubDownloader::new(token).and_then(|downloader| {
            downloader
                .with_endpoint(self.endpoint.clone())
                .download(model_ref, &output_dir)
        });

        if let Err(e) = download {
            tracing::error!(model = model_ref, error = %format!("{:#}", e), "❌ Error al descargar el modelo");
            // A partial directory would pass for a downloaded model next time
            if created {
                discard_partial(&output_dir);
            }
            return Err(ProvisionError::Download {
                model: model_ref.to_string(),
                reason: format!("{:#}", e),
            });
        }

        tracing::info!(path = %output_dir.display(), "✅ Modelo descargado");
        validate_model_dir(&output_dir);

        Ok(output_dir)
    }
}

fn discard_partial(dir: &Path) {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => tracing::debug!(dir = %dir.display(), "Removed incomplete model directory"),
        Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "Failed to remove incomplete model directory"),
    }
}

fn is_reserved_remote(model_ref: &str) -> bool {
    RESERVED_PREFIXES.iter().any(|p| model_ref.starts_with(p))
}

/// `is_model_available` against the default `models/` store
pub fn is_model_available(model_ref: &str) -> bool {
    ModelStore::default().is_model_available(model_ref)
}

/// `ensure_model_available` against the default `models/` store
pub fn ensure_model_available(
    model_ref: &str,
    output_dir: Option<&Path>,
    token: Option<&str>,
) -> Result<PathBuf, ProvisionError> {
    ModelStore::default().ensure_model_available(model_ref, output_dir, token)
}
