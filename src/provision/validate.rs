// Best-effort trial load of a downloaded model directory
//
// Nothing here is fatal: the model worker loads the weights again with its
// own optimized path, so failures are only reported.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Upper bound on a safetensors JSON header
const MAX_HEADER_BYTES: u64 = 100_000_000;

#[derive(Debug, Clone)]
pub struct ValidationCheck {
    pub name: String,
    pub outcome: Result<(), String>,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub checks: Vec<ValidationCheck>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.checks.iter().all(|c| c.outcome.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ValidationCheck> {
        self.checks.iter().filter(|c| c.outcome.is_err())
    }

    fn record(&mut self, name: &str, outcome: Result<()>) {
        match &outcome {
            Ok(()) => tracing::info!(check = name, "✅ Model check passed"),
            Err(e) => tracing::warn!(check = name, error = %e, "⚠️ Model check failed"),
        }
        self.checks.push(ValidationCheck {
            name: name.to_string(),
            outcome: outcome.map_err(|e| format!("{:#}", e)),
        });
    }
}

/// Validate config, tokenizer and weight files in `dir`
pub fn validate_model_dir(dir: &Path) -> ValidationReport {
    tracing::info!(dir = %dir.display(), "🔍 Verificando modelo...");

    let mut report = ValidationReport::default();
    report.record("config", check_config(dir));
    report.record("tokenizer", check_tokenizer(dir));
    report.record("weights", check_weights(dir));

    if !report.is_clean() {
        tracing::warn!(
            "Model validation incomplete; this can be normal on low-memory machines, \
             the worker loads the model again with optimized settings"
        );
    }

    report
}

fn check_config(dir: &Path) -> Result<()> {
    let path = dir.join("config.json");
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&contents).context("config.json is not valid JSON")?;

    if value.get("model_type").is_none() && value.get("architectures").is_none() {
        bail!("config.json has neither model_type nor architectures");
    }
    Ok(())
}

fn check_tokenizer(dir: &Path) -> Result<()> {
    let fast = dir.join("tokenizer.json");
    if fast.exists() {
        let tokenizer = tokenizers::Tokenizer::from_file(&fast)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer.json: {}", e))?;
        tracing::debug!(vocab = tokenizer.get_vocab_size(true), "Tokenizer loaded");
        return Ok(());
    }

    // SentencePiece-only repos (the Vicuna family) ship tokenizer.model
    if dir.join("tokenizer.model").exists() {
        return Ok(());
    }

    bail!("No tokenizer.json or tokenizer.model found")
}

fn check_weights(dir: &Path) -> Result<()> {
    let safetensors = files_with_extension(dir, "safetensors")?;
    for path in &safetensors {
        check_safetensors_header(path)?;
    }

    if safetensors.is_empty() && files_with_extension(dir, "bin")?.is_empty() {
        bail!("No weight files (*.safetensors or *.bin) found");
    }
    Ok(())
}

fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let pattern = dir.join(format!("*.{}", extension));
    let pattern = pattern.to_string_lossy();
    let paths = glob::glob(&pattern)
        .with_context(|| format!("Invalid glob pattern: {}", pattern))?
        .filter_map(|entry| entry.ok())
        .collect();
    Ok(paths)
}

#[derive(serde::Deserialize)]
struct TensorEntry {
    data_offsets: [u64; 2],
}

/// Read only the JSON header and check the file is long enough for it
fn check_safetensors_header(path: &Path) -> Result<()> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let file_len = file.metadata()?.len();

    let mut len_bytes = [0u8; 8];
    file.read_exact(&mut len_bytes)
        .with_context(|| format!("{} is truncated", path.display()))?;
    let header_len = u64::from_le_bytes(len_bytes);
    if header_len > MAX_HEADER_BYTES || header_len + 8 > file_len {
        bail!("{} has an invalid header length", path.display());
    }

    let mut header = vec![0u8; header_len as usize];
    file.read_exact(&mut header)?;

    let entries: HashMap<String, serde_json::Value> = serde_json::from_slice(&header)
        .with_context(|| format!("{} header is not valid JSON", path.display()))?;

    let mut data_end = 0u64;
    for (name, value) in entries {
        if name == "__metadata__" {
            continue;
        }
        let entry: TensorEntry = serde_json::from_value(value)
            .with_context(|| format!("Tensor {} has no data_offsets", name))?;
        data_end = data_end.max(entry.data_offsets[1]);
    }

    // Offsets come from the file itself and may be garbage
    let expected_len = (8 + header_len)
        .checked_add(data_end)
        .with_context(|| format!("{} declares tensor offsets past any file size", path.display()))?;
    if expected_len > file_len {
        bail!("{} is incomplete (expected {} bytes)", path.display(), expected_len);
    }
    Ok(())
}
