use std::path::{Path, PathBuf};

use tokenizers::{Tokenizer, TruncationParams};

use crate::constants::STUB_MODEL_PATH;

use super::error::EngineError;

/// Where an engine's weights come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineSource {
    /// Deterministic stub; `label` is the optional suffix of `stub:<label>`.
    Stub { label: Option<String> },
    /// A Hugging Face style model directory.
    Directory(PathBuf),
}

impl EngineSource {
    pub fn parse(path: &str) -> Self {
        let trimmed = path.trim();
        if trimmed == STUB_MODEL_PATH {
            return EngineSource::Stub { label: None };
        }
        if let Some(label) = trimmed.strip_prefix("stub:") {
            return EngineSource::Stub {
                label: Some(label.to_string()).filter(|l| !l.is_empty()),
            };
        }
        EngineSource::Directory(PathBuf::from(trimmed))
    }
}

/// The files a model directory must provide.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub weights: PathBuf,
    pub tokenizer: PathBuf,
}

impl ModelFiles {
    /// Checks that `config.json`, `model.safetensors` and `tokenizer.json` exist.
    pub fn locate(model_dir: &Path) -> Result<Self, EngineError> {
        if !model_dir.is_dir() {
            return Err(EngineError::ModelNotFound {
                path: model_dir.to_path_buf(),
            });
        }

        let files = Self {
            config: model_dir.join("config.json"),
            weights: model_dir.join("model.safetensors"),
            tokenizer: model_dir.join("tokenizer.json"),
        };

        for required in [&files.config, &files.weights, &files.tokenizer] {
            if !required.is_file() {
                return Err(EngineError::ModelLoadFailed {
                    reason: format!(
                        "Missing {} in {}",
                        required
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default(),
                        model_dir.display()
                    ),
                });
            }
        }

        Ok(files)
    }
}

/// Loads a tokenizer, optionally truncating inputs to `max_len` tokens.
///
/// Cross-encoders and encoders have a fixed position limit; pass `None` only for
/// a tokenizer used to count tokens.
pub fn load_tokenizer(path: &Path, max_len: Option<usize>) -> Result<Tokenizer, EngineError> {
    let mut tokenizer =
        Tokenizer::from_file(path).map_err(|e| EngineError::TokenizationFailed {
            reason: format!("Failed to load tokenizer {}: {}", path.display(), e),
        })?;

    let truncation = max_len.map(|max_length| TruncationParams {
        max_length,
        ..Default::default()
    });

    tokenizer
        .with_truncation(truncation)
        .map_err(|e| EngineError::TokenizationFailed {
            reason: format!("Failed to configure truncation: {}", e),
        })?;
    if max_len.is_none() {
        tokenizer.with_padding(None);
    }

    Ok(tokenizer)
}

/// Seeds a 64-bit state from text; shared by the stub engines.
pub(crate) fn stub_seed(label: Option<&str>, text: &str) -> u64 {
    use std::hash::{DefaultHasher, Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    label.hash(&mut hasher);
    text.hash(&mut hasher);
    hasher.finish()
}

/// Word count used as the stub tokenizer.
pub(crate) fn stub_token_count(text: &str) -> usize {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stub_identifiers() {
        assert_eq!(EngineSource::parse("stub"), EngineSource::Stub { label: None });
        assert_eq!(
            EngineSource::parse(" stub:bge "),
            EngineSource::Stub {
                label: Some("bge".to_string())
            }
        );
        assert_eq!(EngineSource::parse("stub:"), EngineSource::Stub { label: None });
        assert_eq!(
            EngineSource::parse("/models/stub"),
            EngineSource::Directory(PathBuf::from("/models/stub"))
        );
    }

    #[test]
    fn locate_reports_first_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "{}").unwrap();
        std::fs::write(dir.path().join("model.safetensors"), "").unwrap();

        match ModelFiles::locate(dir.path()) {
            Err(EngineError::ModelLoadFailed { reason }) => {
                assert!(reason.contains("tokenizer.json"), "got: {reason}")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn stub_token_count_ignores_punctuation() {
        assert_eq!(stub_token_count(""), 0);
        assert_eq!(stub_token_count("  ,, "), 0);
        assert_eq!(stub_token_count("don't stop"), 3);
    }
}
