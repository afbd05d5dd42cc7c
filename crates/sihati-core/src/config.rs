use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::reasoning::RetryPolicy;

pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/";
pub const MIN_API_KEY_LEN: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("API key is missing: set GEMINI_API_KEY or reasoning.api_key")]
    MissingApiKey,
    #[error("API key looks malformed (expected at least {MIN_API_KEY_LEN} characters)")]
    MalformedApiKey,
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Reasoning service connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    /// Never written back out
    #[serde(skip_serializing)]
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub connect_timeout_seconds: u32,
    /// Deadline for each individual attempt
    pub request_timeout_seconds: u32,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub retry: RetryPolicy,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_seconds: 30,
            request_timeout_seconds: 180,
            temperature: 0.1,
            max_output_tokens: 8192,
            retry: RetryPolicy::default(),
        }
    }
}

impl ReasoningConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.connect_timeout_seconds))
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.request_timeout_seconds))
    }
}

/// Text extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Text-layer output shorter than this triggers OCR
    pub min_text_chars: usize,
    /// Rasterization factor over 72 dpi
    pub ocr_scale: u32,
    pub ocr_languages: String,
    pub max_file_size_mb: u64,
    pub tesseract_cmd: PathBuf,
    pub pdftoppm_cmd: PathBuf,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_text_chars: 100,
            ocr_scale: 2,
            ocr_languages: "ind+eng".to_string(),
            max_file_size_mb: 50,
            tesseract_cmd: PathBuf::from("tesseract"),
            pdftoppm_cmd: PathBuf::from("pdftoppm"),
        }
    }
}

impl ExtractionConfig {
    #[must_use]
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }

    #[must_use]
    pub fn ocr_dpi(&self) -> u32 {
        self.ocr_scale.saturating_mul(72)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub max_excerpt_chars: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_excerpt_chars: 6000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub max_concurrent_entities: usize,
    /// Minimum normalized Levenshtein similarity for a reported entity name
    /// to be mapped onto a known one
    pub name_match_threshold: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_entities: 1,
            name_match_threshold: crate::overlap::DEFAULT_NAME_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SihatiConfig {
    pub reasoning: ReasoningConfig,
    pub extraction: ExtractionConfig,
    pub budget: BudgetConfig,
    pub pipeline: PipelineConfig,
}

impl SihatiConfig {
    /// `<config_dir>/sihati/config.json`
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sihati").join("config.json"))
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads the explicit file if given, else the default file when it
    /// exists, else defaults; then applies environment overrides.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(default) => {
                    tracing::debug!(path = %default.display(), "Loading default config file");
                    Self::from_file(&default)?
                }
                None => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies overrides from a variable lookup (normally the process
    /// environment). Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("GEMINI_API_KEY") {
            self.reasoning.api_key = key.trim().to_string();
        }
        if let Some(model) = get("SIHATI_MODEL") {
            self.reasoning.model = model.trim().to_string();
        }
        if let Some(url) = get("SIHATI_BASE_URL") {
            self.reasoning.base_url = url.trim().to_string();
        }
        if let Some(timeout) = get("SIHATI_REQUEST_TIMEOUT") {
            self.reasoning.request_timeout_seconds =
                timeout.trim().parse().map_err(|_| ConfigError::Invalid {
                    key: "SIHATI_REQUEST_TIMEOUT",
                    reason: format!("not a number of seconds: {timeout}"),
                })?;
        }
        if let Some(languages) = get("SIHATI_OCR_LANGUAGES") {
            self.extraction.ocr_languages = languages.trim().to_string();
        }
        if let Some(size) = get("MAX_FILE_SIZE_MB") {
            self.extraction.max_file_size_mb =
                size.trim().parse().map_err(|_| ConfigError::Invalid {
                    key: "MAX_FILE_SIZE_MB",
                    reason: format!("not a number of megabytes: {size}"),
                })?;
        }
        if let Some(cmd) = get("TESSERACT_CMD") {
            self.extraction.tesseract_cmd = PathBuf::from(cmd.trim());
        }

        Ok(())
    }

    /// Checks everything a full analysis run needs, including the API key.
    pub fn validate(&self) -> ConfigResult<()> {
        let key = self.reasoning.api_key.trim();
        if key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if key.len() < MIN_API_KEY_LEN {
            return Err(ConfigError::MalformedApiKey);
        }

        Url::parse(&self.reasoning.base_url).map_err(|e| ConfigError::Invalid {
            key: "reasoning.base_url",
            reason: e.to_string(),
        })?;

        if self.reasoning.model.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "reasoning.model",
                reason: "must not be empty".to_string(),
            });
        }
        if model_info(&self.reasoning.model).is_none() {
            tracing::warn!(model = %self.reasoning.model, "Model is not in the known catalogue");
        }

        let positive = [
            ("reasoning.request_timeout_seconds", self.reasoning.request_timeout_seconds as usize),
            ("reasoning.max_output_tokens", self.reasoning.max_output_tokens as usize),
            ("extraction.ocr_scale", self.extraction.ocr_scale as usize),
            ("budget.max_excerpt_chars", self.budget.max_excerpt_chars),
            ("pipeline.max_concurrent_entities", self.pipeline.max_concurrent_entities),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    key,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if self.reasoning.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "reasoning.retry.max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

/// Entry in the static model catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub cost: &'static str,
    pub speed: &'static str,
    pub recommended: bool,
}

pub const KNOWN_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "gemini-2.5-pro",
        name: "Gemini 2.5 Pro",
        description: "Most capable model for complex reasoning and long documents",
        cost: "high",
        speed: "slow",
        recommended: true,
    },
    ModelInfo {
        id: "gemini-2.5-flash",
        name: "Gemini 2.5 Flash",
        description: "Fast model with a good balance of quality and cost",
        cost: "medium",
        speed: "fast",
        recommended: false,
    },
    ModelInfo {
        id: "gemma-3n-e2b-it",
        name: "Gemma 3n E2B",
        description: "Small open model for quick, low-cost runs",
        cost: "low",
        speed: "very fast",
        recommended: false,
    },
];

#[must_use]
pub fn model_info(id: &str) -> Option<&'static ModelInfo> {
    KNOWN_MODELS.iter().find(|m| m.id == id.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn valid() -> SihatiConfig {
        let mut config = SihatiConfig::default();
        config.reasoning.api_key = "AIzaSyA-0123456789abcdefgh".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = SihatiConfig::default();

        assert_eq!(config.reasoning.model, "gemini-2.5-pro");
        assert_eq!(config.reasoning.request_timeout(), Duration::from_secs(180));
        assert_eq!(config.extraction.min_text_chars, 100);
        assert_eq!(config.extraction.ocr_dpi(), 144);
        assert_eq!(config.extraction.ocr_languages, "ind+eng");
        assert_eq!(config.extraction.max_file_size_bytes(), 50 * 1024 * 1024);
        assert_eq!(config.budget.max_excerpt_chars, 6000);
        assert_eq!(config.pipeline.max_concurrent_entities, 1);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = SihatiConfig::default();
        config
            .apply_env(env(&[
                ("GEMINI_API_KEY", " secret-key-0123456789abc "),
                ("SIHATI_MODEL", "gemini-2.5-flash"),
                ("MAX_FILE_SIZE_MB", "10"),
                ("TESSERACT_CMD", "/opt/tesseract/bin/tesseract"),
                ("SIHATI_OCR_LANGUAGES", ""),
            ]))
            .unwrap();

        assert_eq!(config.reasoning.api_key, "secret-key-0123456789abc");
        assert_eq!(config.reasoning.model, "gemini-2.5-flash");
        assert_eq!(config.extraction.max_file_size_mb, 10);
        assert_eq!(
            config.extraction.tesseract_cmd,
            PathBuf::from("/opt/tesseract/bin/tesseract")
        );
        assert_eq!(config.extraction.ocr_languages, "ind+eng");
    }

    #[test]
    fn test_env_rejects_bad_numbers() {
        let mut config = SihatiConfig::default();
        let result = config.apply_env(env(&[("SIHATI_REQUEST_TIMEOUT", "soon")]));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { key: "SIHATI_REQUEST_TIMEOUT", .. })
        ));
    }

    #[test]
    fn test_validate_api_key() {
        assert!(matches!(
            SihatiConfig::default().validate(),
            Err(ConfigError::MissingApiKey)
        ));

        let mut config = SihatiConfig::default();
        config.reasoning.api_key = "short".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::MalformedApiKey)));

        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = valid();
        config.pipeline.max_concurrent_entities = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "pipeline.max_concurrent_entities", .. })
        ));

        let mut config = valid();
        config.budget.max_excerpt_chars = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.reasoning.base_url = "not a url".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "reasoning.base_url", .. })
        ));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"budget": {{"max_excerpt_chars": 9000}}, "reasoning": {{"retry": {{"max_attempts": 5}}}}}}"#
        )
        .unwrap();

        let config = SihatiConfig::from_file(file.path()).unwrap();

        assert_eq!(config.budget.max_excerpt_chars, 9000);
        assert_eq!(config.reasoning.retry.max_attempts, 5);
        assert_eq!(config.reasoning.retry.initial_delay_ms, 750);
        assert_eq!(config.reasoning.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_api_key_is_not_serialized() {
        let json = serde_json::to_value(valid()).unwrap();
        assert!(json["reasoning"].get("api_key").is_none());
    }

    #[test]
    fn test_model_catalogue() {
        assert!(model_info("gemini-2.5-pro").is_some_and(|m| m.recommended));
        assert!(model_info("gpt-4").is_none());
        assert_eq!(KNOWN_MODELS.iter().filter(|m| m.recommended).count(), 1);
    }
}
