use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Physician Notetaker";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Local Ollama instance used for SOAP generation.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_GENERATOR_MODEL: &str = "medgemma:4b";

/// Hosted zero-shot classification endpoint (Hugging Face inference API).
pub const DEFAULT_ZERO_SHOT_URL: &str = "https://api-inference.huggingface.co";
pub const DEFAULT_ZERO_SHOT_MODEL: &str = "facebook/bart-large-mnli";

/// Timeout applied to zero-shot HTTP calls (generation has its own, per request).
pub const DEFAULT_CLASSIFIER_TIMEOUT_SECS: u64 = 60;

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "notetaker=info,warn"
}

/// Where the model providers live and which models to ask for.
///
/// Read once at startup; the pipeline itself never touches the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub ollama_url: String,
    pub generator_model: String,
    pub zero_shot_url: String,
    pub zero_shot_model: String,
    pub zero_shot_token: Option<String>,
    /// Optional JSON file with `PipelineConfig` overrides.
    pub pipeline_config_path: Option<PathBuf>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            generator_model: DEFAULT_GENERATOR_MODEL.to_string(),
            zero_shot_url: DEFAULT_ZERO_SHOT_URL.to_string(),
            zero_shot_model: DEFAULT_ZERO_SHOT_MODEL.to_string(),
            zero_shot_token: None,
            pipeline_config_path: None,
        }
    }
}

impl ProviderSettings {
    /// Build settings from `NOTETAKER_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            ollama_url: get("NOTETAKER_OLLAMA_URL").unwrap_or(defaults.ollama_url),
            generator_model: get("NOTETAKER_GENERATOR_MODEL").unwrap_or(defaults.generator_model),
            zero_shot_url: get("NOTETAKER_ZERO_SHOT_URL").unwrap_or(defaults.zero_shot_url),
            zero_shot_model: get("NOTETAKER_ZERO_SHOT_MODEL").unwrap_or(defaults.zero_shot_model),
            zero_shot_token: get("HF_API_TOKEN"),
            pipeline_config_path: get("NOTETAKER_CONFIG").map(PathBuf::from),
        }
    }
}
