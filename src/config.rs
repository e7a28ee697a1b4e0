use std::fmt;

pub const BASE_URL_ENV: &str = "MODEL_BASE_URL";
pub const API_KEY_ENV: &str = "MODEL_API_KEY";
pub const MODEL_NAME_ENV: &str = "MODEL_NAME";
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Language model settings for the agent that consumes filtered tools.
///
/// A custom OpenAI-compatible endpoint is used only when both the base URL
/// and the API key are set; otherwise the provider's default endpoint applies.
#[derive(Clone, PartialEq, Eq)]
pub struct ModelConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model_name: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            model_name: DEFAULT_MODEL.into(),
        }
    }
}

impl ModelConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            base_url: get(BASE_URL_ENV),
            api_key: get(API_KEY_ENV),
            model_name: get(MODEL_NAME_ENV).unwrap_or_else(|| DEFAULT_MODEL.into()),
        }
    }

    pub fn uses_custom_provider(&self) -> bool {
        self.base_url.is_some() && self.api_key.is_some()
    }

    /// The model to run: an explicit per-agent override, else the configured default.
    pub fn model_for<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested.unwrap_or(&self.model_name)
    }
}

fn configured(value: &Option<String>) -> &'static str {
    if value.is_some() {
        "configured"
    } else {
        "not configured"
    }
}

// Never print the key.
impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &configured(&self.api_key))
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl fmt::Display for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "- {MODEL_NAME_ENV}: {}", self.model_name)?;
        writeln!(f, "- {BASE_URL_ENV}: {}", configured(&self.base_url))?;
        write!(f, "- {API_KEY_ENV}: {}", configured(&self.api_key))
    }
}
