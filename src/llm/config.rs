use log::warn;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-latest";
pub const DEFAULT_MAX_TOKENS: u32 = 350;
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
}

impl LlmProvider {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "openai" => Some(LlmProvider::OpenAi),
            "anthropic" => Some(LlmProvider::Anthropic),
            _ => None,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => DEFAULT_OPENAI_MODEL,
            LlmProvider::Anthropic => DEFAULT_ANTHROPIC_MODEL,
        }
    }
}

#[derive(Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl LlmConfig {
    pub fn new(provider: LlmProvider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            model: provider.default_model().to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Reads `MODEL_PROVIDER` (default `openai`) and that provider's key and model
    /// variables. `None` means recommendations are switched off.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider_name = lookup("MODEL_PROVIDER").unwrap_or_else(|| "openai".to_string());
        let Some(provider) = LlmProvider::parse(&provider_name) else {
            warn!(
                "Unknown MODEL_PROVIDER '{}'; recommendations disabled",
                provider_name
            );
            return None;
        };

        let (key_var, model_var) = match provider {
            LlmProvider::OpenAi => ("OPENAI_API_KEY", "OPENAI_MODEL"),
            LlmProvider::Anthropic => ("ANTHROPIC_API_KEY", "ANTHROPIC_MODEL"),
        };

        let api_key = lookup(key_var).filter(|k| !k.trim().is_empty())?;
        let mut config = Self::new(provider, api_key);
        if let Some(model) = lookup(model_var).filter(|m| !m.trim().is_empty()) {
            config.model = model;
        }

        Some(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_to_openai() {
        let config = LlmConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.provider, LlmProvider::OpenAi);
        assert_eq!(config.model, DEFAULT_OPENAI_MODEL);
    }

    #[test]
    fn test_anthropic_with_model_override() {
        let config = LlmConfig::from_lookup(lookup(&[
            ("MODEL_PROVIDER", "Anthropic"),
            ("ANTHROPIC_API_KEY", "key"),
            ("ANTHROPIC_MODEL", "claude-custom"),
        ]))
        .unwrap();
        assert_eq!(config.provider, LlmProvider::Anthropic);
        assert_eq!(config.model, "claude-custom");
    }

    #[test]
    fn test_missing_key_disables() {
        assert!(LlmConfig::from_lookup(lookup(&[])).is_none());
        assert!(LlmConfig::from_lookup(lookup(&[
            ("MODEL_PROVIDER", "anthropic"),
            ("OPENAI_API_KEY", "sk-test"),
        ]))
        .is_none());
        assert!(LlmConfig::from_lookup(lookup(&[
            ("MODEL_PROVIDER", "mystery"),
            ("OPENAI_API_KEY", "sk-test"),
        ]))
        .is_none());
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = LlmConfig::new(LlmProvider::OpenAi, "sk-secret");
        assert!(!format!("{:?}", config).contains("sk-secret"));
    }
}
