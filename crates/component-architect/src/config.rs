use anyhow::{bail, Context, Result};
use gatekeeper::{CorrectionConfig, SamplingParams, ValidatorConfig, DEFAULT_MAX_ATTEMPTS};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "moonshotai/kimi-k2-instruct-0905";
pub const DEFAULT_DESIGN_SYSTEM: &str = "design-system.json";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Chat-completions endpoint settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub base_url: String,
    pub model: String,
    /// Bearer key; generation refuses to start without it
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

/// Top-level architect configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchitectConfig {
    pub provider: ProviderSettings,
    pub sampling: SamplingParams,
    pub max_attempts: u32,
    pub exempt_colors: Vec<String>,
    pub design_system: PathBuf,
}

impl Default for ArchitectConfig {
    fn default() -> Self {
        Self {
            provider: ProviderSettings {
                base_url: DEFAULT_BASE_URL.into(),
                model: DEFAULT_MODEL.into(),
                api_key: None,
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            },
            sampling: SamplingParams::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            exempt_colors: ValidatorConfig::default()
                .exempt_colors
                .into_iter()
                .filter(|c| c.starts_with('#'))
                .collect(),
            design_system: PathBuf::from(DEFAULT_DESIGN_SYSTEM),
        }
    }
}

/// Optional TOML overlay. Every field left out keeps its env/default value.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    design_system: Option<PathBuf>,
    #[serde(default)]
    provider: FileProvider,
    #[serde(default)]
    sampling: FileSampling,
    #[serde(default)]
    engine: FileEngine,
    #[serde(default)]
    validator: FileValidator,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileProvider {
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSampling {
    temperature: Option<f32>,
    top_p: Option<f32>,
    max_completion_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileEngine {
    max_attempts: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileValidator {
    exempt_colors: Option<Vec<String>>,
}

impl ArchitectConfig {
    /// Environment defaults, then the optional TOML file, then validation.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Some(path) = config_path {
            config.apply_file(path)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from a variable lookup. Blank values count as unset.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.provider.api_key = var("GROQ_API_KEY");
        if let Some(url) = var("ARCHITECT_BASE_URL") {
            config.provider.base_url = url;
        }
        if let Some(model) = var("ARCHITECT_MODEL") {
            config.provider.model = model;
        }
        if let Some(path) = var("ARCHITECT_DESIGN_SYSTEM") {
            config.design_system = PathBuf::from(path);
        }
        if let Some(raw) = var("ARCHITECT_MAX_ATTEMPTS") {
            config.max_attempts = raw
                .trim()
                .parse()
                .with_context(|| format!("ARCHITECT_MAX_ATTEMPTS is not a number: {raw}"))?;
        }
        if let Some(raw) = var("ARCHITECT_TIMEOUT_SECS") {
            config.provider.timeout_secs = raw
                .trim()
                .parse()
                .with_context(|| format!("ARCHITECT_TIMEOUT_SECS is not a number: {raw}"))?;
        }
        Ok(config)
    }

    /// Overlay values from a TOML file.
    pub fn apply_file(&mut self, path: &Path) -> Result<()> {
        let content =
            std::fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
        self.apply_toml(&content)
            .context(format!("Failed to parse config {}", path.display()))
    }

    fn apply_toml(&mut self, content: &str) -> Result<()> {
        let file: FileConfig = toml::from_str(content).context("Invalid config TOML")?;

        if let Some(path) = file.design_system {
            self.design_system = path;
        }
        if let Some(url) = file.provider.base_url {
            self.provider.base_url = url;
        }
        if let Some(model) = file.provider.model {
            self.provider.model = model;
        }
        if let Some(secs) = file.provider.timeout_secs {
            self.provider.timeout_secs = secs;
        }
        if let Some(t) = file.sampling.temperature {
            self.sampling.temperature = t;
        }
        if let Some(p) = file.sampling.top_p {
            self.sampling.top_p = p;
        }
        if let Some(n) = file.sampling.max_completion_tokens {
            self.sampling.max_completion_tokens = n;
        }
        if let Some(n) = file.engine.max_attempts {
            self.max_attempts = n;
        }
        if let Some(colors) = file.validator.exempt_colors {
            self.exempt_colors = colors;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.correction_config().validate()?;
        if self.provider.timeout_secs == 0 {
            bail!("provider timeout_secs must be at least 1");
        }
        if self.sampling.max_completion_tokens == 0 {
            bail!("max_completion_tokens must be at least 1");
        }
        if !self.provider.base_url.starts_with("http") {
            bail!("base_url must be an http(s) URL: {}", self.provider.base_url);
        }
        Ok(())
    }

    pub fn correction_config(&self) -> CorrectionConfig {
        CorrectionConfig {
            max_attempts: self.max_attempts,
            sampling: self.sampling,
        }
    }

    pub fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig::with_exempt_colors(&self.exempt_colors)
    }

    /// The API key, or an error explaining how to set it.
    pub fn require_api_key(&self) -> Result<&str> {
        self.provider
            .api_key
            .as_deref()
            .context("GROQ_API_KEY is not set. Add it to your environment or a .env file.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = ArchitectConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(config.provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.provider.model, DEFAULT_MODEL);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.provider.timeout_secs, 120);
        assert!(config.provider.api_key.is_none());
        assert!(config.require_api_key().is_err());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = ArchitectConfig::from_vars(vars(&[
            ("GROQ_API_KEY", "gsk-test"),
            ("ARCHITECT_MODEL", "llama-3.3-70b"),
            ("ARCHITECT_MAX_ATTEMPTS", "5"),
            ("ARCHITECT_DESIGN_SYSTEM", "themes/dark.json"),
        ]))
        .unwrap();
        assert_eq!(config.require_api_key().unwrap(), "gsk-test");
        assert_eq!(config.provider.model, "llama-3.3-70b");
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.design_system, PathBuf::from("themes/dark.json"));
    }

    #[test]
    fn test_blank_api_key_is_missing() {
        let config = ArchitectConfig::from_vars(vars(&[("GROQ_API_KEY", "  ")])).unwrap();
        assert!(config.provider.api_key.is_none());
    }

    #[test]
    fn test_bad_number_rejected() {
        let err = ArchitectConfig::from_vars(vars(&[("ARCHITECT_MAX_ATTEMPTS", "three")]))
            .unwrap_err();
        assert!(err.to_string().contains("ARCHITECT_MAX_ATTEMPTS"));
    }

    #[test]
    fn test_toml_overlay() {
        let mut config = ArchitectConfig::default();
        config
            .apply_toml(
                r##"
design_system = "brand.json"

[provider]
model = "qwen/qwen3-32b"
timeout_secs = 30

[sampling]
temperature = 0.2

[engine]
max_attempts = 4

[validator]
exempt_colors = ["#fff", "#f8fafc"]
"##,
            )
            .unwrap();

        assert_eq!(config.design_system, PathBuf::from("brand.json"));
        assert_eq!(config.provider.model, "qwen/qwen3-32b");
        assert_eq!(config.provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.provider.timeout_secs, 30);
        assert_eq!(config.sampling.temperature, 0.2);
        assert_eq!(config.sampling.top_p, 1.0);
        assert_eq!(config.max_attempts, 4);
        assert!(config
            .validator_config()
            .exempt_colors
            .contains(&"f8fafc".to_string()));
    }

    #[test]
    fn test_toml_unknown_key_rejected() {
        let mut config = ArchitectConfig::default();
        assert!(config.apply_toml("[engine]\nretries = 2\n").is_err());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let config = ArchitectConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("architect.toml");
        std::fs::write(&path, "[engine]\nmax_attempts = 2\n").unwrap();
        let mut config = ArchitectConfig::default();
        config.apply_file(&path).unwrap();
        assert_eq!(config.max_attempts, 2);
    }
}
