//! Design system loading.
//!
//! The design system document is loaded once per process and shared read-only
//! between the prompt builder and the validator.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ArchitectError, ArchitectResult};

static COLOR_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(#[0-9a-f]{3,8}|rgba?\([^)]+\))$").expect("COLOR_VALUE regex should compile")
});

/// Token categories. Colors and effects are required; the rest are passed
/// through to prompts untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignTokens {
    pub colors: BTreeMap<String, String>,
    pub effects: BTreeMap<String, String>,
    #[serde(default)]
    pub typography: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub spacing: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub borders: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub breakpoints: BTreeMap<String, serde_json::Value>,
}

/// The full design system document: tokens plus Tailwind class mappings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignSystem {
    pub tokens: DesignTokens,
    #[serde(default)]
    pub tailwind_classes: BTreeMap<String, serde_json::Value>,
}

impl DesignSystem {
    /// Load and check a design system JSON file.
    pub fn from_file(path: &Path) -> ArchitectResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ArchitectError::io(path, e))?;
        let system = Self::from_json(&content)?;
        tracing::info!(
            path = %path.display(),
            colors = system.tokens.colors.len(),
            effects = system.tokens.effects.len(),
            "Loaded design system"
        );
        Ok(system)
    }

    /// Parse and check a design system from JSON text.
    pub fn from_json(json: &str) -> ArchitectResult<Self> {
        let system: DesignSystem =
            serde_json::from_str(json).map_err(|e| ArchitectError::InvalidDesignSystem {
                message: e.to_string(),
            })?;
        system.check()?;
        Ok(system)
    }

    /// Every color value must be a hex literal or an rgb()/rgba() literal.
    pub fn check(&self) -> ArchitectResult<()> {
        for (name, value) in &self.tokens.colors {
            if !COLOR_VALUE.is_match(value.trim()) {
                return Err(ArchitectError::InvalidDesignSystem {
                    message: format!("color token '{name}' has non-color value '{value}'"),
                });
            }
        }
        Ok(())
    }

    /// Lower-cased color values, each also without its leading `#`.
    pub fn allowed_colors(&self) -> Vec<String> {
        let mut allowed = Vec::with_capacity(self.tokens.colors.len() * 2);
        for value in self.tokens.colors.values() {
            let lower = value.to_lowercase();
            if let Some(bare) = lower.strip_prefix('#') {
                allowed.push(bare.to_string());
            }
            allowed.push(lower);
        }
        allowed
    }

    /// Compact JSON of the whole document, used for verbatim literal lookups.
    pub fn serialized(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn tokens_json_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.tokens).unwrap_or_default()
    }

    pub fn tailwind_json_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.tailwind_classes).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r##"{
        "tokens": {
            "colors": { "primary": "#6366F1", "overlay": "rgba(0, 0, 0, 0.5)" },
            "effects": { "glass-bg": "rgba(255, 255, 255, 0.08)" }
        }
    }"##;

    #[test]
    fn test_optional_categories_default_empty() {
        let ds = DesignSystem::from_json(MINIMAL).unwrap();
        assert!(ds.tokens.typography.is_empty());
        assert!(ds.tailwind_classes.is_empty());
    }

    #[test]
    fn test_allowed_colors_include_bare_and_lowercase() {
        let ds = DesignSystem::from_json(MINIMAL).unwrap();
        let allowed = ds.allowed_colors();
        assert!(allowed.contains(&"#6366f1".to_string()));
        assert!(allowed.contains(&"6366f1".to_string()));
        assert!(allowed.contains(&"rgba(0, 0, 0, 0.5)".to_string()));
    }

    #[test]
    fn test_rejects_non_color_value() {
        let json = r#"{"tokens": {"colors": {"primary": "blue"}, "effects": {}}}"#;
        let err = DesignSystem::from_json(json).unwrap_err();
        assert!(err.to_string().contains("primary"));
    }

    #[test]
    fn test_rejects_missing_effects() {
        let json = r##"{"tokens": {"colors": {"primary": "#fff"}}}"##;
        assert!(matches!(
            DesignSystem::from_json(json),
            Err(ArchitectError::InvalidDesignSystem { .. })
        ));
    }

    #[test]
    fn test_from_file_missing_path_is_io_error() {
        let err = DesignSystem::from_file(Path::new("/nonexistent/design-system.json"))
            .unwrap_err();
        assert!(matches!(err, ArchitectError::Io { .. }));
    }
}
