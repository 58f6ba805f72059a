//! Engine-level settings.

use serde::Deserialize;

use quill_providers::GenerationConfig;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_ROOT_MARKER: &str = "my-project";

/// Tunable knobs for a [`crate::Session`].
///
/// Deserializable so callers can load it straight from a config file;
/// every field has a default, so an empty table is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Model identifier passed to the provider.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Hard cap on generated tokens per turn.
    pub max_output_tokens: u32,
    /// Directory-name segment treated as the project root when
    /// normalizing paths the model emits.
    pub root_marker: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let generation = GenerationConfig::default();
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: generation.temperature,
            max_output_tokens: generation.max_output_tokens,
            root_marker: DEFAULT_ROOT_MARKER.to_string(),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn generation(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_MODEL, EngineConfig};

    #[test]
    fn empty_table_deserializes_to_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.root_marker, "my-project");
    }

    #[test]
    fn partial_table_keeps_remaining_defaults() {
        let config: EngineConfig =
            toml::from_str("model = \"gemini-2.5-pro\"\ntemperature = 0.2\n").unwrap();
        assert_eq!(config.model, "gemini-2.5-pro");
        assert!((config.temperature - 0.2).abs() < f64::EPSILON);
        assert_eq!(config.max_output_tokens, 8192);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<EngineConfig>("modle = \"x\"\n").is_err());
    }
}
