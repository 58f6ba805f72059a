//! User configuration loaded from `~/.quill/config.toml`.

use std::{env, path::PathBuf};

use serde::Deserialize;

use quill_engine::EngineConfig;

/// On-disk configuration. Every section is optional; a missing file is
/// the same as an empty one.
#[derive(Debug, Default, Deserialize)]
pub struct QuillConfig {
    pub app: Option<AppConfig>,
    pub api_keys: Option<ApiKeys>,
    pub project: Option<ProjectConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiKeys {
    pub gemini: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProjectConfig {
    /// Directory the session's files live under. Relative paths are
    /// resolved against the current working directory.
    pub root: Option<PathBuf>,
    /// Segment stripped from absolute-looking paths the model emits.
    pub root_marker: Option<String>,
}

impl QuillConfig {
    pub fn load() -> Option<Self> {
        let path = config_path()?;
        if !path.exists() {
            return None;
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return None;
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Some(config),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                None
            }
        }
    }

    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// API key from the config file (with `${VAR}` expansion) or the
    /// `GEMINI_API_KEY` environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(raw) = self.api_keys.as_ref().and_then(|k| k.gemini.as_deref()) {
            let expanded = expand_env_vars(raw);
            if !expanded.trim().is_empty() {
                return Some(expanded);
            }
        }
        env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    /// Engine settings with config-file overrides applied to defaults.
    pub fn engine_config(&self) -> EngineConfig {
        let mut engine = EngineConfig::default();
        if let Some(app) = &self.app {
            if let Some(model) = &app.model {
                engine.model.clone_from(model);
            }
            if let Some(temperature) = app.temperature {
                engine.temperature = temperature;
            }
            if let Some(max_output_tokens) = app.max_output_tokens {
                engine.max_output_tokens = max_output_tokens;
            }
        }
        if let Some(marker) = self.project.as_ref().and_then(|p| p.root_marker.as_ref()) {
            engine.root_marker.clone_from(marker);
        }
        engine
    }

    pub fn project_root(&self) -> Option<PathBuf> {
        self.project.as_ref().and_then(|p| p.root.clone())
    }
}

fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".quill").join("config.toml"))
}

/// Replace `${VAR}` references with their environment values; unset
/// variables expand to the empty string.
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut i = 0;

    while i < value.len() {
        if value[i..].starts_with("${") {
            let start = i + 2;
            if let Some(end_rel) = value[start..].find('}') {
                let end = start + end_rel;
                let var = &value[start..end];
                if !var.is_empty() {
                    let replacement = env::var(var).unwrap_or_default();
                    out.push_str(&replacement);
                }
                i = end + 1;
                continue;
            }
        }

        let ch = value[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }

    out
}
