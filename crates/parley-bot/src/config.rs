//! Loading [`ParleyConfig`] from a TOML file, CLI flags and the environment.
//!
//! Precedence, lowest first: built-in defaults, the TOML file, CLI flags.
//! The API key is only ever read from the environment.

use std::path::{Path, PathBuf};

use parley_rs::config::ParleyConfig;
use tracing::debug;

/// Environment variable holding the completion API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Settings given on the command line, applied over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub data_dir: Option<PathBuf>,
    pub model: Option<String>,
}

impl Overrides {
    pub fn apply(self, mut config: ParleyConfig) -> ParleyConfig {
        if let Some(dir) = self.data_dir {
            config.data_dir = dir;
        }
        if let Some(model) = self.model {
            config = config.with_model(model);
        }
        config
    }
}

/// Parse a config from TOML text.
pub fn parse_config(text: &str) -> Result<ParleyConfig, String> {
    toml::from_str(text).map_err(|e| format!("invalid config: {e}"))
}

/// Load the config file (if any), apply `overrides`, and validate.
pub fn load_config(path: Option<&Path>, overrides: Overrides) -> Result<ParleyConfig, String> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
            debug!("Loaded config from {}", path.display());
            parse_config(&text).map_err(|e| format!("{}: {e}", path.display()))?
        }
        None => ParleyConfig::default(),
    };
    let config = overrides.apply(config);
    config.validate()?;
    Ok(config)
}

/// The API key from [`API_KEY_ENV`], if set and non-empty.
pub fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .filter(|key| !key.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use parley_rs::api::ModelPricing;
    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn no_file_means_defaults() {
        let config = load_config(None, Overrides::default()).unwrap();
        assert_eq!(config, ParleyConfig::default());
    }

    #[test]
    fn file_values_and_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
data_dir = "/srv/parley"
model = "gpt-4o"
max_context_words = 500
utc_offset_minutes = 180

[pricing]
input_per_million = 1.0
output_per_million = 4.0

[templates]
context_label = "History:"
"#
        )
        .unwrap();

        let config = load_config(Some(file.path()), Overrides::default()).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/parley"));
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_context_words, 500);
        assert_eq!(config.max_history_depth, 1000);
        assert_eq!(config.utc_offset_minutes, 180);
        assert_eq!(config.pricing, Some(ModelPricing::new(1.0, 4.0)));
        assert_eq!(config.templates.context_label, "History:");

        let overridden = load_config(
            Some(file.path()),
            Overrides {
                data_dir: Some(PathBuf::from("/tmp/other")),
                model: Some("gpt-4o-mini".into()),
            },
        )
        .unwrap();
        assert_eq!(overridden.data_dir, PathBuf::from("/tmp/other"));
        assert_eq!(overridden.model, "gpt-4o-mini");
        assert_eq!(overridden.max_context_words, 500);
    }

    #[test]
    fn invalid_toml_is_reported_with_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "max_context_words = \"lots\"").unwrap();
        let err = load_config(Some(file.path()), Overrides::default()).unwrap_err();
        assert!(err.contains("invalid config"));
        assert!(err.contains(&file.path().display().to_string()));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = parse_config("max_completion_tokens = 0")
            .and_then(|c| c.validate().map(|_| c))
            .unwrap_err();
        assert!(err.contains("max_completion_tokens"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.toml")), Overrides::default())
            .unwrap_err();
        assert!(err.contains("failed to read"));
    }
}
