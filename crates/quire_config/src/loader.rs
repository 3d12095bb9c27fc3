//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::QuireConfig;
use std::path::Path;

/// Name of the configuration file within a project directory.
pub const CONFIG_FILE: &str = "quire.toml";

/// Loads and validates a `quire.toml` configuration from a project directory.
pub fn load_config(project_dir: &Path) -> Result<QuireConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
        path: config_path.clone(),
        source,
    })?;
    load_config_from_str(&content)
}

/// Parses and validates a `quire.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<QuireConfig, ConfigError> {
    let config: QuireConfig =
        toml::from_str(content).map_err(|e| ConfigError::Malformed {
            reason: e.to_string(),
        })?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and values are well formed.
fn validate_config(config: &QuireConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::Missing { key: "project.name" });
    }
    if config.paths.search.is_empty() {
        return Err(ConfigError::Missing { key: "paths.search" });
    }
    if let Some(index) = config.paths.search.iter().position(|p| p.is_empty()) {
        return Err(ConfigError::EmptySearchPath { index });
    }

    let extensions = [
        ("extensions.recognized", &config.extensions.recognized),
        ("extensions.concatenatable", &config.extensions.concatenatable),
    ];
    for (key, list) in extensions {
        if let Some(ext) = list.iter().find(|ext| !is_valid_extension(ext)) {
            return Err(ConfigError::InvalidExtension {
                key,
                extension: ext.clone(),
            });
        }
    }
    for (ext, mime) in &config.mime_types {
        if !is_valid_extension(ext) {
            return Err(ConfigError::InvalidExtension {
                key: "mime_types",
                extension: ext.clone(),
            });
        }
        let well_formed = mime
            .split_once('/')
            .is_some_and(|(kind, sub)| !kind.is_empty() && !sub.is_empty());
        if !well_formed {
            return Err(ConfigError::InvalidMimeType {
                extension: ext.clone(),
                mime_type: mime.clone(),
            });
        }
    }
    Ok(())
}

fn is_valid_extension(ext: &str) -> bool {
    !ext.trim_start_matches('.').is_empty() && !ext.contains('/')
}
