//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::schema::MirrorConfig;
use crate::config::validation::{validate_config, ValidationError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
}

/// Load a configuration from a TOML file without validating it, so
/// command-line overrides can be applied first.
pub fn read_config(path: &Path) -> Result<MirrorConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<MirrorConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mirror.toml");
        fs::write(&path, "[listener]\nbind_address = \"127.0.0.1:9000\"\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(load_config(&dir.path().join("missing.toml")), Err(ConfigError::Io { .. })));

        let path = dir.path().join("bad.toml");
        fs::write(&path, "[site\n").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Parse { .. })));

        fs::write(&path, "[site]\nprefixes = []\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("at least one prefix"));
        assert!(err.to_string().starts_with("invalid configuration: "));
    }
}
