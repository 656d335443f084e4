use crate::config::schema::{RefactorConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// File name searched for by [`discover`].
pub const CONFIG_FILE_NAME: &str = ".cpp-refactor.toml";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Io { .. } => self,
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config from {}: {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse config TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse config TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid config ({}): {}", path.display(), source),
                None => write!(f, "invalid config: {}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

pub fn load_from_str(input: &str) -> Result<RefactorConfig, ConfigError> {
    let config: RefactorConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<RefactorConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// Nearest [`CONFIG_FILE_NAME`] in `start` or one of its ancestors.
pub fn discover(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleId;
    use tempfile::TempDir;

    #[test]
    fn parses_every_section() {
        let config = load_from_str(
            r#"
[rules]
range-loop-reference = false

[override]
final-counts-as-override = false

[includes]
follow = true
search-paths = ["include"]
system-paths = ["/usr/include"]
max-depth = 3

[output]
verify-syntax = false
"#,
        )
        .unwrap();

        assert!(!config.is_enabled(RuleId::RangeLoopReference));
        assert!(config.is_enabled(RuleId::VirtualDestructor));
        assert!(!config.override_rule.final_counts_as_override);
        assert_eq!(config.includes.search_paths, vec![PathBuf::from("include")]);
        assert_eq!(config.includes.max_depth, 3);
        assert!(!config.output.verify_syntax);
    }

    #[test]
    fn empty_file_is_the_default() {
        assert_eq!(load_from_str("").unwrap(), RefactorConfig::default());
    }

    #[test]
    fn unknown_keys_are_toml_errors() {
        let err = load_from_str("[output]\ncolour = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml { path: None, .. }));
    }

    #[test]
    fn validation_errors_carry_the_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[rules]\nvirtual-destructr = true\n").unwrap();

        let err = load_from_path(&path).unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, ConfigError::Validation { path: Some(_), .. }));
        assert!(message.contains("did you mean 'virtual-destructor'?"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_from_path("/no/such/dir/.cpp-refactor.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn discovers_config_in_an_ancestor() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "").unwrap();

        assert_eq!(discover(&nested), Some(dir.path().join(CONFIG_FILE_NAME)));
    }
}
