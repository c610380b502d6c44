//! Static configuration for the crawler
//!
//! Configuration is a flat, string-valued JSON object. The crawler consumes
//! exactly two required keys: `init_query`, a URL template whose `{key}`
//! placeholders are substituted against this same mapping, and `root_dir`,
//! the base path for persisted results. Everything else (API tokens,
//! usernames, an optional `port`) exists only for substitution or for the
//! server collaborator. Missing required keys are fatal at startup.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Default listen port when the config carries no `port` key
pub const DEFAULT_PORT: u16 = 9090;

/// Errors raised while loading or interpreting configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("cannot read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config file is not a flat JSON object of strings
    #[error("cannot parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A required key is absent
    #[error("missing required config key '{0}'")]
    MissingKey(&'static str),

    /// `init_query` references a placeholder with no matching config key
    #[error("init_query references unknown config key '{0}'")]
    UnknownPlaceholder(String),

    /// `init_query` has an unclosed `{` placeholder
    #[error("init_query has an unterminated placeholder")]
    UnterminatedPlaceholder,

    /// A key holds a value that cannot be interpreted
    #[error("invalid value '{value}' for config key '{key}'")]
    InvalidValue { key: &'static str, value: String },
}

/// Flat key/value configuration mapping
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    values: BTreeMap<String, String>,
}

impl Config {
    /// Loads configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Builds a configuration directly from key/value pairs
    pub fn from_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: values
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// Looks up a raw config value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn require(&self, key: &'static str) -> Result<&str, ConfigError> {
        self.get(key).ok_or(ConfigError::MissingKey(key))
    }

    /// The initial query URL, with `{key}` placeholders substituted against
    /// this mapping. `{{` and `}}` escape literal braces.
    pub fn init_query(&self) -> Result<String, ConfigError> {
        let template = self.require("init_query")?;
        self.render(template)
    }

    /// Base directory for persisted results
    pub fn root_dir(&self) -> Result<PathBuf, ConfigError> {
        self.require("root_dir").map(PathBuf::from)
    }

    /// Listen port for the status server, defaulting to 9090
    pub fn port(&self) -> Result<u16, ConfigError> {
        match self.get("port") {
            None => Ok(DEFAULT_PORT),
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "port",
                value: value.to_string(),
            }),
        }
    }

    /// Substitutes `{key}` placeholders in a template against this mapping
    fn render(&self, template: &str) -> Result<String, ConfigError> {
        let mut out = String::with_capacity(template.len());
        let mut chars = template.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let mut key = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => key.push(ch),
                            None => return Err(ConfigError::UnterminatedPlaceholder),
                        }
                    }
                    let value = self
                        .get(&key)
                        .ok_or(ConfigError::UnknownPlaceholder(key))?;
                    out.push_str(value);
                }
                ch => out.push(ch),
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_config() -> Config {
        Config::from_values([
            (
                "init_query",
                "https://api.example.com/users/{username}/collection/releases?token={token}",
            ),
            ("username", "alice"),
            ("token", "s3cret"),
            ("root_dir", "/var/lib/pagewalk"),
        ])
    }

    #[test]
    fn test_init_query_substitutes_placeholders() {
        let config = sample_config();
        assert_eq!(
            config.init_query().unwrap(),
            "https://api.example.com/users/alice/collection/releases?token=s3cret"
        );
    }

    #[test]
    fn test_init_query_missing_key_is_fatal() {
        let config = Config::from_values([("root_dir", "/tmp")]);
        assert!(matches!(
            config.init_query(),
            Err(ConfigError::MissingKey("init_query"))
        ));
    }

    #[test]
    fn test_init_query_unknown_placeholder_is_fatal() {
        let config = Config::from_values([
            ("init_query", "https://api.example.com/{nope}/releases"),
            ("root_dir", "/tmp"),
        ]);
        assert!(matches!(
            config.init_query(),
            Err(ConfigError::UnknownPlaceholder(key)) if key == "nope"
        ));
    }

    #[test]
    fn test_init_query_unterminated_placeholder_is_fatal() {
        let config = Config::from_values([("init_query", "https://api.example.com/{oops")]);
        assert!(matches!(
            config.init_query(),
            Err(ConfigError::UnterminatedPlaceholder)
        ));
    }

    #[test]
    fn test_escaped_braces_render_literally() {
        let config = Config::from_values([("init_query", "https://api.example.com/a?q={{x}}")]);
        assert_eq!(
            config.init_query().unwrap(),
            "https://api.example.com/a?q={x}"
        );
    }

    #[test]
    fn test_root_dir_required() {
        let config = Config::from_values([("init_query", "https://api.example.com/a/b")]);
        assert!(matches!(
            config.root_dir(),
            Err(ConfigError::MissingKey("root_dir"))
        ));
        assert_eq!(
            sample_config().root_dir().unwrap(),
            PathBuf::from("/var/lib/pagewalk")
        );
    }

    #[test]
    fn test_port_defaults_and_parses() {
        assert_eq!(sample_config().port().unwrap(), DEFAULT_PORT);

        let config = Config::from_values([("port", "8080")]);
        assert_eq!(config.port().unwrap(), 8080);

        let config = Config::from_values([("port", "not-a-port")]);
        assert!(matches!(
            config.port(),
            Err(ConfigError::InvalidValue { key: "port", .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"init_query": "https://api.example.com/a/b", "root_dir": "/data"}"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.init_query().unwrap(), "https://api.example.com/a/b");
        assert_eq!(config.root_dir().unwrap(), PathBuf::from("/data"));
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = Config::load(&temp_dir.path().join("absent.json"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_load_malformed_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "{ nope").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }
}
