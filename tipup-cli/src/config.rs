//! CLI configuration.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax.
//!
//! # Example Configuration
//!
//! ```toml
//! bot_id = "1187000000000000000"
//! api_key = "$TIPUP_API_KEY"
//! timeout_secs = 30
//!
//! # Staging only
//! api_url = "https://staging-api.tipup.app"
//! tipup_bot_user_id = "1200000000000000000"
//! ```
//!
//! # Environment Variables
//!
//! - `TIPUP_CONFIG` — Path to configuration file (default: `tipup.toml`)
//! - `TIPUP_API_URL` — Override the API base URL
//! - `TIPUP_API_KEY` — Override the API key
//! - `TIPUP_BOT_ID` — Override this bot's user id
//! - Any variable referenced by `$VAR` in the config file

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tipup::TipupConfig;
use tipup::chat::UserId;
use tipup::config::ConfigError;

/// Errors raised while loading the CLI configuration.
#[derive(Debug, thiserror::Error)]
pub enum CliConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The file path.
        path: String,
        /// The I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for [`CliConfig`].
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// No bot id was configured.
    #[error("bot_id is not set (config file or TIPUP_BOT_ID)")]
    MissingBotId,
    /// The resulting client configuration is invalid.
    #[error(transparent)]
    Client(#[from] ConfigError),
}

/// Top-level CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// This bot's Discord user id.
    #[serde(default)]
    pub bot_id: Option<String>,

    /// Tipup API key. Supports `$VAR` / `${VAR}` expansion.
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL (default: production).
    #[serde(default)]
    pub api_url: Option<String>,

    /// Tipup bot user id (default: production).
    #[serde(default)]
    pub tipup_bot_user_id: Option<String>,

    /// Request timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl CliConfig {
    /// Loads configuration from `path`, or from the `TIPUP_CONFIG` environment
    /// variable, falling back to `tipup.toml` in the current directory.
    ///
    /// After loading, `$VAR` / `${VAR}` references are expanded from the
    /// process environment and `TIPUP_*` variables override file values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: Option<&str>) -> Result<Self, CliConfigError> {
        let path = path.map_or_else(
            || std::env::var("TIPUP_CONFIG").unwrap_or_else(|_| "tipup.toml".to_owned()),
            ToOwned::to_owned,
        );
        let content = if Path::new(&path).exists() {
            std::fs::read_to_string(&path).map_err(|source| CliConfigError::Read {
                path: path.clone(),
                source,
            })?
        } else {
            // No file: rely on defaults and environment overrides.
            String::new()
        };

        let mut config = Self::parse(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parses TOML content after expanding environment variables in it.
    ///
    /// # Errors
    ///
    /// Returns [`CliConfigError::Parse`] for invalid TOML.
    pub fn parse(content: &str) -> Result<Self, CliConfigError> {
        let expanded = expand_env_vars(content);
        Ok(toml::from_str(&expanded)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("TIPUP_API_URL") {
            self.api_url = Some(url);
        }
        if let Ok(key) = std::env::var("TIPUP_API_KEY") {
            self.api_key = Some(key);
        }
        if let Ok(bot_id) = std::env::var("TIPUP_BOT_ID") {
            self.bot_id = Some(bot_id);
        }
    }

    /// This bot's user id.
    ///
    /// # Errors
    ///
    /// Returns [`CliConfigError::MissingBotId`] if none is configured.
    pub fn bot_id(&self) -> Result<UserId, CliConfigError> {
        self.bot_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(UserId::from)
            .ok_or(CliConfigError::MissingBotId)
    }

    /// Request timeout, if configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Builds the client configuration.
    ///
    /// An `api_key` still of the form `$VAR` (unresolved) is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`CliConfigError::Client`] if the API URL is invalid.
    pub fn tipup_config(&self) -> Result<TipupConfig, CliConfigError> {
        let mut builder = TipupConfig::builder();
        if let Some(url) = &self.api_url {
            builder = builder.api_url(url.as_str());
        }
        if let Some(id) = &self.tipup_bot_user_id {
            builder = builder.tipup_bot_user_id(id.as_str());
        }
        if let Some(key) = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && !k.starts_with('$'))
        {
            builder = builder.api_key(key);
        }
        Ok(builder.build()?)
    }
}

/// Expands `$VAR` and `${VAR}` references from the process environment.
fn expand_env_vars(input: &str) -> String {
    expand_vars(input, |name| std::env::var(name).ok())
}

/// Replaces variable references using `lookup`.
///
/// A reference that does not resolve, an unterminated `${`, and a `$` with no
/// name after it are copied through unchanged.
fn expand_vars(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(dollar) = rest.find('$') {
        out.push_str(&rest[..dollar]);
        let after = &rest[dollar + 1..];
        let resolved = var_reference(after)
            .and_then(|(name, len)| lookup(name).map(|value| (value, len)));
        match resolved {
            Some((value, len)) => {
                out.push_str(&value);
                rest = &after[len..];
            }
            None => {
                out.push('$');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// The variable name at the start of `after` (the text following a `$`) and
/// the number of bytes the reference spans.
fn var_reference(after: &str) -> Option<(&str, usize)> {
    if let Some(braced) = after.strip_prefix('{') {
        let end = braced.find('}')?;
        let name = &braced[..end];
        return (!name.is_empty()).then_some((name, end + 2));
    }
    let end = after
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .unwrap_or(after.len());
    (end > 0).then(|| (&after[..end], end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file() {
        let config = CliConfig::parse(
            r#"
            bot_id = "111"
            api_key = "tipup_abc"
            api_url = "http://localhost:9000"
            tipup_bot_user_id = "222"
            timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.bot_id().unwrap().as_str(), "111");
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
        let tipup = config.tipup_config().unwrap();
        assert_eq!(tipup.api_url().as_str(), "http://localhost:9000/");
        assert_eq!(tipup.tipup_bot_user_id().as_str(), "222");
        assert_eq!(tipup.api_key().unwrap().expose(), "tipup_abc");
    }

    #[test]
    fn test_empty_file_uses_production_defaults() {
        let config = CliConfig::parse("").unwrap();
        assert!(matches!(config.bot_id(), Err(CliConfigError::MissingBotId)));
        let tipup = config.tipup_config().unwrap();
        assert_eq!(tipup.api_url().as_str(), "https://api.tipup.app/");
        assert!(tipup.api_key().is_none());
    }

    #[test]
    fn test_unresolved_variable_is_kept_and_ignored_as_key() {
        let config =
            CliConfig::parse("api_key = \"${TIPUP_TEST_SURELY_UNSET_VARIABLE}\"").unwrap();
        assert_eq!(
            config.api_key.as_deref(),
            Some("${TIPUP_TEST_SURELY_UNSET_VARIABLE}")
        );
        assert!(config.tipup_config().unwrap().api_key().is_none());
    }

    fn lookup(name: &str) -> Option<String> {
        (name == "KEY").then(|| "tipup_s3cret".to_owned())
    }

    #[test]
    fn test_expand_both_reference_forms() {
        assert_eq!(
            expand_vars("a = \"$KEY\"\nb = \"${KEY}-x\"", lookup),
            "a = \"tipup_s3cret\"\nb = \"tipup_s3cret-x\""
        );
        assert_eq!(expand_vars("$KEY_2", lookup), "$KEY_2");
    }

    #[test]
    fn test_expand_copies_what_it_cannot_resolve() {
        assert_eq!(expand_vars("cost: $ 5", lookup), "cost: $ 5");
        assert_eq!(expand_vars("a ${} b", lookup), "a ${} b");
        assert_eq!(expand_vars("${KEY", lookup), "${KEY");
        assert_eq!(expand_vars("${OTHER} $", lookup), "${OTHER} $");
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            CliConfig::parse("bot_id = "),
            Err(CliConfigError::Parse(_))
        ));
    }
}
