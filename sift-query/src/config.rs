//! Engine configuration loaded from TOML.
//!
//! ```toml
//! delimiter = "__"
//! list_separator = ","
//! sort_param = "sort"
//! default_operator = "eq"
//! ```
//!
//! Values may reference environment variables with `${NAME}`.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

use crate::error::FilterError;
use crate::operator::Operator;

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {path}")]
    Io {
        /// Path of the file.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML did not parse.
    #[error("failed to parse TOML")]
    Toml {
        /// Underlying error.
        #[source]
        source: toml::de::Error,
    },

    /// The values are inconsistent.
    #[error("{0}")]
    Invalid(String),
}

impl From<ConfigError> for FilterError {
    fn from(err: ConfigError) -> Self {
        FilterError::invalid_config(err.to_string()).with_source(err)
    }
}

/// Syntax settings shared by the parser and the path resolver.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    /// Separates path segments and the operator suffix.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Separates values of a multi-valued filter.
    #[serde(default = "default_list_separator")]
    pub list_separator: char,

    /// Name of the sort query parameter.
    #[serde(default = "default_sort_param")]
    pub sort_param: String,

    /// Operator used when an input names none, or an unknown one.
    #[serde(default = "default_operator")]
    pub default_operator: Operator,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            list_separator: default_list_separator(),
            sort_param: default_sort_param(),
            default_operator: default_operator(),
        }
    }
}

fn default_delimiter() -> String {
    "__".to_string()
}

fn default_list_separator() -> char {
    ','
}

fn default_sort_param() -> String {
    "sort".to_string()
}

fn default_operator() -> Operator {
    Operator::Eq
}

impl FilterConfig {
    /// Load and validate configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(content);
        let config: Self =
            toml::from_str(&expanded).map_err(|e| ConfigError::Toml { source: e })?;
        config.validate()?;
        Ok(config)
    }

    /// Set the delimiter.
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Set the list separator.
    pub fn list_separator(mut self, separator: char) -> Self {
        self.list_separator = separator;
        self
    }

    /// Set the sort parameter name.
    pub fn sort_param(mut self, name: impl Into<String>) -> Self {
        self.sort_param = name.into();
        self
    }

    /// Check the settings are usable together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delimiter.is_empty() {
            return Err(ConfigError::Invalid("delimiter must not be empty".into()));
        }
        if self.delimiter.contains(self.list_separator) {
            return Err(ConfigError::Invalid(format!(
                "delimiter `{}` must not contain the list separator `{}`",
                self.delimiter, self.list_separator
            )));
        }
        if self.sort_param.trim().is_empty() {
            return Err(ConfigError::Invalid("sort_param must not be blank".into()));
        }
        Ok(())
    }
}

static ENV_VAR: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").ok());

/// Replace `${NAME}` with the value of the environment variable `NAME`.
///
/// Unset variables are left as written.
fn expand_env_vars(content: &str) -> String {
    let Some(re) = ENV_VAR.as_ref() else {
        return content.to_string();
    };
    re.replace_all(content, |caps: &regex_lite::Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FilterConfig::default();
        assert_eq!(config.delimiter, "__");
        assert_eq!(config.list_separator, ',');
        assert_eq!(config.sort_param, "sort");
        assert_eq!(config.default_operator, Operator::Eq);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_config() {
        let config = FilterConfig::from_toml(
            r#"
            delimiter = "."
            default_operator = "icontains"
            "#,
        )
        .unwrap();
        assert_eq!(config.delimiter, ".");
        assert_eq!(config.list_separator, ',');
        assert_eq!(config.default_operator, Operator::IContains);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = FilterConfig::from_toml("delimter = \"__\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let err = FilterConfig::from_toml("default_operator = \"like\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
    }

    #[test]
    fn test_validation() {
        let empty = FilterConfig::default().delimiter("");
        assert!(empty.validate().is_err());

        let clash = FilterConfig::default().delimiter(",,");
        assert!(clash.validate().is_err());

        let semicolons = FilterConfig::default().delimiter(",,").list_separator(';');
        assert!(semicolons.validate().is_ok());

        let err = FilterConfig::from_toml("sort_param = \" \"").unwrap_err();
        assert!(err.to_string().contains("sort_param"));
    }

    #[test]
    fn test_env_var_expansion() {
        // SAFETY: test-local variable name not read elsewhere.
        unsafe { std::env::set_var("SIFT_TEST_SORT_PARAM", "order_by") };
        let config = FilterConfig::from_toml("sort_param = \"${SIFT_TEST_SORT_PARAM}\"").unwrap();
        assert_eq!(config.sort_param, "order_by");

        let untouched = expand_env_vars("x = \"${SIFT_TEST_UNSET_VARIABLE}\"");
        assert_eq!(untouched, "x = \"${SIFT_TEST_UNSET_VARIABLE}\"");
    }

    #[test]
    fn test_into_filter_error() {
        let err: FilterError = ConfigError::Invalid("bad".into()).into();
        assert!(err.is_server());
        assert_eq!(err.message, "Invalid filter configuration: bad");
    }
}
