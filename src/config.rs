use asym_engine::{Budget, EngineOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// How `ln` and `lg` are rewritten to `log` before parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSpelling {
    /// Replace every occurrence of the substrings, wherever they appear.
    #[default]
    Textual,
    /// Replace only whole identifiers `ln` and `lg`.
    Token,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cannot serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub log_spelling: LogSpelling,
    /// Terms kept per expansion on the first attempt.
    pub initial_order: usize,
    /// The order doubles up to this value before a limit is indeterminate.
    pub max_order: usize,
    pub max_log_depth: usize,
    pub max_integer_power: u32,
    /// 0 disables the limit.
    pub max_rewrite_steps: u64,
    /// 0 disables the limit.
    pub max_terms_materialized: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let engine = EngineOptions::default();
        Self {
            log_spelling: LogSpelling::default(),
            initial_order: engine.initial_order,
            max_order: engine.max_order,
            max_log_depth: engine.max_log_depth,
            max_integer_power: engine.max_integer_power,
            max_rewrite_steps: 50_000,
            max_terms_materialized: 1_000_000,
        }
    }
}

impl ClassifierConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Defaults when the file is missing; a file that exists but cannot be
    /// read or parsed is logged and replaced by defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    target: "classify",
                    path = %path.display(),
                    error = %e,
                    "config_load_failed_using_defaults"
                );
                Self::default()
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = self.to_toml_string()?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            initial_order: self.initial_order,
            max_order: self.max_order,
            max_log_depth: self.max_log_depth,
            max_integer_power: self.max_integer_power,
        }
    }

    /// Expansion attempts needed to go from the initial to the maximum order.
    pub fn order_attempts(&self) -> u64 {
        let max = self.max_order.max(1);
        let mut order = self.initial_order.clamp(1, max);
        let mut attempts = 1;
        while order < max {
            order = (order * 2).min(max);
            attempts += 1;
        }
        attempts
    }

    /// A fresh budget for one classification.
    pub fn budget(&self) -> Budget {
        Budget::with_limits(
            self.max_rewrite_steps,
            self.max_terms_materialized,
            self.order_attempts(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asym_engine::{Metric, Operation};

    #[test]
    fn empty_toml_gives_defaults() {
        let config = ClassifierConfig::from_toml_str("").unwrap();
        assert_eq!(config, ClassifierConfig::default());
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let config = ClassifierConfig::from_toml_str(
            "log_spelling = \"token\"\nmax_order = 64\n",
        )
        .unwrap();
        assert_eq!(config.log_spelling, LogSpelling::Token);
        assert_eq!(config.max_order, 64);
        assert_eq!(config.initial_order, ClassifierConfig::default().initial_order);
    }

    #[test]
    fn unknown_spelling_is_rejected() {
        let err = ClassifierConfig::from_toml_str("log_spelling = \"fuzzy\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asymptote.toml");
        let config = ClassifierConfig {
            max_terms_materialized: 1234,
            log_spelling: LogSpelling::Token,
            ..ClassifierConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(ClassifierConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn load_or_default_tolerates_missing_and_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert_eq!(ClassifierConfig::load_or_default(&missing), ClassifierConfig::default());

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "max_order = \"many\"").unwrap();
        assert_eq!(ClassifierConfig::load_or_default(&broken), ClassifierConfig::default());
        assert!(matches!(ClassifierConfig::load(&missing), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn budget_follows_order_range() {
        let config = ClassifierConfig::default();
        // 4, 8, 16, 32
        assert_eq!(config.order_attempts(), 4);
        let budget = config.budget();
        assert_eq!(budget.limit(Operation::Limit, Metric::OrderEscalations), 4);
        assert_eq!(budget.limit(Operation::Simplify, Metric::RewriteSteps), 50_000);

        let flat = ClassifierConfig {
            initial_order: 8,
            max_order: 8,
            ..ClassifierConfig::default()
        };
        assert_eq!(flat.order_attempts(), 1);
    }
}
