//! Tunable parameters, persisted as TOML.
//!
//! Every threshold the system uses (edge weights, score cut-offs, sample
//! sizes) lives here rather than in the algorithms, so fixtures can pin
//! specific values.

use std::path::Path;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from configuration loading.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(fabula::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(
        code(fabula::config::parse),
        help("Check the TOML syntax. Unknown tables are rejected; missing keys take defaults.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(fabula::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FabulaConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub predictor: PredictorConfig,
    #[serde(default)]
    pub generalizer: GeneralizerConfig,
}

/// Semantic network access and caching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_true")]
    pub use_cache: bool,
    /// Cache entries older than this are refetched.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
    /// Pause before the relation-type catalog request.
    #[serde(default = "default_catalog_delay_ms")]
    pub catalog_delay_ms: u64,
    /// Minimum edge weight for `has_relation`.
    #[serde(default = "default_min_weight")]
    pub relation_min_weight: i64,
    /// Result cap for `has_relation`.
    #[serde(default = "default_relation_limit")]
    pub relation_limit: u32,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Analogical predictor weights and bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorConfig {
    #[serde(default = "default_subject_weight")]
    pub subject_weight: f64,
    #[serde(default = "default_predicate_weight")]
    pub predicate_weight: f64,
    #[serde(default = "default_object_weight")]
    pub object_weight: f64,
    #[serde(default = "default_circumstance_weight")]
    pub location_weight: f64,
    #[serde(default = "default_circumstance_weight")]
    pub time_weight: f64,
    /// Stored factoids scoring below this are ignored.
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    /// Candidates collected per anchor side.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    #[serde(default)]
    pub include_generalized: bool,
    /// Present-story subjects tried when instantiating a category term.
    #[serde(default = "default_max_category_trials")]
    pub max_category_trials: usize,
    #[serde(default = "default_blank_marker")]
    pub blank_marker: String,
}

/// Generalizer candidate search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralizerConfig {
    /// Category terms tried first; grows as generalizations succeed.
    #[serde(default = "default_seed_categories")]
    pub seed_categories: Vec<String>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Minimum is-a edge weight.
    #[serde(default = "default_min_weight")]
    pub min_weight: i64,
}

fn default_base_url() -> String {
    "https://jdm-api.demo.lirmm.fr".into()
}
fn default_true() -> bool {
    true
}
fn default_max_age_secs() -> u64 {
    86_400
}
fn default_catalog_delay_ms() -> u64 {
    500
}
fn default_min_weight() -> i64 {
    5
}
fn default_relation_limit() -> u32 {
    50
}
fn default_subject_weight() -> f64 {
    1.0
}
fn default_predicate_weight() -> f64 {
    2.0
}
fn default_object_weight() -> f64 {
    1.0
}
fn default_circumstance_weight() -> f64 {
    0.25
}
fn default_min_score() -> f64 {
    2.0
}
fn default_sample_size() -> usize {
    4
}
fn default_max_category_trials() -> usize {
    16
}
fn default_blank_marker() -> String {
    "?".into()
}
fn default_top_k() -> usize {
    5
}
fn default_seed_categories() -> Vec<String> {
    [
        "humain",
        "être humain",
        "personne",
        "individu",
        "employé",
        "convive",
        "artiste",
        "visiteur",
        "animal domestique",
        "animal",
        "nourriture",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            use_cache: true,
            max_age_secs: default_max_age_secs(),
            catalog_delay_ms: default_catalog_delay_ms(),
            relation_min_weight: default_min_weight(),
            relation_limit: default_relation_limit(),
            timeout_secs: None,
        }
    }
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            subject_weight: default_subject_weight(),
            predicate_weight: default_predicate_weight(),
            object_weight: default_object_weight(),
            location_weight: default_circumstance_weight(),
            time_weight: default_circumstance_weight(),
            min_score: default_min_score(),
            sample_size: default_sample_size(),
            include_generalized: false,
            max_category_trials: default_max_category_trials(),
            blank_marker: default_blank_marker(),
        }
    }
}

impl Default for GeneralizerConfig {
    fn default() -> Self {
        Self {
            seed_categories: default_seed_categories(),
            top_k: default_top_k(),
            min_weight: default_min_weight(),
        }
    }
}

impl FabulaConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load from `path` when it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let cfg = FabulaConfig::default();
        assert_eq!(cfg.network.max_age_secs, 86_400);
        assert_eq!(cfg.network.relation_min_weight, 5);
        assert_eq!(cfg.network.relation_limit, 50);
        assert_eq!(cfg.predictor.predicate_weight, 2.0);
        assert_eq!(cfg.predictor.min_score, 2.0);
        assert_eq!(cfg.predictor.sample_size, 4);
        assert_eq!(cfg.generalizer.top_k, 5);
        assert!(cfg.generalizer.seed_categories.contains(&"animal".to_string()));
    }

    #[test]
    fn partial_file_takes_defaults() {
        let cfg: FabulaConfig = toml::from_str(
            r#"
            [predictor]
            sample_size = 8
            "#,
        )
        .unwrap();
        assert_eq!(cfg.predictor.sample_size, 8);
        assert_eq!(cfg.predictor.subject_weight, 1.0);
        assert_eq!(cfg.network, NetworkConfig::default());
    }

    #[test]
    fn config_roundtrip_toml() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested/config.toml");

        let mut cfg = FabulaConfig::default();
        cfg.network.base_url = "http://localhost:9000".into();
        cfg.predictor.include_generalized = true;
        cfg.save(&path).unwrap();

        let loaded = FabulaConfig::load(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cfg = FabulaConfig::load_or_default(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, FabulaConfig::default());
    }

    #[test]
    fn unknown_table_is_rejected() {
        let err = toml::from_str::<FabulaConfig>("[bogus]\nx = 1\n").unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }
}
