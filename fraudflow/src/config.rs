//! Pipeline configuration.
//!
//! The configuration document is TOML, parsed once at startup into immutable
//! typed sections. `${VAR}` references in string values are expanded from the
//! environment before parsing; unset variables are left verbatim so
//! validation can point at them. Missing required keys fail here or at
//! ingestor construction, never mid-pipeline.

use crate::errors::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default location of the configuration document.
pub const DEFAULT_CONFIG_PATH: &str = "config/fraudflow.toml";

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Source data settings. Required for training runs, optional for
    /// serving-only use.
    #[serde(default)]
    pub ingestion: Option<IngestionConfig>,

    /// Preprocessing parameters.
    #[serde(default)]
    pub processing: ProcessingConfig,

    /// Local artifact store settings.
    #[serde(default)]
    pub artifacts: ArtifactConfig,

    /// Optional remote object-store mirror.
    #[serde(default)]
    pub remote: Option<RemoteConfig>,

    /// Optional experiment tracking settings.
    #[serde(default)]
    pub tracking: Option<TrackingConfig>,

    /// Optional git publishing settings.
    #[serde(default)]
    pub publish: Option<PublishConfig>,
}

/// Where the training data comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Bucket or location identifier the sources live under.
    pub source_location: String,

    /// Ordered list of source files to ingest. Order fixes the row order of
    /// the concatenated table.
    pub source_files: Vec<String>,

    /// Directory to read sources from when no remote store is configured.
    #[serde(default)]
    pub local_source_dir: Option<PathBuf>,
}

/// Preprocessing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Fraction of rows held out for the test split.
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,

    /// Seed driving the shuffle split and any stochastic solver.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Name of the label column. When unset the last column is the label.
    #[serde(default)]
    pub label_column: Option<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            test_fraction: default_test_fraction(),
            seed: default_seed(),
            label_column: None,
        }
    }
}

/// Local artifact store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Root directory of the artifact tree.
    #[serde(default = "default_artifact_root")]
    pub root: PathBuf,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            root: default_artifact_root(),
        }
    }
}

/// Remote object-store mirror settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the object-store API.
    pub endpoint: String,

    /// Bucket name.
    pub bucket: String,

    /// Prefix prepended to every object name.
    #[serde(default)]
    pub prefix: String,

    /// Name of the environment variable holding a bearer token. Unset means
    /// unauthenticated requests.
    #[serde(default)]
    pub token_env: Option<String>,
}

/// Experiment tracking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Base URL of an MLflow-compatible tracking server. Unset disables the
    /// remote recorder even when tracking is requested.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Experiment name runs are recorded under.
    #[serde(default = "default_experiment")]
    pub experiment: String,

    /// Path of the local JSONL run log. Unset disables the run log sink.
    #[serde(default)]
    pub run_log: Option<PathBuf>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            experiment: default_experiment(),
            run_log: None,
        }
    }
}

/// Git publishing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Remote name to push to.
    #[serde(default = "default_git_remote")]
    pub git_remote: String,

    /// Branch to push.
    #[serde(default = "default_git_branch")]
    pub git_branch: String,

    /// Repository directory. Unset means the current working directory.
    #[serde(default)]
    pub repo_dir: Option<PathBuf>,
}

fn default_test_fraction() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_artifact_root() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_experiment() -> String {
    "fraud-detection".to_string()
}

fn default_git_remote() -> String {
    "origin".to_string()
}

fn default_git_branch() -> String {
    "main".to_string()
}

impl PipelineConfig {
    /// Loads, expands, and validates a configuration document.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let expanded = expand_env_vars(&raw);
        let config: Self =
            toml::from_str(&expanded).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a configuration document from a string.
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(&expand_env_vars(raw)).map_err(|source| ConfigError::Parse {
                path: PathBuf::from("<inline>"),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates value ranges and cross-field requirements.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fraction = self.processing.test_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(ConfigError::invalid(
                "processing.test_fraction",
                format!("must be in (0, 1), got {fraction}"),
            ));
        }

        if let Some(ingestion) = &self.ingestion {
            if ingestion.source_location.trim().is_empty() {
                return Err(ConfigError::invalid(
                    "ingestion.source_location",
                    "must not be empty",
                ));
            }
            if ingestion.source_files.is_empty() {
                return Err(ConfigError::invalid(
                    "ingestion.source_files",
                    "must list at least one source file",
                ));
            }
            if ingestion.source_files.iter().any(|f| f.trim().is_empty()) {
                return Err(ConfigError::invalid(
                    "ingestion.source_files",
                    "source file names must not be empty",
                ));
            }
        }

        if let Some(remote) = &self.remote {
            if remote.endpoint.trim().is_empty() {
                return Err(ConfigError::invalid("remote.endpoint", "must not be empty"));
            }
            if remote.bucket.trim().is_empty() {
                return Err(ConfigError::invalid("remote.bucket", "must not be empty"));
            }
            if remote.endpoint.contains("${") {
                return Err(ConfigError::invalid(
                    "remote.endpoint",
                    "contains an unexpanded environment reference",
                ));
            }
        }

        if let Some(tracking) = &self.tracking {
            if tracking.experiment.trim().is_empty() {
                return Err(ConfigError::invalid(
                    "tracking.experiment",
                    "must not be empty",
                ));
            }
        }

        if let Some(publish) = &self.publish {
            if publish.git_remote.trim().is_empty() {
                return Err(ConfigError::invalid("publish.git_remote", "must not be empty"));
            }
            if publish.git_branch.trim().is_empty() {
                return Err(ConfigError::invalid("publish.git_branch", "must not be empty"));
            }
        }

        Ok(())
    }

    /// Returns an example configuration document.
    #[must_use]
    pub fn example_toml() -> &'static str {
        r#"# fraudflow configuration

[ingestion]
# Bucket or location the raw CSV sources live under.
source_location = "fraud-transactions"
# Ordered list of source files; order fixes the row order of the dataset.
source_files = ["transactions_2024.csv", "transactions_2025.csv"]
# Used when no [remote] section is present.
local_source_dir = "data"

[processing]
test_fraction = 0.2
seed = 42
# Defaults to the last column when unset.
# label_column = "Fraud"

[artifacts]
root = "artifacts"

# Optional: mirror artifacts to an object store.
# [remote]
# endpoint = "https://storage.example.com"
# bucket = "fraud-models"
# prefix = "pipelines/fraud"
# token_env = "OBJECT_STORE_TOKEN"

# Optional: experiment tracking.
# [tracking]
# endpoint = "http://localhost:5000"
# experiment = "fraud-detection"
# run_log = "artifacts/runs.jsonl"

# Optional: push the artifact tree after a successful run.
# [publish]
# git_remote = "origin"
# git_branch = "main"
"#
    }
}

/// Expands `${VAR}` references from the environment.
///
/// Unset variables are left verbatim; `validate` rejects unexpanded
/// references in fields where they would be sent over the wire.
#[must_use]
pub fn expand_env_vars(input: &str) -> String {
    // The pattern is a literal, so compilation cannot fail.
    #[allow(clippy::unwrap_used)]
    let pattern = Regex::new(r"\$\{([^}]+)\}").unwrap();

    pattern
        .replace_all(input, |caps: &regex::Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert!((config.processing.test_fraction - 0.2).abs() < f64::EPSILON);
        assert_eq!(config.processing.seed, 42);
        assert_eq!(config.artifacts.root, PathBuf::from("artifacts"));
        assert!(config.ingestion.is_none());
        assert!(config.remote.is_none());
    }

    #[test]
    fn test_parse_minimal() {
        let config = PipelineConfig::from_toml(
            r#"
            [ingestion]
            source_location = "bucket"
            source_files = ["a.csv"]
            "#,
        )
        .unwrap();

        let ingestion = config.ingestion.unwrap();
        assert_eq!(ingestion.source_location, "bucket");
        assert_eq!(ingestion.source_files, vec!["a.csv"]);
        assert_eq!(config.processing.seed, 42);
    }

    #[test]
    fn test_parse_full() {
        let config = PipelineConfig::from_toml(
            r#"
            [ingestion]
            source_location = "bucket"
            source_files = ["a.csv", "b.csv"]
            local_source_dir = "data"

            [processing]
            test_fraction = 0.25
            seed = 7
            label_column = "Fraud"

            [artifacts]
            root = "out"

            [remote]
            endpoint = "https://storage.example.com"
            bucket = "models"
            prefix = "fraud"

            [tracking]
            endpoint = "http://localhost:5000"
            experiment = "exp"
            run_log = "out/runs.jsonl"

            [publish]
            git_remote = "origin"
            git_branch = "main"
            "#,
        )
        .unwrap();

        assert!((config.processing.test_fraction - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.processing.label_column.as_deref(), Some("Fraud"));
        assert_eq!(config.remote.unwrap().prefix, "fraud");
        assert_eq!(config.tracking.unwrap().experiment, "exp");
    }

    #[test]
    fn test_rejects_bad_fraction() {
        let result = PipelineConfig::from_toml(
            r#"
            [processing]
            test_fraction = 1.5
            "#,
        );

        let err = result.unwrap_err();
        assert!(err.to_string().contains("test_fraction"));
    }

    #[test]
    fn test_rejects_empty_source_list() {
        let result = PipelineConfig::from_toml(
            r#"
            [ingestion]
            source_location = "bucket"
            source_files = []
            "#,
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_env_expansion() {
        std::env::set_var("FRAUDFLOW_TEST_BUCKET", "expanded-bucket");
        let expanded = expand_env_vars("bucket = \"${FRAUDFLOW_TEST_BUCKET}\"");
        assert_eq!(expanded, "bucket = \"expanded-bucket\"");
        std::env::remove_var("FRAUDFLOW_TEST_BUCKET");
    }

    #[test]
    fn test_env_expansion_leaves_unset_verbatim() {
        let expanded = expand_env_vars("token = \"${FRAUDFLOW_TEST_UNSET_VAR}\"");
        assert_eq!(expanded, "token = \"${FRAUDFLOW_TEST_UNSET_VAR}\"");
    }

    #[test]
    fn test_unexpanded_endpoint_rejected() {
        let result = PipelineConfig::from_toml(
            r#"
            [remote]
            endpoint = "${FRAUDFLOW_TEST_UNSET_ENDPOINT}"
            bucket = "models"
            "#,
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_example_config_parses() {
        let config = PipelineConfig::from_toml(PipelineConfig::example_toml()).unwrap();
        assert!(config.ingestion.is_some());
    }
}
