//! Configuration store (C1).
//!
//! Loads every YAML fragment in a configured directory, merges top-level
//! keys into a single mapping, and validates the `STARFLEET` section
//! against a fixed schema. Other keys are preserved verbatim and addressed
//! by worker name.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Region, Result, StarfleetError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsManagerRef {
    #[serde(rename = "SecretId")]
    pub secret_id: String,
    #[serde(rename = "SecretRegion")]
    pub secret_region: String,
}

/// The `STARFLEET` section: global configuration for the tasking pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StarflightConfig {
    #[serde(rename = "DeploymentRegion")]
    pub deployment_region: String,
    #[serde(rename = "TemplateBucket")]
    pub template_bucket: String,
    #[serde(rename = "FanOutQueueUrl")]
    pub fan_out_queue_url: String,
    #[serde(rename = "AccountIndex", default = "default_account_index")]
    pub account_index: String,
    #[serde(rename = "ScopeToRegions", default)]
    pub scope_to_regions: Vec<String>,
    #[serde(rename = "SecretsManager", default)]
    pub secrets_manager: Option<SecretsManagerRef>,
    #[serde(rename = "SlackEnabled", default)]
    pub slack_enabled: bool,
    #[serde(rename = "LogLevel", default = "default_log_level")]
    pub log_level: String,
    #[serde(rename = "ThirdPartyLoggerLevels", default)]
    pub third_party_logger_levels: HashMap<String, String>,
}

fn default_account_index() -> String {
    "StarfleetDefaultAccountIndex".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl StarflightConfig {
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.fan_out_queue_url).map_err(|e| {
            StarfleetError::BadConfiguration(format!(
                "FanOutQueueUrl '{}' is not a valid URL: {e}",
                self.fan_out_queue_url
            ))
        })?;
        if parsed.scheme() != "https" {
            return Err(StarfleetError::BadConfiguration(format!(
                "FanOutQueueUrl must be an https URL, got '{}'",
                self.fan_out_queue_url
            )));
        }
        if self.deployment_region.is_empty() {
            return Err(StarfleetError::BadConfiguration(
                "DeploymentRegion is required".to_string(),
            ));
        }
        if self.template_bucket.is_empty() {
            return Err(StarfleetError::BadConfiguration(
                "TemplateBucket is required".to_string(),
            ));
        }
        if self.slack_enabled && self.secrets_manager.is_none() {
            return Err(StarfleetError::BadConfiguration(
                "SlackEnabled requires SecretsManager to be configured".to_string(),
            ));
        }
        Ok(())
    }

    pub fn scope_to_regions_set(&self) -> std::collections::HashSet<Region> {
        self.scope_to_regions.iter().map(|r| Region(r.clone())).collect()
    }
}

/// The merged configuration document: the validated `STARFLEET` section
/// plus every other top-level key, addressable by worker name.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    pub starfleet: StarflightConfig,
    sections: HashMap<String, Value>,
}

impl ConfigStore {
    /// Loads every `*.yaml`/`*.yml` file in `dir`, merging top-level keys.
    /// On key collision the later file (directory order) wins, logged at
    /// `warn`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut merged = serde_json::Map::new();
        let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| {
                StarfleetError::BadConfiguration(format!(
                    "cannot read configuration directory '{}': {e}",
                    dir.display()
                ))
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml")
                )
            })
            .collect();
        entries.sort();

        for path in &entries {
            let content = std::fs::read_to_string(path).map_err(|e| {
                StarfleetError::BadConfiguration(format!(
                    "cannot read configuration file '{}': {e}",
                    path.display()
                ))
            })?;
            let doc: Value = serde_yaml::from_str(&content).map_err(|e| {
                StarfleetError::BadConfiguration(format!(
                    "cannot parse configuration file '{}': {e}",
                    path.display()
                ))
            })?;
            let Value::Object(map) = doc else {
                return Err(StarfleetError::BadConfiguration(format!(
                    "configuration file '{}' must contain a top-level mapping",
                    path.display()
                )));
            };
            for (key, value) in map {
                if merged.contains_key(&key) {
                    tracing::warn!(key = %key, file = %path.display(), "configuration key overridden by later file");
                }
                merged.insert(key, value);
            }
        }

        Self::from_merged(Value::Object(merged))
    }

    /// Builds a store directly from an already-merged document; used by
    /// tests that construct configuration in-memory instead of on disk.
    pub fn from_merged(doc: Value) -> Result<Self> {
        let Value::Object(mut map) = doc else {
            return Err(StarfleetError::BadConfiguration(
                "configuration document must be a mapping".to_string(),
            ));
        };
        let starfleet_value = map.remove("STARFLEET").ok_or_else(|| {
            StarfleetError::BadConfiguration("missing required STARFLEET section".to_string())
        })?;
        let starfleet: StarflightConfig = serde_json::from_value(starfleet_value).map_err(|e| {
            StarfleetError::BadConfiguration(format!("STARFLEET section schema error: {e}"))
        })?;
        starfleet.validate()?;

        let sections = map.into_iter().collect::<HashMap<_, _>>();

        Ok(Self { starfleet, sections })
    }

    /// Exposes a worker's configuration subsection by name, raw (not yet
    /// validated against the worker's own `configuration_schema` — that
    /// happens in the plugin registry, C2).
    pub fn worker_section(&self, name: &str) -> Option<&Value> {
        self.sections.get(name)
    }
}
