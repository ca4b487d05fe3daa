//! Plugin registry (C2): discovers worker plugins, validates each against
//! its declared configuration schema, filters disabled ones, and exposes
//! enabled workers by name.
//!
//! Workers are a compiled-in catalog (a `Vec<Box<dyn WorkerPlugin>>` built by
//! the embedding binary or tests), not dynamically loaded shared objects —
//! analogous to the teacher's `ServiceParserRegistry`, which registers
//! concrete parser types rather than loading plugins from disk.

use std::collections::HashMap;

use serde_json::Value;

use crate::config::ConfigStore;
use crate::model::{FanOutStrategy, Result, StarfleetError, WorkerConfig, WorkerDescriptor};

/// A worker plugin as the registry discovers it. Implemented once per
/// worker kind by whatever embeds this crate; the core never inspects a
/// worker's business logic, only its declared shape.
pub trait WorkerPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn fan_out_strategy(&self) -> FanOutStrategy;
    /// JSON Schema the worker's configuration subsection must satisfy,
    /// extending the base [`WorkerConfig`] shape.
    fn configuration_schema(&self) -> &Value;
    /// Additional constraints the worker's template must satisfy beyond the
    /// base payload shape for its `fan_out_strategy` (e.g. required custom
    /// fields). `None` means the base shape is sufficient.
    fn payload_schema(&self) -> Option<&Value> {
        None
    }
    /// CLI command groups this worker publishes, consumed by the external
    /// CLI collaborator, not by the core loop.
    fn cli_command_groups(&self) -> Vec<String> {
        Vec::new()
    }
}

/// The plugin registry: enabled workers by name.
///
/// `order` records registration order (the order plugins were passed to
/// [`WorkerRegistry::discover`]) separately from `workers`, since a
/// `HashMap`'s iteration order is unspecified. [`WorkerRegistry::all`] walks
/// `order` so "the first enabled worker whose prefix matches" (spec.md
/// §4.6) is a stable, reproducible tie-break rather than one that happens
/// to fall out of hashing.
#[derive(Default)]
pub struct WorkerRegistry {
    workers: HashMap<String, WorkerDescriptor>,
    order: Vec<String>,
    payload_schemas: HashMap<String, Value>,
    cli_command_groups: Vec<String>,
}

impl WorkerRegistry {
    /// Discovers workers from the given catalog against the merged
    /// configuration (spec.md §4.2 skip/validate/enable pipeline).
    pub fn discover(
        plugins: impl IntoIterator<Item = Box<dyn WorkerPlugin>>,
        config: &ConfigStore,
    ) -> Result<Self> {
        let mut registry = WorkerRegistry::default();

        for plugin in plugins {
            let Some(section) = config.worker_section(plugin.name()) else {
                tracing::debug!(worker = plugin.name(), "no configuration section, skipping");
                continue;
            };

            let validator = jsonschema::validator_for(plugin.configuration_schema())
                .map_err(|e| StarfleetError::BadConfiguration(format!(
                    "worker '{}' declared an invalid configuration schema: {e}",
                    plugin.name()
                )))?;
            let errors: Vec<String> = validator
                .iter_errors(section)
                .map(|e| e.to_string())
                .collect();
            if !errors.is_empty() {
                return Err(StarfleetError::BadConfiguration(format!(
                    "worker '{}' configuration failed schema validation: {}",
                    plugin.name(),
                    errors.join("; ")
                )));
            }

            let enabled = section
                .get("enabled")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !enabled {
                tracing::debug!(worker = plugin.name(), "worker disabled, skipping");
                continue;
            }

            let worker_config: WorkerConfig = serde_json::from_value(section.clone())
                .map_err(|e| StarfleetError::BadConfiguration(format!(
                    "worker '{}' configuration does not match the base worker shape: {e}",
                    plugin.name()
                )))?;

            if worker_config.invocation_sources.contains(&crate::model::InvocationSource::Timed)
                && worker_config.timed_frequency.is_none()
            {
                return Err(StarfleetError::BadConfiguration(format!(
                    "worker '{}' declares TIMED invocation but no timed_frequency",
                    plugin.name()
                )));
            }

            registry.cli_command_groups.extend(plugin.cli_command_groups());
            if let Some(schema) = plugin.payload_schema() {
                registry.payload_schemas.insert(plugin.name().to_string(), schema.clone());
            }
            registry.order.push(plugin.name().to_string());
            registry.workers.insert(
                plugin.name().to_string(),
                WorkerDescriptor {
                    name: plugin.name().to_string(),
                    fan_out_strategy: plugin.fan_out_strategy(),
                    config: worker_config,
                },
            );
        }

        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&WorkerDescriptor> {
        self.workers.get(name)
    }

    /// Enabled workers in registration order, so callers needing "the first
    /// matching worker" (spec.md §4.6) get a deterministic answer.
    pub fn all(&self) -> impl Iterator<Item = &WorkerDescriptor> {
        self.order.iter().filter_map(move |name| self.workers.get(name))
    }

    pub fn payload_schema(&self, name: &str) -> Option<&Value> {
        self.payload_schemas.get(name)
    }

    pub fn cli_command_groups(&self) -> &[String] {
        &self.cli_command_groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InvocationSource;

    struct TestPlugin {
        name: &'static str,
        strategy: FanOutStrategy,
        schema: Value,
    }

    impl WorkerPlugin for TestPlugin {
        fn name(&self) -> &str {
            self.name
        }
        fn fan_out_strategy(&self) -> FanOutStrategy {
            self.strategy
        }
        fn configuration_schema(&self) -> &Value {
            &self.schema
        }
    }

    fn base_schema() -> Value {
        serde_json::json!({"type": "object"})
    }

    fn config_with(sections: serde_json::Value) -> ConfigStore {
        let mut doc = serde_json::json!({
            "STARFLEET": {
                "DeploymentRegion": "us-east-1",
                "TemplateBucket": "bucket",
                "FanOutQueueUrl": "https://sqs.example.com/fan-out",
            }
        });
        for (k, v) in sections.as_object().unwrap() {
            doc[k] = v.clone();
        }
        ConfigStore::from_merged(doc).unwrap()
    }

    #[test]
    fn skips_worker_with_no_configuration_section() {
        let config = config_with(serde_json::json!({}));
        let registry = WorkerRegistry::discover(
            vec![Box::new(TestPlugin {
                name: "w1",
                strategy: FanOutStrategy::Single,
                schema: base_schema(),
            }) as Box<dyn WorkerPlugin>],
            &config,
        )
        .unwrap();
        assert!(registry.get("w1").is_none());
    }

    #[test]
    fn skips_disabled_worker() {
        let config = config_with(serde_json::json!({
            "w1": {
                "enabled": false,
                "template_prefix": "w1/",
                "invocation_queue_url": "https://sqs.example.com/w1",
                "invocation_sources": [],
            }
        }));
        let registry = WorkerRegistry::discover(
            vec![Box::new(TestPlugin {
                name: "w1",
                strategy: FanOutStrategy::Single,
                schema: base_schema(),
            }) as Box<dyn WorkerPlugin>],
            &config,
        )
        .unwrap();
        assert!(registry.get("w1").is_none());
    }

    #[test]
    fn registers_enabled_worker() {
        let config = config_with(serde_json::json!({
            "w1": {
                "enabled": true,
                "template_prefix": "w1/",
                "invocation_queue_url": "https://sqs.example.com/w1",
                "invocation_sources": ["TIMED"],
                "timed_frequency": "HOURLY",
            }
        }));
        let registry = WorkerRegistry::discover(
            vec![Box::new(TestPlugin {
                name: "w1",
                strategy: FanOutStrategy::Account,
                schema: base_schema(),
            }) as Box<dyn WorkerPlugin>],
            &config,
        )
        .unwrap();
        let w1 = registry.get("w1").unwrap();
        assert_eq!(w1.fan_out_strategy, FanOutStrategy::Account);
        assert!(w1.config.invocation_sources.contains(&InvocationSource::Timed));
    }

    #[test]
    fn fails_hard_on_schema_mismatch() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {"extra_required": {"type": "string"}},
            "required": ["extra_required"],
        });
        let config = config_with(serde_json::json!({
            "w1": {
                "enabled": true,
                "template_prefix": "w1/",
                "invocation_queue_url": "https://sqs.example.com/w1",
                "invocation_sources": [],
            }
        }));
        let err = WorkerRegistry::discover(
            vec![Box::new(TestPlugin {
                name: "w1",
                strategy: FanOutStrategy::Single,
                schema,
            }) as Box<dyn WorkerPlugin>],
            &config,
        )
        .unwrap_err();
        assert!(matches!(err, StarfleetError::BadConfiguration(_)));
    }

    #[test]
    fn timed_source_without_frequency_is_rejected() {
        let config = config_with(serde_json::json!({
            "w1": {
                "enabled": true,
                "template_prefix": "w1/",
                "invocation_queue_url": "https://sqs.example.com/w1",
                "invocation_sources": ["TIMED"],
            }
        }));
        let err = WorkerRegistry::discover(
            vec![Box::new(TestPlugin {
                name: "w1",
                strategy: FanOutStrategy::Single,
                schema: base_schema(),
            }) as Box<dyn WorkerPlugin>],
            &config,
        )
        .unwrap_err();
        assert!(matches!(err, StarfleetError::BadConfiguration(_)));
    }

    #[test]
    fn all_iterates_in_registration_order() {
        let config = config_with(serde_json::json!({
            "w-second": {
                "enabled": true,
                "template_prefix": "w-second/",
                "invocation_queue_url": "https://sqs.example.com/w-second",
                "invocation_sources": [],
            },
            "w-first": {
                "enabled": true,
                "template_prefix": "w-first/",
                "invocation_queue_url": "https://sqs.example.com/w-first",
                "invocation_sources": [],
            },
        }));
        let plugins: Vec<Box<dyn WorkerPlugin>> = vec![
            Box::new(TestPlugin { name: "w-first", strategy: FanOutStrategy::Single, schema: base_schema() }),
            Box::new(TestPlugin { name: "w-second", strategy: FanOutStrategy::Single, schema: base_schema() }),
        ];
        let registry = WorkerRegistry::discover(plugins, &config).unwrap();
        let names: Vec<&str> = registry.all().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["w-first", "w-second"]);
    }
}
