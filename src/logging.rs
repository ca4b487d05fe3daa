//! Ambient logging setup (A1): a `tracing_subscriber` `EnvFilter` seeded
//! from `STARFLEET.LogLevel` and `STARFLEET.ThirdPartyLoggerLevels`, with an
//! `RUST_LOG` override taking precedence when present.

use tracing_subscriber::EnvFilter;

use crate::config::StarflightConfig;

/// Builds the directive string: the configured default level, followed by
/// one `target=level` directive per third-party override.
fn build_filter(config: &StarflightConfig) -> String {
    let mut directives = vec![config.log_level.clone()];
    for (target, level) in &config.third_party_logger_levels {
        directives.push(format!("{target}={level}"));
    }
    directives.join(",")
}

/// Installs the global `tracing` subscriber. Call once at process start;
/// panics if a subscriber is already installed.
pub fn init(config: &StarflightConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(build_filter(config)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .json()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_config() -> StarflightConfig {
        StarflightConfig {
            deployment_region: "us-east-1".to_string(),
            template_bucket: "bucket".to_string(),
            fan_out_queue_url: "https://sqs.example.com/fan-out".to_string(),
            account_index: "StarfleetDefaultAccountIndex".to_string(),
            scope_to_regions: vec![],
            secrets_manager: None,
            slack_enabled: false,
            log_level: "info".to_string(),
            third_party_logger_levels: HashMap::new(),
        }
    }

    #[test]
    fn filter_string_includes_default_level() {
        let config = base_config();
        assert_eq!(build_filter(&config), "info");
    }

    #[test]
    fn filter_string_appends_third_party_overrides() {
        let mut config = base_config();
        config
            .third_party_logger_levels
            .insert("aws_config".to_string(), "warn".to_string());
        let filter = build_filter(&config);
        assert!(filter.starts_with("info"));
        assert!(filter.contains("aws_config=warn"));
    }
}
