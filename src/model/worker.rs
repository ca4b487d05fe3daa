use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FanOutStrategy {
    Single,
    Account,
    AccountRegion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvocationSource {
    Timed,
    StoreEvent,
}

/// Scheduling frequencies, represented as an enum (spec.md §9 design note:
/// "do not parse cron").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimedFrequency {
    #[serde(rename = "5M")]
    FiveMin,
    #[serde(rename = "15M")]
    FifteenMin,
    #[serde(rename = "30M")]
    ThirtyMin,
    #[serde(rename = "HOURLY")]
    Hourly,
    #[serde(rename = "6H")]
    SixHourly,
    #[serde(rename = "12H")]
    TwelveHourly,
    #[serde(rename = "DAILY")]
    Daily,
}

impl TimedFrequency {
    /// Maps a timed-event frequency token (spec.md §6) to the enum.
    pub fn from_event_token(token: &str) -> Option<Self> {
        Some(match token {
            "FIVE_MIN" => Self::FiveMin,
            "FIFTEEN_MIN" => Self::FifteenMin,
            "THIRTY_MIN" => Self::ThirtyMin,
            "HOURLY" => Self::Hourly,
            "SIX_HOURLY" => Self::SixHourly,
            "TWELVE_HOURLY" => Self::TwelveHourly,
            "DAILY" => Self::Daily,
            _ => return None,
        })
    }
}

/// The base worker configuration fields every worker subsection carries
/// (spec.md §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub enabled: bool,
    pub template_prefix: String,
    pub invocation_queue_url: String,
    pub invocation_sources: HashSet<InvocationSource>,
    #[serde(default)]
    pub timed_frequency: Option<TimedFrequency>,
}

/// A registered worker as exposed by the plugin registry (C2).
#[derive(Clone)]
pub struct WorkerDescriptor {
    pub name: String,
    pub fan_out_strategy: FanOutStrategy,
    pub config: WorkerConfig,
}
