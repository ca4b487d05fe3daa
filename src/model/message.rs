use serde::{Deserialize, Serialize};

/// A timed event, as delivered to the dispatcher (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedEvent {
    pub name: String,
}

/// A single record of a store-change event (spec.md §6). The runtime is
/// expected to invoke the core once per record; when it doesn't, C6
/// processes each record independently and logs a warning (spec.md §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreChangeRecord {
    pub bucket: String,
    pub object_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreChangeEvent {
    #[serde(default)]
    pub records: Vec<StoreChangeRecord>,
}

/// A message on the fan-out queue (spec.md §3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanOutRequest {
    #[serde(rename = "worker_ship")]
    pub worker_name: String,
    #[serde(rename = "template_prefix")]
    pub template_path: String,
}
