//! In-memory test doubles for [`super::ObjectStore`] and [`super::QueueClient`],
//! used by unit and end-to-end scenario tests in place of live AWS
//! collaborators.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ObjectListing, ObjectStore, QueueBatchEntry, QueueClient};
use crate::model::{Result, StarfleetError};

#[derive(Default)]
pub struct FakeObjectStore {
    objects: HashMap<(String, String), Vec<u8>>,
}

impl FakeObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, bucket: impl Into<String>, key: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.objects.insert((bucket.into(), key.into()), body.into());
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StarfleetError::TemplateFetch {
                key: key.to_string(),
                reason: "object not found".to_string(),
            })
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        _continuation_token: Option<String>,
    ) -> Result<ObjectListing> {
        let mut keys: Vec<String> = self
            .objects
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        Ok(ObjectListing {
            keys,
            continuation_token: None,
        })
    }
}

/// Records every batch sent to it, in order, for assertion by tests.
#[derive(Default)]
pub struct RecordingQueueClient {
    batches: Mutex<Vec<(String, Vec<QueueBatchEntry>)>>,
}

impl RecordingQueueClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<(String, Vec<QueueBatchEntry>)> {
        self.batches
            .lock()
            .expect("recording queue mutex poisoned")
            .iter()
            .map(|(url, entries)| (url.clone(), entries.clone()))
            .collect()
    }

    pub fn total_messages(&self) -> usize {
        self.batches()
            .iter()
            .map(|(_, entries)| entries.len())
            .sum()
    }
}

#[async_trait]
impl QueueClient for RecordingQueueClient {
    async fn send_batch(&self, queue_url: &str, entries: Vec<QueueBatchEntry>) -> Result<()> {
        if entries.len() > 10 {
            return Err(StarfleetError::Queue(format!(
                "batch of {} exceeds the 10-message limit",
                entries.len()
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.id.clone()) {
                return Err(StarfleetError::Queue(format!(
                    "duplicate message id '{}' within a batch",
                    entry.id
                )));
            }
        }
        self.batches
            .lock()
            .expect("recording queue mutex poisoned")
            .push((queue_url.to_string(), entries));
        Ok(())
    }
}
