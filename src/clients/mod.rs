//! Thin trait seams over the object store and queue service collaborators
//! (spec.md §1, "out of scope... described only by the interfaces the core
//! consumes"), backed by `aws-sdk-s3` / `aws-sdk-sqs` in production and by
//! in-memory fakes in tests, mirroring how the teacher drives its
//! `sender::client` against `wiremock` rather than a live aggregator.

use async_trait::async_trait;

use crate::model::{Result, StarfleetError};

/// One page of a `list_objects`-style call.
#[derive(Debug, Clone, Default)]
pub struct ObjectListing {
    pub keys: Vec<String>,
    pub continuation_token: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectListing>;
}

/// A single entry of a batched `send_message_batch` call.
#[derive(Debug, Clone)]
pub struct QueueBatchEntry {
    pub id: String,
    pub body: String,
}

#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Sends one batch atomically. Implementations must not reorder entries
    /// within the batch (spec.md §5).
    async fn send_batch(&self, queue_url: &str, entries: Vec<QueueBatchEntry>) -> Result<()>;
}

pub mod aws;
pub mod fake;
