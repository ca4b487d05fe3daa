use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_sqs::types::SendMessageBatchRequestEntry;
use aws_sdk_sqs::Client as SqsClient;

use super::{ObjectListing, ObjectStore, QueueBatchEntry, QueueClient};
use crate::model::{Result, StarfleetError};

pub struct S3ObjectStore {
    client: S3Client,
}

impl S3ObjectStore {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }

    pub async fn from_env(region: &str) -> Self {
        let config = aws_config::from_env()
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;
        Self::new(S3Client::new(&config))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StarfleetError::TemplateFetch {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StarfleetError::TemplateFetch {
                key: key.to_string(),
                reason: e.to_string(),
            })?
            .into_bytes();
        Ok(bytes.to_vec())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectListing> {
        let mut request = self.client.list_objects_v2().bucket(bucket).prefix(prefix);
        if let Some(token) = continuation_token {
            request = request.continuation_token(token);
        }
        let output = request
            .send()
            .await
            .map_err(|e| StarfleetError::ObjectStore(e.to_string()))?;
        let keys = output
            .contents()
            .iter()
            .filter_map(|obj| obj.key().map(str::to_string))
            .collect();
        Ok(ObjectListing {
            keys,
            continuation_token: output.next_continuation_token().map(str::to_string),
        })
    }
}

pub struct SqsQueueClient {
    client: SqsClient,
}

impl SqsQueueClient {
    pub fn new(client: SqsClient) -> Self {
        Self { client }
    }

    pub async fn from_env(region: &str) -> Self {
        let config = aws_config::from_env()
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;
        Self::new(SqsClient::new(&config))
    }
}

#[async_trait]
impl QueueClient for SqsQueueClient {
    async fn send_batch(&self, queue_url: &str, entries: Vec<QueueBatchEntry>) -> Result<()> {
        if entries.len() > 10 {
            return Err(StarfleetError::Queue(format!(
                "batch of {} exceeds the 10-message limit",
                entries.len()
            )));
        }
        let request_entries = entries
            .into_iter()
            .map(|entry| {
                SendMessageBatchRequestEntry::builder()
                    .id(entry.id)
                    .message_body(entry.body)
                    .build()
                    .expect("id and message_body are always set")
            })
            .collect::<Vec<_>>();

        let output = self
            .client
            .send_message_batch()
            .queue_url(queue_url)
            .set_entries(Some(request_entries))
            .send()
            .await
            .map_err(|e| StarfleetError::Queue(e.to_string()))?;

        if !output.failed().is_empty() {
            let reasons = output
                .failed()
                .iter()
                .map(|f| format!("{}: {}", f.id(), f.message().unwrap_or("unknown")))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(StarfleetError::Queue(format!(
                "batch send reported failures: {reasons}"
            )));
        }
        Ok(())
    }
}
