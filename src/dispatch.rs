//! Dispatcher (C6), stage 1 of the tasking pipeline: turns an inbound timed
//! or store-change event into one or more fan-out requests.

use futures::future::try_join_all;
use percent_encoding::percent_decode_str;

use crate::clients::QueueBatchEntry;
use crate::context::StarfleetContext;
use crate::fanout;
use crate::model::{
    FanOutRequest, InvocationSource, Result, StarfleetError, StoreChangeEvent, TimedEvent,
    TimedFrequency, WorkerDescriptor,
};

const BATCH_SIZE: usize = 10;

/// Dispatches a timed event: every enabled worker with a TIMED invocation
/// source whose `timed_frequency` matches the event's frequency token is
/// expanded to its full template list, and one `FanOutRequest` per template
/// is enqueued onto `FanOutQueueUrl` (spec.md §4.6).
pub async fn dispatch_timed(ctx: &StarfleetContext, event: &TimedEvent) -> Result<usize> {
    let Some(frequency) = TimedFrequency::from_event_token(&event.name) else {
        tracing::warn!(event = %event.name, "unrecognized timed event token, nothing to dispatch");
        return Ok(0);
    };

    let matching: Vec<&WorkerDescriptor> = ctx
        .registry
        .all()
        .filter(|w| {
            w.config.invocation_sources.contains(&InvocationSource::Timed)
                && w.config.timed_frequency == Some(frequency)
        })
        .collect();

    if matching.is_empty() {
        tracing::info!(event = %event.name, "no workers match this timed frequency");
        return Ok(0);
    }

    let bucket = ctx.config.starfleet.template_bucket.clone();
    let fetcher = ctx.template_fetcher();
    let mut total = 0usize;

    for worker in matching {
        let templates = fetcher
            .list_templates(&bucket, &worker.config.template_prefix, &worker.name)
            .await?;
        if templates.is_empty() {
            tracing::info!(worker = %worker.name, "matched timed frequency but has no templates, skipping");
            continue;
        }

        let entries: Vec<QueueBatchEntry> = templates
            .iter()
            .enumerate()
            .map(|(i, template_path)| {
                let request = FanOutRequest {
                    worker_name: worker.name.clone(),
                    template_path: template_path.clone(),
                };
                let body = serde_json::to_string(&request)
                    .expect("FanOutRequest always serializes");
                QueueBatchEntry {
                    id: (i + 1).to_string(),
                    body,
                }
            })
            .collect();

        let sends = entries
            .chunks(BATCH_SIZE)
            .map(|chunk| ctx.queue_client.send_batch(&ctx.config.starfleet.fan_out_queue_url, chunk.to_vec()));
        try_join_all(sends).await?;
        total += entries.len();
    }

    Ok(total)
}

/// Dispatches a store-change event: resolves the changed object key to the
/// single enabled worker whose `template_prefix` matches it, then hands the
/// pair directly to the fan-out engine (spec.md §9 Open Question (b): no
/// intermediate envelope hop). Each record in a multi-record delivery is
/// processed independently, with a warning logged when there is more than
/// one (spec.md §4.6).
pub async fn dispatch_store_event(ctx: &StarfleetContext, event: &StoreChangeEvent) -> Result<usize> {
    if event.records.len() > 1 {
        tracing::warn!(
            record_count = event.records.len(),
            "store-change delivery carries more than one record, processing independently"
        );
    }

    let mut total = 0usize;
    for record in &event.records {
        if record.bucket != ctx.config.starfleet.template_bucket {
            return Err(StarfleetError::InvalidBucket {
                expected: ctx.config.starfleet.template_bucket.clone(),
                actual: record.bucket.clone(),
            });
        }

        let key = percent_decode_str(&record.object_key)
            .decode_utf8()
            .map_err(|e| StarfleetError::TemplateFetch {
                key: record.object_key.clone(),
                reason: format!("object key is not valid UTF-8 once decoded: {e}"),
            })?
            .into_owned();

        if !key.ends_with(".yaml") {
            tracing::info!(key, "store-change key is not a template, ignoring");
            continue;
        }

        let Some(worker) = find_worker_for_key(ctx, &key) else {
            tracing::info!(key, "store-change key matches no enabled worker's template prefix, ignoring");
            continue;
        };

        total += fanout::fan_out(ctx, &worker, &key).await?;
    }

    Ok(total)
}

/// First enabled worker whose `template_prefix` exactly equals `key` (the
/// single-template case) or is a path prefix of it. "First" is registration
/// order ([`crate::registry::WorkerRegistry::all`]), so two workers with
/// overlapping prefixes (e.g. `w1/` and `w1/sub/`) resolve to whichever was
/// registered earlier, every time — not whichever a hash map happens to
/// yield first.
fn find_worker_for_key(ctx: &StarfleetContext, key: &str) -> Option<String> {
    ctx.registry
        .all()
        .find(|w| w.config.template_prefix == key || key.starts_with(&w.config.template_prefix))
        .map(|w| w.name.clone())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::alert::AlertSink;
    use crate::clients::fake::{FakeObjectStore, RecordingQueueClient};
    use crate::config::ConfigStore;
    use crate::model::StoreChangeRecord;
    use crate::registry::{WorkerPlugin, WorkerRegistry};

    struct NullAlertSink;

    #[async_trait::async_trait]
    impl AlertSink for NullAlertSink {
        async fn emit(&self, _priority: crate::alert::AlertPriority, _title: &str, _body: &str) -> Result<()> {
            Ok(())
        }
    }

    struct TestPlugin {
        name: &'static str,
        strategy: crate::model::FanOutStrategy,
    }

    impl WorkerPlugin for TestPlugin {
        fn name(&self) -> &str {
            self.name
        }
        fn fan_out_strategy(&self) -> crate::model::FanOutStrategy {
            self.strategy
        }
        fn configuration_schema(&self) -> &serde_json::Value {
            static SCHEMA: std::sync::OnceLock<serde_json::Value> = std::sync::OnceLock::new();
            SCHEMA.get_or_init(|| serde_json::json!({"type": "object"}))
        }
    }

    fn config_doc(sections: serde_json::Value) -> serde_json::Value {
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
        doc
    }

    async fn build_ctx(
        sections: serde_json::Value,
        object_store: FakeObjectStore,
    ) -> StarfleetContext {
        let config = ConfigStore::from_merged(config_doc(sections)).unwrap();
        let registry = WorkerRegistry::discover(
            vec![Box::new(TestPlugin {
                name: "w1",
                strategy: crate::model::FanOutStrategy::Single,
            }) as Box<dyn WorkerPlugin>],
            &config,
        )
        .unwrap();
        let index = crate::index::AccountIndex::parse_bytes(
            serde_json::json!({"accounts": {}, "generated": "2026-01-01T00:00:00Z"})
                .to_string()
                .as_bytes(),
        )
        .unwrap();
        StarfleetContext {
            config,
            registry,
            index,
            object_store: Arc::new(object_store),
            queue_client: Arc::new(RecordingQueueClient::new()),
            alert_sink: Arc::new(NullAlertSink),
        }
    }

    #[tokio::test]
    async fn timed_dispatch_enqueues_one_message_per_template() {
        let mut store = FakeObjectStore::new();
        store.put("bucket", "w1/a.yaml", b"TemplateName: a\nTemplateDescription: d\n".to_vec());
        store.put("bucket", "w1/b.yaml", b"TemplateName: b\nTemplateDescription: d\n".to_vec());
        let ctx = build_ctx(
            serde_json::json!({
                "w1": {
                    "enabled": true,
                    "template_prefix": "w1/",
                    "invocation_queue_url": "https://sqs.example.com/w1",
                    "invocation_sources": ["TIMED"],
                    "timed_frequency": "HOURLY",
                }
            }),
            store,
        )
        .await;

        let sent = dispatch_timed(&ctx, &TimedEvent { name: "HOURLY".to_string() })
            .await
            .unwrap();
        assert_eq!(sent, 2);
    }

    #[tokio::test]
    async fn timed_dispatch_skips_worker_with_no_templates() {
        let ctx = build_ctx(
            serde_json::json!({
                "w1": {
                    "enabled": true,
                    "template_prefix": "w1/",
                    "invocation_queue_url": "https://sqs.example.com/w1",
                    "invocation_sources": ["TIMED"],
                    "timed_frequency": "HOURLY",
                }
            }),
            FakeObjectStore::new(),
        )
        .await;

        let sent = dispatch_timed(&ctx, &TimedEvent { name: "HOURLY".to_string() })
            .await
            .unwrap();
        assert_eq!(sent, 0);
    }

    #[tokio::test]
    async fn timed_dispatch_with_no_matching_workers_returns_ok_zero() {
        let ctx = build_ctx(
            serde_json::json!({
                "w1": {
                    "enabled": true,
                    "template_prefix": "w1/",
                    "invocation_queue_url": "https://sqs.example.com/w1",
                    "invocation_sources": ["TIMED"],
                    "timed_frequency": "DAILY",
                }
            }),
            FakeObjectStore::new(),
        )
        .await;

        let sent = dispatch_timed(&ctx, &TimedEvent { name: "HOURLY".to_string() })
            .await
            .unwrap();
        assert_eq!(sent, 0);
    }

    #[tokio::test]
    async fn store_event_with_mismatched_bucket_is_hard_error() {
        let ctx = build_ctx(serde_json::json!({}), FakeObjectStore::new()).await;
        let event = StoreChangeEvent {
            records: vec![StoreChangeRecord {
                bucket: "other-bucket".to_string(),
                object_key: "w1/a.yaml".to_string(),
            }],
        };
        let err = dispatch_store_event(&ctx, &event).await.unwrap_err();
        assert!(matches!(err, StarfleetError::InvalidBucket { .. }));
    }

    #[tokio::test]
    async fn store_event_ignores_non_yaml_keys() {
        let ctx = build_ctx(serde_json::json!({}), FakeObjectStore::new()).await;
        let event = StoreChangeEvent {
            records: vec![StoreChangeRecord {
                bucket: "bucket".to_string(),
                object_key: "w1/readme.txt".to_string(),
            }],
        };
        let sent = dispatch_store_event(&ctx, &event).await.unwrap();
        assert_eq!(sent, 0);
    }

    #[tokio::test]
    async fn store_event_percent_decodes_key_before_matching() {
        let mut store = FakeObjectStore::new();
        store.put("bucket", "w1/a.yaml", b"TemplateName: a\nTemplateDescription: d\n".to_vec());
        let ctx = build_ctx(
            serde_json::json!({
                "w1": {
                    "enabled": true,
                    "template_prefix": "w1/",
                    "invocation_queue_url": "https://sqs.example.com/w1",
                    "invocation_sources": [],
                }
            }),
            store,
        )
        .await;
        let event = StoreChangeEvent {
            records: vec![StoreChangeRecord {
                bucket: "bucket".to_string(),
                object_key: "w1%2Fa.yaml".to_string(),
            }],
        };
        let sent = dispatch_store_event(&ctx, &event).await.unwrap();
        assert_eq!(sent, 1);
    }
}
