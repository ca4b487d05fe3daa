//! Fan-out engine — stage 2 (C7): fetches and validates a template against
//! its worker's payload schema, computes targets via the resolver, and
//! enqueues one message per target onto the worker's invocation queue, in
//! batches of at most 10.

use futures::future::try_join_all;
use serde_json::Value;

use crate::clients::QueueBatchEntry;
use crate::context::StarfleetContext;
use crate::model::{
    AccountPayload, AccountRegionPayload, BaseTemplate, FanOutStrategy, Result, StarfleetError,
};
use crate::resolver::{resolve_account_regions, resolve_accounts};

const BATCH_SIZE: usize = 10;

fn schema_errors(authored: &Value, extra_schema: Option<&Value>) -> Vec<String> {
    let Some(schema) = extra_schema else {
        return Vec::new();
    };
    match jsonschema::validator_for(schema) {
        Ok(validator) => validator.iter_errors(authored).map(|e| e.to_string()).collect(),
        Err(e) => vec![format!("invalid payload schema: {e}")],
    }
}

/// Sends every chunk of at most [`BATCH_SIZE`] entries concurrently (spec.md
/// §5: "implementations may parallelize enqueue batches"); entries within a
/// batch are never reordered.
async fn send_in_batches(
    ctx: &StarfleetContext,
    queue_url: &str,
    entries: Vec<QueueBatchEntry>,
) -> Result<usize> {
    let total = entries.len();
    let sends = entries
        .chunks(BATCH_SIZE)
        .map(|chunk| ctx.queue_client.send_batch(queue_url, chunk.to_vec()));
    try_join_all(sends).await?;
    Ok(total)
}

/// Runs one fan-out request to completion. Returns the number of messages
/// enqueued (0 for a soft-stop: empty target set).
pub async fn fan_out(ctx: &StarfleetContext, worker_name: &str, template_path: &str) -> Result<usize> {
    let worker = ctx
        .registry
        .get(worker_name)
        .ok_or_else(|| StarfleetError::NoShipPlugin(worker_name.to_string()))?;

    let bucket = ctx.config.starfleet.template_bucket.clone();
    let authored = ctx.template_fetcher().fetch_template(&bucket, template_path).await?;
    let extra_schema = ctx.registry.payload_schema(worker_name).cloned();

    match worker.fan_out_strategy {
        FanOutStrategy::Single => {
            let mut errors = schema_errors(&authored, extra_schema.as_ref());
            if let Err(e) = serde_json::from_value::<BaseTemplate>(authored.clone()) {
                errors.push(e.to_string());
            }
            if !errors.is_empty() {
                return Err(StarfleetError::PayloadValidation {
                    worker: worker_name.to_string(),
                    errors,
                });
            }
            let body = serde_json::to_string(&authored).map_err(|e| {
                StarfleetError::PayloadValidation {
                    worker: worker_name.to_string(),
                    errors: vec![e.to_string()],
                }
            })?;
            let entries = vec![QueueBatchEntry {
                id: "1".to_string(),
                body,
            }];
            send_in_batches(ctx, &worker.config.invocation_queue_url, entries).await
        }

        FanOutStrategy::Account => {
            let payload = parse_account_payload(&authored, worker_name, extra_schema.as_ref())?;
            let targets = resolve_accounts(&payload, &ctx.index);
            if targets.is_empty() {
                tracing::info!(worker = worker_name, template_path, "resolved zero accounts, skipping fan-out");
                return Ok(0);
            }

            let mut entries = Vec::with_capacity(targets.len());
            let mut ids: Vec<_> = targets.into_iter().collect();
            ids.sort();
            for account_id in ids {
                let mut message = authored.clone();
                message["StarbaseAssignedAccount"] = Value::String(account_id.to_string());
                let body = serde_json::to_string(&message).map_err(|e| {
                    StarfleetError::PayloadValidation {
                        worker: worker_name.to_string(),
                        errors: vec![e.to_string()],
                    }
                })?;
                entries.push(QueueBatchEntry {
                    id: account_id.to_string(),
                    body,
                });
            }
            send_in_batches(ctx, &worker.config.invocation_queue_url, entries).await
        }

        FanOutStrategy::AccountRegion => {
            let known_regions = ctx.index.known_regions();
            let payload =
                parse_account_region_payload(&authored, worker_name, extra_schema.as_ref(), &known_regions)?;
            let scope = ctx.config.starfleet.scope_to_regions_set();
            let targets = resolve_account_regions(&payload, &ctx.index, &scope, true);
            let total_regions: usize = targets.values().map(|r| r.len()).sum();
            if total_regions == 0 {
                tracing::info!(worker = worker_name, template_path, "resolved zero account-regions, skipping fan-out");
                return Ok(0);
            }

            let mut entries = Vec::with_capacity(total_regions);
            let mut accounts: Vec<_> = targets.keys().cloned().collect();
            accounts.sort();
            for account_id in accounts {
                let mut regions: Vec<_> = targets[&account_id].iter().cloned().collect();
                regions.sort();
                for region in regions {
                    let mut message = authored.clone();
                    message["StarbaseAssignedAccount"] = Value::String(account_id.to_string());
                    message["StarbaseAssignedRegion"] = Value::String(region.0.clone());
                    let body = serde_json::to_string(&message).map_err(|e| {
                        StarfleetError::PayloadValidation {
                            worker: worker_name.to_string(),
                            errors: vec![e.to_string()],
                        }
                    })?;
                    entries.push(QueueBatchEntry {
                        id: format!("{account_id}||{region}"),
                        body,
                    });
                }
            }
            send_in_batches(ctx, &worker.config.invocation_queue_url, entries).await
        }
    }
}

fn parse_account_payload(
    authored: &Value,
    worker_name: &str,
    extra_schema: Option<&Value>,
) -> Result<AccountPayload> {
    let mut errors = schema_errors(authored, extra_schema);
    let parsed = serde_json::from_value::<AccountPayload>(authored.clone());
    let payload = match parsed {
        Ok(payload) => {
            if let Err(e) = payload.validate() {
                errors.push(e);
            }
            Some(payload)
        }
        Err(e) => {
            errors.push(e.to_string());
            None
        }
    };
    if !errors.is_empty() {
        return Err(StarfleetError::PayloadValidation {
            worker: worker_name.to_string(),
            errors,
        });
    }
    let payload = payload.expect("checked above");
    if let Err(reason) = payload.reject_preassigned() {
        return Err(StarfleetError::InvalidTemplateForFanout {
            worker: worker_name.to_string(),
            reason,
        });
    }
    Ok(payload)
}

fn parse_account_region_payload(
    authored: &Value,
    worker_name: &str,
    extra_schema: Option<&Value>,
    known_regions: &std::collections::HashSet<crate::model::Region>,
) -> Result<AccountRegionPayload> {
    let mut errors = schema_errors(authored, extra_schema);
    let parsed = serde_json::from_value::<AccountRegionPayload>(authored.clone());
    let payload = match parsed {
        Ok(payload) => {
            if let Err(e) = payload.validate(known_regions) {
                errors.push(e);
            }
            Some(payload)
        }
        Err(e) => {
            errors.push(e.to_string());
            None
        }
    };
    if !errors.is_empty() {
        return Err(StarfleetError::PayloadValidation {
            worker: worker_name.to_string(),
            errors,
        });
    }
    let payload = payload.expect("checked above");
    if let Err(reason) = payload.reject_preassigned() {
        return Err(StarfleetError::InvalidTemplateForFanout {
            worker: worker_name.to_string(),
            reason,
        });
    }
    Ok(payload)
}
