//! Template fetcher (C5): lists worker templates from the object store and
//! fetches/parses individual templates.

use std::sync::Arc;

use crate::clients::ObjectStore;
use crate::model::{Result, StarfleetError};

const MAX_LIST_PAGES: usize = 1_000;

pub struct TemplateFetcher {
    store: Arc<dyn ObjectStore>,
}

impl TemplateFetcher {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Lists templates under a worker's `template_prefix`. If the prefix
    /// itself names a `.yaml` object, it is returned directly without
    /// contacting the store (spec.md §4.5).
    pub async fn list_templates(
        &self,
        bucket: &str,
        prefix: &str,
        worker_name: &str,
    ) -> Result<Vec<String>> {
        if prefix.ends_with(".yaml") {
            return Ok(vec![prefix.to_string()]);
        }

        tracing::debug!(worker = worker_name, prefix, "listing templates");

        let mut keys = Vec::new();
        let mut token = None;
        for _ in 0..MAX_LIST_PAGES {
            let page = self.store.list_objects(bucket, prefix, token).await?;
            keys.extend(page.keys.into_iter().filter(|k| k.ends_with(".yaml")));
            token = page.continuation_token;
            if token.is_none() {
                break;
            }
        }
        Ok(keys)
    }

    /// Fetches and parses a template as structured (YAML-compatible) text.
    pub async fn fetch_template(&self, bucket: &str, key: &str) -> Result<serde_json::Value> {
        let bytes = self.store.get_object(bucket, key).await?;
        let text = String::from_utf8(bytes).map_err(|e| StarfleetError::TemplateFetch {
            key: key.to_string(),
            reason: format!("template is not valid UTF-8: {e}"),
        })?;
        serde_yaml::from_str(&text).map_err(|e| StarfleetError::TemplateFetch {
            key: key.to_string(),
            reason: format!("malformed template: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::fake::FakeObjectStore;

    #[tokio::test]
    async fn list_templates_short_circuits_on_direct_yaml_path() {
        let store: Arc<dyn ObjectStore> = Arc::new(FakeObjectStore::new());
        let fetcher = TemplateFetcher::new(store);
        let result = fetcher
            .list_templates("bucket", "w1/single.yaml", "w1")
            .await
            .unwrap();
        assert_eq!(result, vec!["w1/single.yaml".to_string()]);
    }

    #[tokio::test]
    async fn list_templates_filters_to_yaml_suffix() {
        let mut fake = FakeObjectStore::new();
        fake.put("bucket", "w1/a.yaml", b"ok".to_vec());
        fake.put("bucket", "w1/b.json", b"ignored".to_vec());
        fake.put("bucket", "w1/c.yaml", b"ok".to_vec());
        let store: Arc<dyn ObjectStore> = Arc::new(fake);
        let fetcher = TemplateFetcher::new(store);
        let mut result = fetcher.list_templates("bucket", "w1/", "w1").await.unwrap();
        result.sort();
        assert_eq!(result, vec!["w1/a.yaml".to_string(), "w1/c.yaml".to_string()]);
    }

    #[tokio::test]
    async fn fetch_template_missing_object_is_template_fetch_error() {
        let store: Arc<dyn ObjectStore> = Arc::new(FakeObjectStore::new());
        let fetcher = TemplateFetcher::new(store);
        let err = fetcher.fetch_template("bucket", "missing.yaml").await.unwrap_err();
        assert!(matches!(err, StarfleetError::TemplateFetch { .. }));
    }

    #[tokio::test]
    async fn fetch_template_parses_yaml() {
        let mut fake = FakeObjectStore::new();
        fake.put(
            "bucket",
            "w1/a.yaml",
            b"TemplateName: t\nTemplateDescription: d\n".to_vec(),
        );
        let store: Arc<dyn ObjectStore> = Arc::new(fake);
        let fetcher = TemplateFetcher::new(store);
        let parsed = fetcher.fetch_template("bucket", "w1/a.yaml").await.unwrap();
        assert_eq!(parsed["TemplateName"], "t");
    }
}
