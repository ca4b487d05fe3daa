//! Explicitly constructed context bundling the process-wide collaborators
//! (configuration, plugin registry, account index, object store, queue
//! client, alert sink) so the dispatcher and fan-out engine are driven by
//! an owned value rather than global singletons (spec.md §9 design note).
//! Production code builds one `StarfleetContext` per invocation; tests
//! build their own with in-memory fakes.

use std::sync::Arc;

use crate::alert::AlertSink;
use crate::clients::{ObjectStore, QueueClient};
use crate::config::ConfigStore;
use crate::index::AccountIndex;
use crate::registry::WorkerRegistry;
use crate::template::TemplateFetcher;

pub struct StarfleetContext {
    pub config: ConfigStore,
    pub registry: WorkerRegistry,
    pub index: AccountIndex,
    pub object_store: Arc<dyn ObjectStore>,
    pub queue_client: Arc<dyn QueueClient>,
    pub alert_sink: Arc<dyn AlertSink>,
}

impl StarfleetContext {
    pub fn template_fetcher(&self) -> TemplateFetcher {
        TemplateFetcher::new(self.object_store.clone())
    }
}
