use thiserror::Error;

/// Top-level error type for the tasking pipeline.
///
/// Every variant here corresponds to one of the error kinds the core is
/// specified to surface to its invoker; none of them are recovered locally.
#[derive(Error, Debug)]
pub enum StarfleetError {
    #[error("bad configuration: {0}")]
    BadConfiguration(String),

    #[error("unknown account index plugin: {0}")]
    UnknownAccountIndex(String),

    #[error("no ship plugin registered for worker '{0}'")]
    NoShipPlugin(String),

    #[error("store-change event references bucket '{actual}', expected '{expected}'")]
    InvalidBucket { expected: String, actual: String },

    #[error("template fetch failed for '{key}': {reason}")]
    TemplateFetch { key: String, reason: String },

    #[error("payload validation failed for worker '{worker}': {}", .errors.join("; "))]
    PayloadValidation { worker: String, errors: Vec<String> },

    #[error("template for worker '{worker}' does not match its declared fan-out strategy: {reason}")]
    InvalidTemplateForFanout { worker: String, reason: String },

    #[error("account indexer process failed: {0}")]
    AccountIndexerProcess(String),

    #[error("alert sink rejected a problem-priority message: {0}")]
    SinkError(String),

    #[error("object store error: {0}")]
    ObjectStore(String),

    #[error("queue error: {0}")]
    Queue(String),
}

pub type Result<T> = std::result::Result<T, StarfleetError>;
