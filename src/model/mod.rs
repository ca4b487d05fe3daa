pub mod account;
pub mod error;
pub mod message;
pub mod payload;
pub mod selector;
pub mod worker;

pub use account::{Account, AccountId, OuType, ParentRef, Region};
pub use error::{Result, StarfleetError};
pub use message::{FanOutRequest, StoreChangeEvent, StoreChangeRecord, TimedEvent};
pub use payload::{AccountPayload, AccountRegionPayload, BaseTemplate};
pub use selector::{AccountSelector, TagClause};
pub use worker::{FanOutStrategy, InvocationSource, TimedFrequency, WorkerConfig, WorkerDescriptor};
