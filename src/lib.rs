pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod services;

pub use adapters::{ReviewTransport, TelegramTransport, TransportError, TransportResult};
pub use config::AppConfig;
pub use domain::{
    ContentPayload, Decision, DispatchEntry, Origin, RequestStatus, RequestToken,
    ResolutionRecord, ResolveOutcome, ReviewAction, SubmissionRequest, Submitter,
};
pub use error::{RelayError, Result};
pub use persistence::{RegistrySnapshot, SnapshotStore};
pub use services::{
    Admission, Arbiter, ArchiveSink, Dispatcher, RateLimiter, RelayEngine, RequestRegistry,
    SubmissionOutcome,
};
