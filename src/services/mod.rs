pub mod arbiter;
pub mod archive;
pub mod dispatcher;
pub mod engine;
pub mod rate_limiter;
pub mod registry;

pub use arbiter::Arbiter;
pub use archive::ArchiveSink;
pub use dispatcher::Dispatcher;
pub use engine::{RelayEngine, SubmissionOutcome};
pub use rate_limiter::{Admission, RateLimiter};
pub use registry::RequestRegistry;
