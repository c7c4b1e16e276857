pub mod content;
pub mod dispatch;
pub mod request;
pub mod resolution;

pub use content::ContentPayload;
pub use dispatch::DispatchEntry;
pub use request::{Origin, RequestStatus, RequestToken, SubmissionRequest, Submitter};
pub use resolution::{Decision, ResolutionRecord, ResolveOutcome, ReviewAction};
