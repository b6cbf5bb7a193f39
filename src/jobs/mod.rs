/// Job Tracking Layer
///
/// Background executions are tracked as jobs callers poll by id:
/// - Job records and lifecycle events
/// - The in-memory `JobStore` with monotonic timestamps
/// - Async notices handed back when work is deferred
/// - Best-effort notifiers for status listeners

pub mod types;

pub mod store;

pub mod notice;

pub mod notifier;

pub use notice::{build_async_notice, retrieval_tool_name, AsyncNotice, NoticeOptions, RetrievalPayload};
pub use notifier::{BroadcastNotifier, JobNotifier};
pub use store::JobStore;
pub use types::{Job, JobEvent, JobStatus};
