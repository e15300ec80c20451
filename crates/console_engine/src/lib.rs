//! Console engine: HTTP access to the retrieval service and effect execution.
mod api;
mod engine;
mod filename;
mod persist;
mod poller;
mod session;
mod types;

pub use api::{ApiSettings, ChannelProgressSink, ConsoleApi, ProgressSink, ReqwestApi};
pub use engine::{EngineConfig, EngineError, EngineHandle};
pub use filename::download_filename;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use poller::JobPoller;
pub use session::Session;
pub use types::{ApiError, Blob, DownloadError, EngineEvent, FailureKind};
