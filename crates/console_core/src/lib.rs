//! Console core: pure state machine for job polling, document filters,
//! result paging and selection, plus the view-model helpers.
mod cache;
mod classify;
mod documents;
mod effect;
mod filters;
mod jobs;
mod msg;
mod notify;
mod selection;
mod state;
mod update;
mod view_model;

pub use cache::{PageRequests, RequestId, ResultCache, DEFAULT_CACHE_CAPACITY};
pub use classify::{classify, default_error, ErrorCategory, FriendlyError, Tone};
pub use documents::{
    BatchFormat, DocumentFile, DocumentSummary, PageResponse, Pagination, ResultPage,
};
pub use effect::{DownloadRequest, Effect, JobAction};
pub use filters::{
    decode, encode, Direction, FilterPatch, FilterState, SortOrder, ALL, DEFAULT_PAGE_SIZE,
    DEFAULT_SORT_FIELD,
};
pub use jobs::{
    module_label, parse_server_time, summarize_modules, triage, JobBoard, JobFile, JobId,
    JobState, NewJob, RetrievalJob, HISTORY_LEN,
};
pub use msg::Msg;
pub use notify::{Level, Notification, Notifications};
pub use selection::SelectionSet;
pub use state::AppState;
pub use update::update;
pub use view_model::{
    format_size, AppViewModel, DocumentRowView, JobBoardView, JobFileRowView, JobFilesView,
    JobRowView,
};
