use crate::cache::RequestId;
use crate::documents::{BatchFormat, DocumentFile, PageResponse};
use crate::effect::{DownloadRequest, JobAction};
use crate::filters::FilterPatch;
use crate::jobs::{JobFile, JobId, NewJob, RetrievalJob};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Poll timer fired.
    PollTick,
    /// User asked for a fresh job list.
    RefreshJobsClicked,
    /// Job list poll resolved. Errors are transport messages.
    JobsLoaded(Result<Vec<RetrievalJob>, String>),
    CreateJobSubmitted(NewJob),
    RetryClicked(JobId),
    CancelClicked(JobId),
    /// Acknowledgement of a create/retry/cancel request.
    JobActionFinished {
        action: JobAction,
        job_id: Option<JobId>,
        result: Result<(), String>,
    },
    DownloadArchiveClicked(JobId),
    DownloadSpreadsheetClicked(JobId),
    /// Show the individual files of a completed job.
    JobFilesClicked(JobId),
    JobFilesLoaded {
        job_id: JobId,
        result: Result<Vec<JobFile>, String>,
    },
    /// Download one file from the listed job files.
    JobFileClicked(String),
    /// Address bar set from outside (startup, navigation, pasted link).
    LocationChanged(String),
    /// A filter control changed.
    FiltersPatched(FilterPatch),
    FiltersCleared,
    /// Debounce delay for the search box elapsed.
    SearchSettled { token: u64 },
    RefreshPageClicked,
    PageLoaded {
        request_id: RequestId,
        key: String,
        result: Result<PageResponse, String>,
    },
    SelectionToggled(String),
    SelectAllToggled,
    SelectionCleared,
    BatchDownloadClicked(BatchFormat),
    ExportSelectionClicked,
    ExportFilteredClicked,
    DocumentFileClicked { id: String, file: DocumentFile },
    /// A download finished; `Ok` carries where the file was saved.
    DownloadFinished {
        request: DownloadRequest,
        result: Result<String, String>,
    },
    NotificationDismissed(u64),
}
