use crate::cache::RequestId;
use crate::documents::{BatchFormat, DocumentFile};
use crate::filters::FilterState;
use crate::jobs::{JobId, NewJob};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Re-list recent jobs. At most one is outstanding at a time.
    FetchJobs,
    CreateJob(NewJob),
    RetryJob(JobId),
    CancelJob(JobId),
    FetchJobFiles(JobId),
    /// Replace the address-bar query in place (no new history entry).
    ReplaceQuery(String),
    /// Report `Msg::SearchSettled { token }` after the debounce delay.
    ScheduleSearchSettle { token: u64 },
    FetchPage {
        request_id: RequestId,
        key: String,
        filters: FilterState,
    },
    Download(DownloadRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    Create,
    Retry,
    Cancel,
}

/// A binary download saved client-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadRequest {
    JobArchive {
        job_id: JobId,
        ruc: String,
        period: String,
        archive_url: Option<String>,
    },
    JobSpreadsheet {
        job_id: JobId,
        ruc: String,
        period: String,
    },
    JobFile {
        job_id: JobId,
        file_id: String,
        name: String,
    },
    Batch {
        ids: Vec<String>,
        format: BatchFormat,
    },
    Selection {
        ids: Vec<String>,
    },
    Filtered {
        filters: FilterState,
    },
    Document {
        id: String,
        series: String,
        number: String,
        file: DocumentFile,
    },
}

impl DownloadRequest {
    pub fn describe(&self) -> String {
        match self {
            DownloadRequest::JobArchive { ruc, period, .. } => format!("archive {ruc} {period}"),
            DownloadRequest::JobSpreadsheet { ruc, period, .. } => {
                format!("spreadsheet {ruc} {period}")
            }
            DownloadRequest::JobFile { name, .. } => name.clone(),
            DownloadRequest::Batch { ids, format } => {
                format!("{} document(s) as {}", ids.len(), format.as_str())
            }
            DownloadRequest::Selection { ids } => format!("export of {} document(s)", ids.len()),
            DownloadRequest::Filtered { .. } => "export of filtered documents".to_string(),
            DownloadRequest::Document {
                series,
                number,
                file,
                ..
            } => format!("{series}-{number}.{}", file.extension()),
        }
    }
}
