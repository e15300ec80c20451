use chrono::{DateTime, Utc};

use crate::classify::FriendlyError;
use crate::documents::{DocumentSummary, Pagination};
use crate::filters::FilterState;
use crate::jobs::{
    module_label, summarize_modules, triage, JobFile, JobId, JobState, RetrievalJob,
};
use crate::notify::Notification;

/// Labels shown before collapsing the rest into `+N more`.
pub const MODULES_SHOWN: usize = 2;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub board: JobBoardView,
    /// Files of the job the user opened, if any.
    pub job_files: Option<JobFilesView>,
    pub jobs: Vec<JobRowView>,
    pub jobs_loaded: bool,
    pub polling: bool,
    pub query: String,
    pub filters: FilterState,
    pub active_filter_count: usize,
    pub search_pending: bool,
    pub documents: Vec<DocumentRowView>,
    pub total: u64,
    pub pagination: Pagination,
    pub page_loading: bool,
    pub selected_count: usize,
    pub all_selected: bool,
    pub transfers_in_flight: usize,
    pub notifications: Vec<Notification>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobBoardView {
    pub processing: Vec<JobRowView>,
    pub failed: Vec<JobRowView>,
    pub last_completed: Option<JobRowView>,
    pub history: Vec<JobRowView>,
}

impl JobBoardView {
    pub fn from_jobs(jobs: &[RetrievalJob]) -> Self {
        let board = triage(jobs);
        Self {
            processing: board.processing.iter().map(JobRowView::from).collect(),
            failed: board.failed.iter().map(JobRowView::from).collect(),
            last_completed: board.last_completed.as_ref().map(JobRowView::from),
            history: board.history.iter().map(JobRowView::from).collect(),
        }
    }

    pub fn has_activity(&self) -> bool {
        !self.processing.is_empty() || !self.failed.is_empty() || self.last_completed.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRowView {
    pub job_id: JobId,
    pub state: JobState,
    pub company_ruc: String,
    pub company_name: String,
    pub period: String,
    pub modules: String,
    pub result_count: u64,
    pub created_at: DateTime<Utc>,
    pub status_line: Option<String>,
    pub error: Option<FriendlyError>,
    pub can_retry: bool,
    pub can_cancel: bool,
    pub has_archive: bool,
    pub has_spreadsheet: bool,
}

impl From<&RetrievalJob> for JobRowView {
    fn from(job: &RetrievalJob) -> Self {
        Self {
            job_id: job.id.clone(),
            state: job.state,
            company_ruc: job.company_ruc.clone(),
            company_name: job
                .company_name
                .clone()
                .unwrap_or_else(|| "Unnamed".to_string()),
            period: job.period.clone(),
            modules: summarize_modules(&job.modules, MODULES_SHOWN),
            result_count: job.result_count,
            created_at: job.created_at,
            status_line: job.status_line(),
            error: job.friendly_error(),
            can_retry: job.can_retry(),
            can_cancel: job.can_cancel(),
            has_archive: job.archive_url.is_some(),
            has_spreadsheet: job.spreadsheet_url.is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFilesView {
    pub job_id: JobId,
    pub loading: bool,
    pub files: Vec<JobFileRowView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFileRowView {
    pub id: String,
    pub name: String,
    /// Human label of the document category.
    pub module: String,
    pub kind: String,
    pub size: String,
}

impl From<&JobFile> for JobFileRowView {
    fn from(file: &JobFile) -> Self {
        Self {
            id: file.id.clone(),
            name: file.name.clone(),
            module: module_label(&file.module).to_string(),
            kind: file.kind.to_uppercase(),
            size: format_size(file.size_bytes),
        }
    }
}

/// `1.5 KB` style size with one optional decimal.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{} {}", rounded as u64, UNITS[unit])
    } else {
        format!("{rounded:.1} {}", UNITS[unit])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRowView {
    pub id: String,
    pub kind: String,
    /// `SERIES-NUMBER`.
    pub reference: String,
    pub issued_on: String,
    pub counterparty: String,
    pub counterparty_name: String,
    pub total: Option<f64>,
    pub currency: String,
    pub has_xml: bool,
    pub has_pdf: bool,
    pub selected: bool,
}

impl DocumentRowView {
    pub fn new(doc: &DocumentSummary, selected: bool) -> Self {
        let (ruc, name) = doc.counterparty();
        Self {
            id: doc.id.clone(),
            kind: doc.kind.clone(),
            reference: format!("{}-{}", doc.series, doc.number),
            issued_on: doc.issued_on.clone(),
            counterparty: ruc.to_string(),
            counterparty_name: name.unwrap_or("-").to_string(),
            total: doc.total,
            currency: doc.currency.clone(),
            has_xml: doc.has_xml,
            has_pdf: doc.has_pdf,
            selected,
        }
    }
}
