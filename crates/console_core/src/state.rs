use console_logging::{console_debug, console_warn};

use crate::cache::{PageRequests, RequestId, ResultCache};
use crate::documents::{PageResponse, ResultPage};
use crate::effect::Effect;
use crate::filters::{self, FilterPatch, FilterState};
use crate::effect::DownloadRequest;
use crate::jobs::{JobFile, JobId, RetrievalJob};
use crate::notify::Notifications;
use crate::selection::SelectionSet;
use crate::view_model::{
    AppViewModel, DocumentRowView, JobBoardView, JobFileRowView, JobFilesView, JobRowView,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Displayed {
    pub key: String,
    pub page: ResultPage,
}

/// File listing of one job; `files` is `None` while it loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct JobFiles {
    pub job_id: JobId,
    pub files: Option<Vec<JobFile>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    dirty: bool,
    // Jobs, newest first.
    jobs: Vec<RetrievalJob>,
    jobs_loaded: bool,
    poll_in_flight: bool,
    poll_again: bool,
    job_files: Option<JobFiles>,
    // Canonical query string; the only stored copy of the filters.
    query: String,
    search_token: u64,
    search_pending: bool,
    displayed: Option<Displayed>,
    page_generation: u64,
    cache: ResultCache,
    requests: PageRequests,
    pub(crate) selection: SelectionSet,
    pub(crate) notifications: Notifications,
    transfers_in_flight: usize,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_capacity(capacity: usize) -> Self {
        Self {
            cache: ResultCache::with_capacity(capacity),
            ..Self::default()
        }
    }

    pub fn view(&self) -> AppViewModel {
        let filters = self.filters();
        let (documents, total, pagination) = match &self.displayed {
            Some(displayed) => (
                displayed
                    .page
                    .items
                    .iter()
                    .map(|item| DocumentRowView::new(item, self.selection.contains(&item.id)))
                    .collect(),
                displayed.page.total,
                displayed.page.pagination(),
            ),
            None => (Vec::new(), 0, Default::default()),
        };
        let page_ids = self.page_ids();
        let all_selected =
            !page_ids.is_empty() && page_ids.iter().all(|id| self.selection.contains(id));

        AppViewModel {
            board: JobBoardView::from_jobs(&self.jobs),
            job_files: self.job_files.as_ref().map(|listing| JobFilesView {
                job_id: listing.job_id.clone(),
                loading: listing.files.is_none(),
                files: listing
                    .files
                    .iter()
                    .flatten()
                    .map(JobFileRowView::from)
                    .collect(),
            }),
            jobs: self.jobs.iter().map(JobRowView::from).collect(),
            jobs_loaded: self.jobs_loaded,
            polling: self.poll_in_flight,
            query: self.query.clone(),
            active_filter_count: filters.active_filter_count(),
            filters,
            search_pending: self.search_pending,
            documents,
            total,
            pagination,
            page_loading: self.requests.pending_key().is_some(),
            selected_count: self.selection.len(),
            all_selected,
            transfers_in_flight: self.transfers_in_flight,
            notifications: self.notifications.items().to_vec(),
            dirty: self.dirty,
        }
    }

    /// Returns whether a render is due and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Filters decoded from the canonical query.
    pub fn filters(&self) -> FilterState {
        filters::decode(&self.query)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn jobs(&self) -> &[RetrievalJob] {
        &self.jobs
    }

    pub fn displayed_page(&self) -> Option<&ResultPage> {
        self.displayed.as_ref().map(|d| &d.page)
    }

    pub(crate) fn find_job(&self, job_id: &JobId) -> Option<&RetrievalJob> {
        self.jobs.iter().find(|job| &job.id == job_id)
    }

    pub(crate) fn page_ids(&self) -> Vec<&str> {
        self.displayed
            .as_ref()
            .map(|d| d.page.ids().collect())
            .unwrap_or_default()
    }

    // --- jobs ---

    /// Issue a poll unless one is outstanding. `follow_up` queues another poll
    /// for when the outstanding one resolves, since it may predate a user action.
    pub(crate) fn request_poll(&mut self, follow_up: bool) -> Vec<Effect> {
        if self.poll_in_flight {
            if follow_up {
                self.poll_again = true;
            }
            return Vec::new();
        }
        self.poll_in_flight = true;
        vec![Effect::FetchJobs]
    }

    pub(crate) fn apply_jobs(&mut self, result: Result<Vec<RetrievalJob>, String>) -> Vec<Effect> {
        self.poll_in_flight = false;
        match result {
            Ok(mut jobs) => {
                jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                if !self.jobs_loaded || jobs != self.jobs {
                    self.mark_dirty();
                }
                self.jobs = jobs;
                self.jobs_loaded = true;
            }
            Err(message) => {
                // Passive polling keeps the last known list on screen.
                console_warn!("Job poll failed, keeping stale list: {}", message);
            }
        }
        if std::mem::take(&mut self.poll_again) {
            return self.request_poll(false);
        }
        Vec::new()
    }

    pub(crate) fn request_job_files(&mut self, job_id: JobId) -> Vec<Effect> {
        self.job_files = Some(JobFiles {
            job_id: job_id.clone(),
            files: None,
        });
        self.mark_dirty();
        vec![Effect::FetchJobFiles(job_id)]
    }

    pub(crate) fn apply_job_files(&mut self, job_id: JobId, result: Result<Vec<JobFile>, String>) {
        if !self
            .job_files
            .as_ref()
            .is_some_and(|listing| listing.job_id == job_id)
        {
            console_debug!("Ignoring file listing of job {} that is no longer shown", job_id);
            return;
        }
        match result {
            Ok(files) => {
                self.job_files = Some(JobFiles {
                    job_id,
                    files: Some(files),
                });
            }
            Err(message) => {
                self.job_files = None;
                self.notifications
                    .error(format!("Could not list files of job {job_id}: {message}"));
            }
        }
        self.mark_dirty();
    }

    /// Download request for a file of the listed job.
    pub(crate) fn job_file_request(&self, file_id: &str) -> Option<DownloadRequest> {
        let listing = self.job_files.as_ref()?;
        let file = listing.files.as_ref()?.iter().find(|file| file.id == file_id)?;
        Some(DownloadRequest::JobFile {
            job_id: listing.job_id.clone(),
            file_id: file.id.clone(),
            name: file.name.clone(),
        })
    }

    // --- filters and pages ---

    /// Set the query from outside; canonicalizes it and applies it immediately.
    pub(crate) fn set_location(&mut self, raw: &str) -> Vec<Effect> {
        let canonical = filters::encode(&filters::decode(raw));
        let mut effects = Vec::new();
        // Rewrite a non-canonical address even when the filters are unchanged.
        if canonical != self.query || canonical != raw.strip_prefix('?').unwrap_or(raw) {
            effects.push(Effect::ReplaceQuery(canonical.clone()));
        }
        self.query = canonical;
        self.cancel_pending_search();
        self.mark_dirty();
        effects.extend(self.refresh_page(false));
        effects
    }

    pub(crate) fn patch_filters(&mut self, patch: &FilterPatch) -> Vec<Effect> {
        let next = filters::encode(&self.filters().apply(patch));
        if next == self.query {
            return Vec::new();
        }
        self.query = next.clone();
        self.mark_dirty();
        let mut effects = vec![Effect::ReplaceQuery(next)];

        if patch.is_search_only() {
            self.search_token += 1;
            self.search_pending = true;
            effects.push(Effect::ScheduleSearchSettle {
                token: self.search_token,
            });
        } else {
            // Anything else applies at once, folding in a pending search.
            self.cancel_pending_search();
            effects.extend(self.refresh_page(false));
        }
        effects
    }

    pub(crate) fn clear_filters(&mut self) -> Vec<Effect> {
        if self.query.is_empty() && !self.search_pending {
            return Vec::new();
        }
        self.query.clear();
        self.cancel_pending_search();
        self.mark_dirty();
        let mut effects = vec![Effect::ReplaceQuery(String::new())];
        effects.extend(self.refresh_page(false));
        effects
    }

    pub(crate) fn settle_search(&mut self, token: u64) -> Vec<Effect> {
        if !self.search_pending || token != self.search_token {
            console_debug!("Ignoring superseded search settle token={}", token);
            return Vec::new();
        }
        self.search_pending = false;
        self.mark_dirty();
        self.refresh_page(false)
    }

    fn cancel_pending_search(&mut self) {
        if self.search_pending {
            self.search_token += 1;
            self.search_pending = false;
        }
    }

    /// Bring the displayed page in line with the query. `force` bypasses the cache.
    pub(crate) fn refresh_page(&mut self, force: bool) -> Vec<Effect> {
        let filters = self.filters();
        let key = filters::encode(&filters);

        if force {
            self.cache.invalidate(&key);
        } else {
            if self.displayed.as_ref().is_some_and(|d| d.key == key) {
                self.requests.supersede();
                return Vec::new();
            }
            if let Some(page) = self.cache.get(&key).cloned() {
                console_debug!("Page cache hit key={:?}", key);
                self.requests.supersede();
                self.display(key, page);
                return Vec::new();
            }
            if self.requests.pending_key() == Some(key.as_str()) {
                return Vec::new();
            }
        }

        let request_id = self.requests.issue(&key);
        if force {
            self.requests.require_fresh(&key, request_id);
        }
        self.mark_dirty();
        vec![Effect::FetchPage {
            request_id,
            key,
            filters,
        }]
    }

    pub(crate) fn apply_page(
        &mut self,
        request_id: RequestId,
        key: String,
        result: Result<PageResponse, String>,
    ) {
        let current = self.requests.is_latest(request_id, &key);
        match result {
            Ok(response) => {
                let page = ResultPage {
                    items: response.items,
                    total: response.total,
                    filters: filters::decode(&key),
                };
                // A superseded response is still valid for its own key,
                // unless a refresh of that key was asked for after it.
                if self.requests.admit(request_id, &key) {
                    self.cache.insert(key.clone(), page.clone());
                } else {
                    console_debug!("Not caching pre-refresh page request_id={}", request_id);
                }
                if current {
                    self.requests.settle(request_id);
                    self.display(key, page);
                } else {
                    console_debug!("Discarding stale page response request_id={}", request_id);
                }
            }
            Err(message) => {
                if !current {
                    console_debug!("Discarding stale page error request_id={}", request_id);
                    return;
                }
                self.requests.settle(request_id);
                self.notifications
                    .error(format!("Could not load documents: {message}"));
                let filters = filters::decode(&key);
                self.display(key, ResultPage::empty(filters));
            }
        }
    }

    fn display(&mut self, key: String, page: ResultPage) {
        self.page_generation += 1;
        if self.selection.rebind(self.page_generation) {
            console_debug!("Selection cleared for new page key={:?}", key);
        }
        self.displayed = Some(Displayed { key, page });
        self.mark_dirty();
    }

    // --- transfers ---

    pub(crate) fn begin_transfer(&mut self) {
        self.transfers_in_flight += 1;
        self.mark_dirty();
    }

    pub(crate) fn end_transfer(&mut self) {
        self.transfers_in_flight = self.transfers_in_flight.saturating_sub(1);
        self.mark_dirty();
    }
}
