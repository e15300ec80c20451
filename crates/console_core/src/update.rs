use console_logging::console_warn;

use crate::documents::DocumentFile;
use crate::effect::{DownloadRequest, JobAction};
use crate::jobs::{JobId, JobState, NewJob, RetrievalJob};
use crate::{AppState, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::PollTick => state.request_poll(false),
        Msg::RefreshJobsClicked => state.request_poll(true),
        Msg::JobsLoaded(result) => state.apply_jobs(result),
        Msg::CreateJobSubmitted(job) => match validate_new_job(&job) {
            Ok(()) => vec![Effect::CreateJob(job)],
            Err(reason) => reject(&mut state, reason),
        },
        Msg::RetryClicked(job_id) => match state.find_job(&job_id) {
            Some(job) if job.can_retry() => vec![Effect::RetryJob(job_id)],
            Some(job) => {
                let reason = format!("A {} job cannot be retried", job.state.label());
                reject(&mut state, reason)
            }
            None => reject(&mut state, format!("Unknown job {job_id}")),
        },
        Msg::CancelClicked(job_id) => match state.find_job(&job_id) {
            Some(job) if job.can_cancel() => vec![Effect::CancelJob(job_id)],
            Some(job) => {
                let reason = format!("A {} job cannot be cancelled", job.state.label());
                reject(&mut state, reason)
            }
            None => reject(&mut state, format!("Unknown job {job_id}")),
        },
        Msg::JobActionFinished {
            action,
            job_id,
            result,
        } => {
            state.mark_dirty();
            match result {
                Ok(()) => {
                    state.notifications.success(action_succeeded(action));
                    // The effect is only observable through the next poll.
                    state.request_poll(true)
                }
                Err(message) => {
                    console_warn!("{:?} failed for job {:?}: {}", action, job_id, message);
                    state
                        .notifications
                        .error(format!("{}: {message}", action_failed(action)));
                    Vec::new()
                }
            }
        }
        Msg::DownloadArchiveClicked(job_id) => completed_job_download(&mut state, &job_id, |job| {
            let archive_url = job.archive_url.clone()?;
            Some(DownloadRequest::JobArchive {
                job_id: job.id.clone(),
                ruc: job.company_ruc.clone(),
                period: job.period.clone(),
                archive_url: Some(archive_url),
            })
        }),
        Msg::DownloadSpreadsheetClicked(job_id) => {
            completed_job_download(&mut state, &job_id, |job| {
                Some(DownloadRequest::JobSpreadsheet {
                    job_id: job.id.clone(),
                    ruc: job.company_ruc.clone(),
                    period: job.period.clone(),
                })
            })
        }
        Msg::JobFilesClicked(job_id) => match state.find_job(&job_id).map(|job| job.state) {
            Some(JobState::Completed) => state.request_job_files(job_id),
            Some(job_state) => {
                let reason = format!("Files of a {} job are not available", job_state.label());
                reject(&mut state, reason)
            }
            None => reject(&mut state, format!("Unknown job {job_id}")),
        },
        Msg::JobFilesLoaded { job_id, result } => {
            state.apply_job_files(job_id, result);
            Vec::new()
        }
        Msg::JobFileClicked(file_id) => match state.job_file_request(&file_id) {
            Some(request) => start_download(&mut state, request),
            None => reject(&mut state, format!("File {file_id} is not listed")),
        },
        Msg::LocationChanged(raw) => state.set_location(&raw),
        Msg::FiltersPatched(patch) => state.patch_filters(&patch),
        Msg::FiltersCleared => state.clear_filters(),
        Msg::SearchSettled { token } => state.settle_search(token),
        Msg::RefreshPageClicked => state.refresh_page(true),
        Msg::PageLoaded {
            request_id,
            key,
            result,
        } => {
            state.apply_page(request_id, key, result);
            Vec::new()
        }
        Msg::SelectionToggled(id) => {
            let page_ids: Vec<String> = state.page_ids().into_iter().map(str::to_string).collect();
            if state
                .selection
                .toggle(&id, page_ids.iter().map(String::as_str))
            {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::SelectAllToggled => {
            let page_ids: Vec<String> = state.page_ids().into_iter().map(str::to_string).collect();
            state.selection.toggle_all(page_ids.iter().map(String::as_str));
            state.mark_dirty();
            Vec::new()
        }
        Msg::SelectionCleared => {
            if !state.selection.is_empty() {
                state.selection.clear();
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::BatchDownloadClicked(format) => {
            if state.selection.is_empty() {
                reject(&mut state, "Select at least one document".to_string())
            } else {
                let ids = state.selection.ids();
                start_download(&mut state, DownloadRequest::Batch { ids, format })
            }
        }
        Msg::ExportSelectionClicked => {
            if state.selection.is_empty() {
                reject(&mut state, "Select at least one document".to_string())
            } else {
                let ids = state.selection.ids();
                start_download(&mut state, DownloadRequest::Selection { ids })
            }
        }
        Msg::ExportFilteredClicked => {
            let filters = state.filters();
            start_download(&mut state, DownloadRequest::Filtered { filters })
        }
        Msg::DocumentFileClicked { id, file } => document_download(&mut state, &id, file),
        Msg::DownloadFinished { request, result } => {
            state.end_transfer();
            match result {
                Ok(saved) => {
                    state.notifications.success(format!("Saved {saved}"));
                }
                Err(message) => {
                    console_warn!("Download of {} failed: {}", request.describe(), message);
                    state.notifications.error(format!(
                        "Download of {} failed: {message}",
                        request.describe()
                    ));
                }
            }
            Vec::new()
        }
        Msg::NotificationDismissed(id) => {
            if state.notifications.dismiss(id) {
                state.mark_dirty();
            }
            Vec::new()
        }
    };

    (state, effects)
}

fn validate_new_job(job: &NewJob) -> Result<(), String> {
    if job.company_id.trim().is_empty() {
        return Err("Choose a company".to_string());
    }
    if job.period.trim().is_empty() {
        return Err("Choose a period".to_string());
    }
    if job.modules.is_empty() {
        return Err("Choose at least one document category".to_string());
    }
    Ok(())
}

/// Explicit user actions that cannot be issued get a visible notification.
fn reject(state: &mut AppState, reason: String) -> Vec<Effect> {
    console_warn!("Rejected user action: {}", reason);
    state.notifications.error(reason);
    state.mark_dirty();
    Vec::new()
}

fn start_download(state: &mut AppState, request: DownloadRequest) -> Vec<Effect> {
    state.begin_transfer();
    vec![Effect::Download(request)]
}

/// `build` returns `None` when the job has no such artifact.
fn completed_job_download(
    state: &mut AppState,
    job_id: &JobId,
    build: impl FnOnce(&RetrievalJob) -> Option<DownloadRequest>,
) -> Vec<Effect> {
    let Some(job) = state.find_job(job_id) else {
        return reject(state, format!("Unknown job {job_id}"));
    };
    if job.state != JobState::Completed {
        let reason = format!("Files of a {} job are not available", job.state.label());
        return reject(state, reason);
    }
    match build(job) {
        Some(request) => start_download(state, request),
        None => reject(state, format!("No file stored yet for job {job_id}")),
    }
}

fn document_download(state: &mut AppState, id: &str, file: DocumentFile) -> Vec<Effect> {
    let Some(doc) = state
        .displayed_page()
        .and_then(|page| page.items.iter().find(|item| item.id == id))
    else {
        return reject(state, format!("Document {id} is not on this page"));
    };
    let available = match file {
        DocumentFile::Xml => doc.has_xml,
        DocumentFile::Pdf => doc.has_pdf,
    };
    if !available {
        let reason = format!(
            "No {} stored for {}-{}",
            file.extension().to_uppercase(),
            doc.series,
            doc.number
        );
        return reject(state, reason);
    }
    let request = DownloadRequest::Document {
        id: doc.id.clone(),
        series: doc.series.clone(),
        number: doc.number.clone(),
        file,
    };
    start_download(state, request)
}

fn action_succeeded(action: JobAction) -> &'static str {
    match action {
        JobAction::Create => "Download started",
        JobAction::Retry => "Retrying download",
        JobAction::Cancel => "Download cancelled",
    }
}

fn action_failed(action: JobAction) -> &'static str {
    match action {
        JobAction::Create => "Could not start download",
        JobAction::Retry => "Could not retry download",
        JobAction::Cancel => "Could not cancel download",
    }
}
