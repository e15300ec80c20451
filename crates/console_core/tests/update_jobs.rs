use std::sync::Once;

use console_core::{
    update, AppState, DownloadRequest, Effect, ErrorCategory, JobAction, JobFile, JobId, JobState,
    Level, Msg, NewJob, RetrievalJob,
};
use serde_json::json;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(console_logging::initialize_for_tests);
}

fn job(id: &str, state: &str, created_at: &str) -> RetrievalJob {
    let errores = if state == "failed" {
        json!("ETIMEDOUT while contacting portal")
    } else {
        json!(null)
    };
    serde_json::from_value(json!({
        "id": id,
        "empresa_ruc": "20123456789",
        "empresa_razon_social": null,
        "estado": state,
        "periodo": "2024-05",
        "modulos": ["facturas_emitidas"],
        "total_comprobantes": 12,
        "progreso": 40,
        "mensaje_progreso": "Downloading page 2",
        "errores": errores,
        "archivo_url": (state == "completed").then(|| format!("storage/{id}.zip")),
        "created_at": created_at,
    }))
    .expect("valid job json")
}

fn loaded(jobs: Vec<RetrievalJob>) -> AppState {
    let (state, _) = update(AppState::new(), Msg::PollTick);
    let (state, _) = update(state, Msg::JobsLoaded(Ok(jobs)));
    state
}

#[test]
fn triage_shows_actionable_jobs_before_history() {
    init_logging();
    let state = loaded(vec![
        job("p", "processing", "2024-05-01T10:00:00"),
        job("f", "failed", "2024-05-01T09:00:00"),
        job("c1", "completed", "2024-05-01T01:00:00"),
        job("c2", "completed", "2024-05-01T02:00:00"),
        job("c3", "completed", "2024-05-01T03:00:00"),
    ]);
    let board = state.view().board;

    assert_eq!(board.processing.len(), 1);
    assert_eq!(board.failed.len(), 1);
    assert_eq!(
        board.last_completed.map(|row| row.job_id),
        Some(JobId::new("c3"))
    );
    let history: Vec<_> = board.history.iter().map(|r| r.job_id.as_str()).collect();
    assert_eq!(history, vec!["c2", "c1"]);
}

#[test]
fn history_is_capped_at_three() {
    let jobs = (1..=6)
        .map(|i| job(&format!("c{i}"), "completed", &format!("2024-05-0{i}T00:00:00")))
        .collect();
    let board = loaded(jobs).view().board;

    assert_eq!(board.last_completed.unwrap().job_id, JobId::new("c6"));
    let history: Vec<_> = board.history.iter().map(|r| r.job_id.as_str()).collect();
    assert_eq!(history, vec!["c5", "c4", "c3"]);
}

#[test]
fn failed_rows_carry_classification() {
    let state = loaded(vec![job("f", "failed", "2024-05-01T09:00:00Z")]);
    let row = &state.view().board.failed[0];
    assert_eq!(row.error.as_ref().unwrap().category, ErrorCategory::Temporary);
    assert!(row.can_retry);
    assert!(!row.can_cancel);
}

#[test]
fn polls_never_stack() {
    init_logging();
    let (state, effects) = update(AppState::new(), Msg::PollTick);
    assert_eq!(effects, vec![Effect::FetchJobs]);

    // Timer fires again before the first poll resolves.
    let (state, effects) = update(state, Msg::PollTick);
    assert!(effects.is_empty());

    let (state, effects) = update(state, Msg::JobsLoaded(Ok(Vec::new())));
    assert!(effects.is_empty());
    let (_state, effects) = update(state, Msg::PollTick);
    assert_eq!(effects, vec![Effect::FetchJobs]);
}

#[test]
fn failed_poll_keeps_stale_list_without_notification() {
    init_logging();
    let state = loaded(vec![job("p", "processing", "2024-05-01T10:00:00")]);
    let (state, _) = update(state, Msg::PollTick);
    let (state, effects) = update(state, Msg::JobsLoaded(Err("connection refused".into())));

    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.jobs.len(), 1);
    assert!(view.notifications.is_empty());
    assert!(!view.polling);
}

#[test]
fn retry_only_from_failed_and_not_optimistic() {
    init_logging();
    let state = loaded(vec![
        job("f", "failed", "2024-05-01T09:00:00"),
        job("c", "completed", "2024-05-01T08:00:00"),
    ]);

    let (state, effects) = update(state, Msg::RetryClicked(JobId::new("f")));
    assert_eq!(effects, vec![Effect::RetryJob(JobId::new("f"))]);
    // Nothing changes locally until the next poll.
    let failed = state.jobs().iter().find(|j| j.id.as_str() == "f").unwrap();
    assert_eq!(failed.state, JobState::Failed);

    let (state, effects) = update(state, Msg::RetryClicked(JobId::new("c")));
    assert!(effects.is_empty());
    let notes = state.view().notifications;
    assert_eq!(notes.last().unwrap().level, Level::Error);
}

#[test]
fn cancel_only_from_pending_or_processing() {
    let state = loaded(vec![
        job("p", "pending", "2024-05-01T11:00:00"),
        job("r", "processing", "2024-05-01T10:00:00"),
        job("x", "cancelled", "2024-05-01T09:00:00"),
    ]);

    let (state, effects) = update(state, Msg::CancelClicked(JobId::new("p")));
    assert_eq!(effects, vec![Effect::CancelJob(JobId::new("p"))]);
    let (state, effects) = update(state, Msg::CancelClicked(JobId::new("r")));
    assert_eq!(effects, vec![Effect::CancelJob(JobId::new("r"))]);
    let (state, effects) = update(state, Msg::CancelClicked(JobId::new("x")));
    assert!(effects.is_empty());
    // Cancelled jobs have no retry path either.
    let (_state, effects) = update(state, Msg::RetryClicked(JobId::new("x")));
    assert!(effects.is_empty());
}

#[test]
fn acknowledged_action_repolls_once_outstanding_poll_resolves() {
    init_logging();
    let state = loaded(vec![job("f", "failed", "2024-05-01T09:00:00")]);
    let (state, effects) = update(state, Msg::PollTick);
    assert_eq!(effects, vec![Effect::FetchJobs]);

    let (state, effects) = update(
        state,
        Msg::JobActionFinished {
            action: JobAction::Retry,
            job_id: Some(JobId::new("f")),
            result: Ok(()),
        },
    );
    // A poll is already in flight; the follow-up waits for it.
    assert!(effects.is_empty());
    assert_eq!(state.view().notifications.last().unwrap().level, Level::Success);

    let (_state, effects) = update(state, Msg::JobsLoaded(Ok(Vec::new())));
    assert_eq!(effects, vec![Effect::FetchJobs]);
}

#[test]
fn failed_action_surfaces_notification_and_keeps_state() {
    let state = loaded(vec![job("f", "failed", "2024-05-01T09:00:00")]);
    let before = state.jobs().to_vec();
    let (state, effects) = update(
        state,
        Msg::JobActionFinished {
            action: JobAction::Retry,
            job_id: Some(JobId::new("f")),
            result: Err("HTTP 500".into()),
        },
    );

    assert!(effects.is_empty());
    assert_eq!(state.jobs(), before.as_slice());
    let note = state.view().notifications.last().cloned().unwrap();
    assert_eq!(note.level, Level::Error);
    assert!(note.text.contains("HTTP 500"));

    let (state, _) = update(state, Msg::NotificationDismissed(note.id));
    assert!(state.view().notifications.is_empty());
}

#[test]
fn create_job_is_validated() {
    let new_job = NewJob {
        company_id: "c1".into(),
        period: "2024-05".into(),
        modules: vec!["boletas_emitidas".into()],
        formats: vec!["xml".into()],
    };
    let (state, effects) = update(AppState::new(), Msg::CreateJobSubmitted(new_job.clone()));
    assert_eq!(effects, vec![Effect::CreateJob(new_job.clone())]);

    let invalid = NewJob {
        modules: Vec::new(),
        ..new_job
    };
    let (state, effects) = update(state, Msg::CreateJobSubmitted(invalid));
    assert!(effects.is_empty());
    assert_eq!(state.view().notifications.len(), 1);
}

#[test]
fn artifacts_only_for_completed_jobs() {
    let state = loaded(vec![
        job("c", "completed", "2024-05-01T08:00:00"),
        job("p", "processing", "2024-05-01T09:00:00"),
    ]);
    let (state, effects) = update(state, Msg::DownloadArchiveClicked(JobId::new("c")));
    assert_eq!(effects.len(), 1);
    assert_eq!(state.view().transfers_in_flight, 1);

    let (state, effects) = update(state, Msg::DownloadSpreadsheetClicked(JobId::new("p")));
    assert!(effects.is_empty());
    assert_eq!(state.view().transfers_in_flight, 1);
}

#[test]
fn archive_needs_a_stored_file() {
    let mut bare = job("c", "completed", "2024-05-01T08:00:00");
    bare.archive_url = None;
    let state = loaded(vec![bare]);

    let (state, effects) = update(state, Msg::DownloadArchiveClicked(JobId::new("c")));
    assert!(effects.is_empty());
    assert_eq!(state.view().transfers_in_flight, 0);
    assert_eq!(state.view().notifications[0].level, Level::Error);
}

#[test]
fn archive_request_carries_stored_location() {
    let state = loaded(vec![job("c", "completed", "2024-05-01T08:00:00")]);
    let (_, effects) = update(state, Msg::DownloadArchiveClicked(JobId::new("c")));
    assert_eq!(
        effects,
        vec![Effect::Download(DownloadRequest::JobArchive {
            job_id: JobId::new("c"),
            ruc: "20123456789".into(),
            period: "2024-05".into(),
            archive_url: Some("storage/c.zip".into()),
        })]
    );
}

fn job_file(id: &str, name: &str) -> JobFile {
    serde_json::from_value(json!({
        "id": id,
        "nombre": name,
        "modulo": "facturas_emitidas",
        "tipo_archivo": "zip",
        "tamano_bytes": 1536,
    }))
    .expect("valid file json")
}

#[test]
fn job_files_are_listed_then_downloaded_by_id() {
    init_logging();
    let state = loaded(vec![
        job("c", "completed", "2024-05-01T08:00:00"),
        job("p", "processing", "2024-05-01T09:00:00"),
    ]);

    let (state, effects) = update(state, Msg::JobFilesClicked(JobId::new("p")));
    assert!(effects.is_empty());

    let (state, effects) = update(state, Msg::JobFilesClicked(JobId::new("c")));
    assert_eq!(effects, vec![Effect::FetchJobFiles(JobId::new("c"))]);
    assert!(state.view().job_files.unwrap().loading);

    let (state, _) = update(
        state,
        Msg::JobFilesLoaded {
            job_id: JobId::new("c"),
            result: Ok(vec![job_file("f1", "facturas_2024-05.zip")]),
        },
    );
    let listing = state.view().job_files.unwrap();
    assert!(!listing.loading);
    assert_eq!(listing.files[0].size, "1.5 KB");
    assert_eq!(listing.files[0].kind, "ZIP");

    let (state, effects) = update(state, Msg::JobFileClicked("f1".into()));
    assert_eq!(
        effects,
        vec![Effect::Download(DownloadRequest::JobFile {
            job_id: JobId::new("c"),
            file_id: "f1".into(),
            name: "facturas_2024-05.zip".into(),
        })]
    );
    assert_eq!(state.view().transfers_in_flight, 1);

    let (state, effects) = update(state, Msg::JobFileClicked("nope".into()));
    assert!(effects.is_empty());
    assert_eq!(state.view().transfers_in_flight, 1);
}

#[test]
fn listing_for_another_job_is_ignored() {
    let state = loaded(vec![
        job("a", "completed", "2024-05-01T08:00:00"),
        job("b", "completed", "2024-05-01T09:00:00"),
    ]);
    let (state, _) = update(state, Msg::JobFilesClicked(JobId::new("a")));
    let (state, _) = update(state, Msg::JobFilesClicked(JobId::new("b")));
    let (state, _) = update(
        state,
        Msg::JobFilesLoaded {
            job_id: JobId::new("a"),
            result: Ok(vec![job_file("fa", "a.zip")]),
        },
    );
    let listing = state.view().job_files.unwrap();
    assert_eq!(listing.job_id, JobId::new("b"));
    assert!(listing.loading);

    let (state, _) = update(
        state,
        Msg::JobFilesLoaded {
            job_id: JobId::new("b"),
            result: Err("Descarga no encontrada".into()),
        },
    );
    let view = state.view();
    assert!(view.job_files.is_none());
    assert!(view.notifications[0].text.contains("Descarga no encontrada"));
}
