use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use console_core::{
    DocumentFile, DownloadRequest, FilterState, JobAction, JobFile, JobId, NewJob,
    PageResponse, RetrievalJob,
};
use console_engine::{
    ApiError, Blob, ConsoleApi, EngineConfig, EngineEvent, EngineHandle, FailureKind,
    ProgressSink,
};
use tempfile::TempDir;

#[derive(Default)]
struct FakeApi {
    list_calls: AtomicUsize,
}

fn refused() -> ApiError {
    ApiError {
        kind: FailureKind::Network,
        message: "connection refused".into(),
    }
}

#[async_trait::async_trait]
impl ConsoleApi for FakeApi {
    async fn list_jobs(&self, _limit: usize) -> Result<Vec<RetrievalJob>, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    async fn create_job(&self, _job: &NewJob) -> Result<(), ApiError> {
        Ok(())
    }

    async fn retry_job(&self, _job_id: &JobId) -> Result<(), ApiError> {
        Err(refused())
    }

    async fn cancel_job(&self, _job_id: &JobId) -> Result<(), ApiError> {
        Ok(())
    }

    async fn list_job_files(&self, job_id: &JobId) -> Result<Vec<JobFile>, ApiError> {
        Ok(vec![JobFile {
            id: format!("{}-f1", job_id.as_str()),
            name: "facturas_emitidas.zip".into(),
            module: "facturas_emitidas".into(),
            kind: "zip".into(),
            size_bytes: 2048,
        }])
    }

    async fn list_documents(&self, _filters: &FilterState) -> Result<PageResponse, ApiError> {
        Err(refused())
    }

    async fn download(
        &self,
        _request: &DownloadRequest,
        _sink: &dyn ProgressSink,
    ) -> Result<Blob, ApiError> {
        Ok(Blob {
            bytes: Bytes::from_static(b"<Invoice/>"),
            content_type: Some("application/xml".into()),
        })
    }
}

fn engine(dir: &TempDir, api: Arc<FakeApi>) -> EngineHandle {
    console_logging::initialize_for_tests();
    let mut config = EngineConfig::default_with_output(dir.path().join("downloads"));
    config.poll_interval = Duration::from_millis(20);
    config.search_debounce = Duration::from_millis(80);
    EngineHandle::with_api(config, api).expect("engine")
}

/// Wait for the first event matching `pick`, skipping others.
fn wait_for<T>(engine: &EngineHandle, mut pick: impl FnMut(EngineEvent) -> Option<T>) -> T {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if let Some(found) = engine
            .recv_timeout(Duration::from_millis(50))
            .and_then(&mut pick)
        {
            return found;
        }
    }
    panic!("expected event did not arrive");
}

#[test]
fn job_actions_report_back() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(FakeApi::default());
    let engine = engine(&dir, api.clone());

    engine.list_jobs();
    let jobs = wait_for(&engine, |event| match event {
        EngineEvent::JobsListed(result) => Some(result),
        _ => None,
    });
    assert_eq!(jobs, Ok(Vec::new()));
    assert_eq!(api.list_calls.load(Ordering::SeqCst), 1);

    engine.retry_job(JobId::new("j1"));
    let (action, job_id, result) = wait_for(&engine, |event| match event {
        EngineEvent::JobActionFinished {
            action,
            job_id,
            result,
        } => Some((action, job_id, result)),
        _ => None,
    });
    assert_eq!(action, JobAction::Retry);
    assert_eq!(job_id, Some(JobId::new("j1")));
    assert_eq!(result.unwrap_err().kind, FailureKind::Network);
}

#[test]
fn job_files_are_listed_for_their_job() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir, Arc::new(FakeApi::default()));

    engine.list_job_files(JobId::new("j4"));
    let (job_id, result) = wait_for(&engine, |event| match event {
        EngineEvent::JobFilesListed { job_id, result } => Some((job_id, result)),
        _ => None,
    });
    assert_eq!(job_id, JobId::new("j4"));
    let files = result.expect("listing");
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].id, "j4-f1");
}

#[test]
fn page_fetch_echoes_request_identity() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir, Arc::new(FakeApi::default()));

    engine.fetch_page(7, "tipo=boleta".into(), FilterState::default());
    let (request_id, key, failed) = wait_for(&engine, |event| match event {
        EngineEvent::PageFetched {
            request_id,
            key,
            result,
        } => Some((request_id, key, result.is_err())),
        _ => None,
    });
    assert_eq!((request_id, key.as_str(), failed), (7, "tipo=boleta", true));
}

#[test]
fn search_settles_after_debounce() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir, Arc::new(FakeApi::default()));

    let started = Instant::now();
    engine.settle_search(3);
    let token = wait_for(&engine, |event| match event {
        EngineEvent::SearchSettled { token } => Some(token),
        _ => None,
    });
    assert_eq!(token, 3);
    assert!(started.elapsed() >= Duration::from_millis(80));
}

#[test]
fn download_is_saved_under_deterministic_name() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir, Arc::new(FakeApi::default()));

    let request = DownloadRequest::Document {
        id: "d1".into(),
        series: "F001".into(),
        number: "00023".into(),
        file: DocumentFile::Xml,
    };
    engine.download(request.clone());
    let (finished, result) = wait_for(&engine, |event| match event {
        EngineEvent::DownloadFinished { request, result } => Some((request, result)),
        _ => None,
    });
    assert_eq!(finished, request);
    let saved = result.expect("saved");
    assert_eq!(saved, dir.path().join("downloads").join("F001-00023.xml"));
    assert_eq!(std::fs::read(saved).unwrap(), b"<Invoice/>");
}

#[test]
fn polling_ticks_until_stopped() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir, Arc::new(FakeApi::default()));

    engine.start_polling();
    // A second start never adds a second timer.
    engine.start_polling();
    wait_for(&engine, |event| matches!(event, EngineEvent::PollTick).then_some(()));

    // One timer at 20 ms gives about ten ticks in 200 ms; two would give twenty.
    let window = Duration::from_millis(200);
    let started = Instant::now();
    let mut ticks = 0;
    while started.elapsed() < window {
        if let Some(EngineEvent::PollTick) = engine.recv_timeout(Duration::from_millis(5)) {
            ticks += 1;
        }
    }
    assert!(ticks >= 3, "polling stalled: {ticks} ticks");
    assert!(ticks <= 12, "more than one timer running: {ticks} ticks");

    engine.stop_polling();
    std::thread::sleep(Duration::from_millis(60));
    while engine.try_recv().is_some() {}
    std::thread::sleep(Duration::from_millis(80));
    assert!(engine.try_recv().is_none());
}
