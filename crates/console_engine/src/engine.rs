use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use console_core::{DownloadRequest, FilterState, JobAction, JobId, NewJob, RequestId};
use console_logging::{console_debug, console_info, console_warn};
use thiserror::Error;

use crate::api::{ApiSettings, ChannelProgressSink, ConsoleApi, ReqwestApi};
use crate::filename::download_filename;
use crate::persist::AtomicFileWriter;
use crate::poller::JobPoller;
use crate::session::Session;
use crate::types::{ApiError, DownloadError, EngineEvent};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub api: ApiSettings,
    pub download_dir: PathBuf,
    pub poll_interval: Duration,
    pub search_debounce: Duration,
    pub recent_jobs_limit: usize,
}

impl EngineConfig {
    pub fn default_with_output(download_dir: PathBuf) -> Self {
        Self {
            api: ApiSettings::default(),
            download_dir,
            poll_interval: Duration::from_secs(10),
            search_debounce: Duration::from_millis(300),
            recent_jobs_limit: 10,
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("could not start engine runtime: {0}")]
    Runtime(#[from] io::Error),
    #[error("could not build http client: {0}")]
    Client(#[from] ApiError),
}

enum EngineCommand {
    StartPolling,
    StopPolling,
    ListJobs,
    CreateJob(NewJob),
    RetryJob(JobId),
    CancelJob(JobId),
    ListJobFiles(JobId),
    FetchPage {
        request_id: RequestId,
        key: String,
        filters: FilterState,
    },
    SettleSearch {
        token: u64,
    },
    Download(DownloadRequest),
}

/// Runs requests on a background tokio runtime and reports back as events.
/// Dropping the handle stops the poller and abandons outstanding requests.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

#[derive(Clone)]
struct Worker {
    api: Arc<dyn ConsoleApi>,
    writer: AtomicFileWriter,
    config: Arc<EngineConfig>,
    events: mpsc::Sender<EngineEvent>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig, session: Session) -> Result<Self, EngineError> {
        let api = ReqwestApi::new(session, config.api.clone())?;
        Self::with_api(config, Arc::new(api))
    }

    /// Engine over any [`ConsoleApi`] implementation.
    pub fn with_api(config: EngineConfig, api: Arc<dyn ConsoleApi>) -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        let worker = Worker {
            api,
            writer: AtomicFileWriter::new(config.download_dir.clone()),
            config: Arc::new(config),
            events: event_tx,
        };

        thread::Builder::new()
            .name("console-engine".to_string())
            .spawn(move || run(runtime, worker, cmd_rx))?;

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn start_polling(&self) {
        self.send(EngineCommand::StartPolling);
    }

    pub fn stop_polling(&self) {
        self.send(EngineCommand::StopPolling);
    }

    pub fn list_jobs(&self) {
        self.send(EngineCommand::ListJobs);
    }

    pub fn create_job(&self, job: NewJob) {
        self.send(EngineCommand::CreateJob(job));
    }

    pub fn retry_job(&self, job_id: JobId) {
        self.send(EngineCommand::RetryJob(job_id));
    }

    pub fn cancel_job(&self, job_id: JobId) {
        self.send(EngineCommand::CancelJob(job_id));
    }

    pub fn list_job_files(&self, job_id: JobId) {
        self.send(EngineCommand::ListJobFiles(job_id));
    }

    pub fn fetch_page(&self, request_id: RequestId, key: String, filters: FilterState) {
        self.send(EngineCommand::FetchPage {
            request_id,
            key,
            filters,
        });
    }

    /// Report `SearchSettled { token }` once the debounce delay has passed.
    pub fn settle_search(&self, token: u64) {
        self.send(EngineCommand::SettleSearch { token });
    }

    pub fn download(&self, request: DownloadRequest) {
        self.send(EngineCommand::Download(request));
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            console_warn!("Engine thread is gone; command dropped");
        }
    }
}

fn run(runtime: tokio::runtime::Runtime, worker: Worker, cmd_rx: mpsc::Receiver<EngineCommand>) {
    let mut poller: Option<JobPoller> = None;
    while let Ok(command) = cmd_rx.recv() {
        match command {
            EngineCommand::StartPolling => {
                if poller.is_none() {
                    let events = worker.events.clone();
                    poller = Some(JobPoller::start(
                        runtime.handle(),
                        worker.config.poll_interval,
                        move || {
                            let _ = events.send(EngineEvent::PollTick);
                        },
                    ));
                    console_info!(
                        "Job polling started interval_ms={}",
                        worker.config.poll_interval.as_millis()
                    );
                }
            }
            EngineCommand::StopPolling => {
                if poller.take().is_some() {
                    console_info!("Job polling stopped");
                }
            }
            command => {
                let worker = worker.clone();
                runtime.spawn(async move { worker.handle(command).await });
            }
        }
    }
    drop(poller);
    console_debug!("Engine command channel closed");
}

impl Worker {
    async fn handle(&self, command: EngineCommand) {
        let event = match command {
            EngineCommand::ListJobs => {
                let result = self.api.list_jobs(self.config.recent_jobs_limit).await;
                EngineEvent::JobsListed(result)
            }
            EngineCommand::CreateJob(job) => {
                console_info!("Creating job company={} period={}", job.company_id, job.period);
                EngineEvent::JobActionFinished {
                    action: JobAction::Create,
                    job_id: None,
                    result: self.api.create_job(&job).await,
                }
            }
            EngineCommand::RetryJob(job_id) => {
                console_info!("Retrying job {}", job_id);
                let result = self.api.retry_job(&job_id).await;
                EngineEvent::JobActionFinished {
                    action: JobAction::Retry,
                    job_id: Some(job_id),
                    result,
                }
            }
            EngineCommand::CancelJob(job_id) => {
                console_info!("Cancelling job {}", job_id);
                let result = self.api.cancel_job(&job_id).await;
                EngineEvent::JobActionFinished {
                    action: JobAction::Cancel,
                    job_id: Some(job_id),
                    result,
                }
            }
            EngineCommand::ListJobFiles(job_id) => {
                let result = self.api.list_job_files(&job_id).await;
                EngineEvent::JobFilesListed { job_id, result }
            }
            EngineCommand::FetchPage {
                request_id,
                key,
                filters,
            } => {
                console_debug!("Fetching page request_id={} key={:?}", request_id, key);
                let result = self.api.list_documents(&filters).await;
                EngineEvent::PageFetched {
                    request_id,
                    key,
                    result,
                }
            }
            EngineCommand::SettleSearch { token } => {
                tokio::time::sleep(self.config.search_debounce).await;
                EngineEvent::SearchSettled { token }
            }
            EngineCommand::Download(request) => {
                let result = self.download(&request).await;
                match &result {
                    Ok(path) => console_info!("Saved {}", path.display()),
                    Err(err) => console_warn!("Download {} failed: {}", request.describe(), err),
                }
                EngineEvent::DownloadFinished { request, result }
            }
            EngineCommand::StartPolling | EngineCommand::StopPolling => return,
        };
        let _ = self.events.send(event);
    }

    async fn download(&self, request: &DownloadRequest) -> Result<PathBuf, DownloadError> {
        let sink = ChannelProgressSink::new(self.events.clone());
        let blob = self.api.download(request, &sink).await?;
        let filename = download_filename(request, blob.content_type.as_deref(), Utc::now());
        let writer = self.writer.clone();
        let path = tokio::task::spawn_blocking(move || writer.write(&filename, &blob.bytes))
            .await
            .map_err(|err| DownloadError::Persist(err.to_string()))??;
        Ok(path)
    }
}
