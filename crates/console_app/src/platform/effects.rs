use std::path::PathBuf;
use std::time::Duration;

use console_core::{Effect, Msg};
use console_engine::{EngineEvent, EngineHandle};
use console_logging::{console_debug, console_info, console_warn};

use super::persistence;

/// Executes core effects on the engine and turns engine events into messages.
pub struct EffectRunner {
    engine: EngineHandle,
    state_dir: PathBuf,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, state_dir: PathBuf) -> Self {
        Self { engine, state_dir }
    }

    pub fn start_polling(&self) {
        self.engine.start_polling();
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::FetchJobs => self.engine.list_jobs(),
                Effect::CreateJob(job) => self.engine.create_job(job),
                Effect::RetryJob(job_id) => self.engine.retry_job(job_id),
                Effect::CancelJob(job_id) => self.engine.cancel_job(job_id),
                Effect::FetchJobFiles(job_id) => self.engine.list_job_files(job_id),
                Effect::ReplaceQuery(query) => {
                    console_info!("Query is now {:?}", query);
                    persistence::save_query(&self.state_dir, &query);
                }
                Effect::ScheduleSearchSettle { token } => self.engine.settle_search(token),
                Effect::FetchPage {
                    request_id,
                    key,
                    filters,
                } => self.engine.fetch_page(request_id, key, filters),
                Effect::Download(request) => {
                    console_info!("Downloading {}", request.describe());
                    self.engine.download(request);
                }
            }
        }
    }

    /// Next message from the engine, waiting at most `timeout`.
    pub fn next_msg(&self, timeout: Duration) -> Option<Msg> {
        self.engine.recv_timeout(timeout).and_then(to_msg)
    }
}

fn to_msg(event: EngineEvent) -> Option<Msg> {
    let msg = match event {
        EngineEvent::PollTick => Msg::PollTick,
        EngineEvent::JobsListed(result) => {
            Msg::JobsLoaded(result.map_err(|err| err.user_message()))
        }
        EngineEvent::JobActionFinished {
            action,
            job_id,
            result,
        } => Msg::JobActionFinished {
            action,
            job_id,
            result: result.map_err(|err| err.user_message()),
        },
        EngineEvent::JobFilesListed { job_id, result } => Msg::JobFilesLoaded {
            job_id,
            result: result.map_err(|err| err.user_message()),
        },
        EngineEvent::PageFetched {
            request_id,
            key,
            result,
        } => Msg::PageLoaded {
            request_id,
            key,
            result: result.map_err(|err| {
                console_warn!("Page request {} failed: {}", request_id, err);
                err.user_message()
            }),
        },
        EngineEvent::SearchSettled { token } => Msg::SearchSettled { token },
        EngineEvent::DownloadProgress { request, bytes } => {
            console_debug!("{}: {} bytes", request.describe(), bytes);
            return None;
        }
        EngineEvent::DownloadFinished { request, result } => Msg::DownloadFinished {
            request,
            result: result
                .map(|path| path.display().to_string())
                .map_err(|err| err.to_string()),
        },
    };
    Some(msg)
}
