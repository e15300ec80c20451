use std::time::Duration;

use console_logging::console_debug;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Scoped poll timer. Ticks every `interval` until [`JobPoller::stop`] is
/// called or the poller is dropped; a stopped poller never ticks again.
///
/// The timer only announces ticks. Whoever consumes them decides whether a
/// request is issued, so a slow server never sees stacked polls.
pub struct JobPoller {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl JobPoller {
    /// Start ticking on `runtime`. The first tick fires immediately.
    pub fn start(
        runtime: &Handle,
        interval: Duration,
        on_tick: impl Fn() + Send + 'static,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let period = interval.max(Duration::from_millis(1));
        let task = runtime.spawn(async move {
            let mut ticker = time::interval(period);
            // A stalled loop resumes on schedule instead of firing a burst.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => on_tick(),
                }
            }
            console_debug!("Job poller stopped");
        });
        Self {
            cancel,
            task: Some(task),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for JobPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
