use std::path::PathBuf;
use std::time::{Duration, Instant};

use console_core::{update, AppState, AppViewModel, Level, Msg, Notification};
use console_engine::{EngineError, EngineHandle};

use super::config::AppConfig;
use super::effects::EffectRunner;
use super::persistence;

/// How long to block on the engine before re-checking state.
const TICK: Duration = Duration::from_millis(75);

/// The update loop: core state plus the runner that executes its effects.
pub struct Console {
    state: AppState,
    runner: EffectRunner,
    state_dir: PathBuf,
}

impl Console {
    pub fn new(config: &AppConfig) -> Result<Self, EngineError> {
        let engine = EngineHandle::new(config.engine_config(), config.session())?;
        Ok(Self {
            state: AppState::with_cache_capacity(config.page_cache_capacity),
            runner: EffectRunner::new(engine, config.download_dir.clone()),
            state_dir: config.download_dir.clone(),
        })
    }

    pub fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (next, effects) = update(state, msg);
        self.state = next;
        self.runner.enqueue(effects);
    }

    pub fn view(&self) -> AppViewModel {
        self.state.view()
    }

    /// Apply the query saved by the previous run.
    pub fn restore_location(&mut self) {
        let query = persistence::load_query(&self.state_dir);
        self.dispatch(Msg::LocationChanged(query));
    }

    /// Feed engine messages until `done` holds; false if `timeout` passed first.
    pub fn run_until(&mut self, timeout: Duration, done: impl Fn(&AppViewModel) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if done(&self.state.view()) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            if let Some(msg) = self.runner.next_msg((deadline - now).min(TICK)) {
                self.dispatch(msg);
            }
        }
    }

    /// Poll forever, calling `render` whenever the state changed.
    pub fn watch(&mut self, mut render: impl FnMut(&AppViewModel)) {
        self.runner.start_polling();
        loop {
            if let Some(msg) = self.runner.next_msg(TICK) {
                self.dispatch(msg);
            }
            if self.state.consume_dirty() {
                render(&self.state.view());
            }
        }
    }
}

pub fn last_notification(view: &AppViewModel) -> Option<&Notification> {
    view.notifications.last()
}

pub fn last_notification_id(view: &AppViewModel) -> Option<u64> {
    last_notification(view).map(|note| note.id)
}

/// The newest notification if it reports a failure.
pub fn failure(view: &AppViewModel) -> Option<String> {
    last_notification(view)
        .filter(|note| note.level == Level::Error)
        .map(|note| note.text.clone())
}
