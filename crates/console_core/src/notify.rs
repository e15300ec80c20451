/// How many notifications stay visible; older ones are dropped.
pub const MAX_VISIBLE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub level: Level,
    pub text: String,
}

/// Dismissible toasts for user-initiated actions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notifications {
    next_id: u64,
    items: Vec<Notification>,
}

impl Notifications {
    pub fn success(&mut self, text: impl Into<String>) -> u64 {
        self.push(Level::Success, text.into())
    }

    pub fn error(&mut self, text: impl Into<String>) -> u64 {
        self.push(Level::Error, text.into())
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        self.items.len() != before
    }

    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    fn push(&mut self, level: Level, text: String) -> u64 {
        self.next_id += 1;
        self.items.push(Notification {
            id: self.next_id,
            level,
            text,
        });
        if self.items.len() > MAX_VISIBLE {
            let excess = self.items.len() - MAX_VISIBLE;
            self.items.drain(..excess);
        }
        self.next_id
    }
}
