//! The single user-visible message slot. A new notice replaces the previous
//! one, and every notice disappears on its own after the configured delay.

use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::time::Instant;
use tracing::info;

pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(5);

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Notice {
    pub message: String,
    pub raised_at: Instant,
}

#[derive(Debug)]
pub struct NoticeBoard {
    ttl: Duration,
    current: Mutex<Option<Notice>>,
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(DEFAULT_NOTICE_TTL)
    }
}

impl NoticeBoard {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            current: Mutex::new(None),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<Notice>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn raise(&self, message: impl Into<String>) {
        let message = message.into();
        info!(notice = %message, "Raising notice");

        *self.slot() = Some(Notice {
            message,
            raised_at: Instant::now(),
        });
    }

    /// The live notice, if any. Expired notices are dropped here.
    #[must_use]
    pub fn current(&self) -> Option<String> {
        let mut slot = self.slot();
        if slot
            .as_ref()
            .is_some_and(|notice| notice.raised_at.elapsed() >= self.ttl)
        {
            *slot = None;
        }

        slot.as_ref().map(|notice| notice.message.clone())
    }

    pub fn dismiss(&self) {
        self.slot().take();
    }
}
