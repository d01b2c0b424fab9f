use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::clock::Clock;
use crate::config::NotificationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub kind: NoticeKind,
    pub raised_at: Duration,
}

/// Fire-and-forget user notification.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, kind: NoticeKind);
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn notify(&self, message: &str, kind: NoticeKind) {
        (**self).notify(message, kind)
    }
}

/// Single toast slot. A new notice replaces the current one; notices expire
/// after the configured interval.
pub struct ToastSurface<C: Clock> {
    clock: C,
    dismiss_after: Option<Duration>,
    current: Mutex<Option<Notice>>,
}

impl<C: Clock> ToastSurface<C> {
    pub fn new(clock: C, config: &NotificationConfig) -> Self {
        Self {
            clock,
            dismiss_after: config.dismiss_after(),
            current: Mutex::new(None),
        }
    }

    /// The notice on screen right now, if it has not expired.
    pub fn current(&self) -> Option<Notice> {
        let mut current = self.current.lock();
        let expired = match (current.as_ref(), self.dismiss_after) {
            (Some(notice), Some(after)) => self.clock.now() >= notice.raised_at + after,
            _ => false,
        };
        if expired {
            *current = None;
        }
        current.clone()
    }

    pub fn dismiss(&self) {
        self.current.lock().take();
    }
}

impl<C: Clock + Send + Sync> Notifier for ToastSurface<C> {
    fn notify(&self, message: &str, kind: NoticeKind) {
        match kind {
            NoticeKind::Success => tracing::info!(message, "notice"),
            NoticeKind::Error => tracing::warn!(message, "error notice"),
        }
        *self.current.lock() = Some(Notice {
            message: message.to_owned(),
            kind,
            raised_at: self.clock.now(),
        });
    }
}
