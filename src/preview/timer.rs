use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum TimerKind {
    Show,
    Hide,
}

/// Identifies one arming of the slot. A stale handle cancels nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    id: u64,
    kind: TimerKind,
}

impl TimerHandle {
    pub fn kind(&self) -> TimerKind {
        self.kind
    }
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    handle: TimerHandle,
    deadline: Duration,
}

/// A single scheduled callback. Arming always replaces whatever was armed,
/// so show and hide can never be pending at the same time.
#[derive(Debug, Default)]
pub struct TimerSlot {
    armed: Option<Armed>,
    next_id: u64,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, kind: TimerKind, now: Duration, delay: Duration) -> TimerHandle {
        if let Some(previous) = self.armed.take() {
            tracing::trace!(kind = %previous.handle.kind, "timer superseded");
        }
        self.next_id += 1;
        let handle = TimerHandle {
            id: self.next_id,
            kind,
        };
        self.armed = Some(Armed {
            handle,
            deadline: now + delay,
        });
        handle
    }

    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.armed {
            Some(armed) if armed.handle == handle => {
                self.armed = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel_any(&mut self) -> Option<TimerHandle> {
        self.armed.take().map(|armed| armed.handle)
    }

    pub fn armed(&self) -> Option<TimerKind> {
        self.armed.map(|armed| armed.handle.kind)
    }

    pub fn handle(&self) -> Option<TimerHandle> {
        self.armed.map(|armed| armed.handle)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.armed.map(|armed| armed.deadline)
    }

    /// Pops the armed timer if its deadline has been reached.
    pub fn take_due(&mut self, now: Duration) -> Option<TimerHandle> {
        match self.armed {
            Some(armed) if armed.deadline <= now => {
                self.armed = None;
                Some(armed.handle)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn arming_replaces_the_previous_timer() {
        let mut slot = TimerSlot::new();
        let show = slot.arm(TimerKind::Show, ms(0), ms(400));
        let hide = slot.arm(TimerKind::Hide, ms(100), ms(300));
        assert_eq!(slot.armed(), Some(TimerKind::Hide));
        assert!(!slot.cancel(show), "stale handle must not cancel");
        assert_eq!(slot.deadline(), Some(ms(400)));
        assert!(slot.cancel(hide));
        assert_eq!(slot.armed(), None);
    }

    #[test]
    fn take_due_waits_for_deadline() {
        let mut slot = TimerSlot::new();
        let handle = slot.arm(TimerKind::Show, ms(10), ms(400));
        assert_eq!(slot.take_due(ms(409)), None);
        assert_eq!(slot.take_due(ms(410)), Some(handle));
        assert_eq!(slot.take_due(ms(900)), None);
    }

    #[test]
    fn handles_are_unique_per_arm() {
        let mut slot = TimerSlot::new();
        let first = slot.arm(TimerKind::Show, ms(0), ms(1));
        slot.cancel_any();
        let second = slot.arm(TimerKind::Show, ms(0), ms(1));
        assert_ne!(first, second);
    }
}
