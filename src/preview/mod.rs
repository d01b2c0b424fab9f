//! Hover-preview scheduling.
//!
//! [`HoverScheduler`] decides when a floating user card appears and
//! disappears as the pointer moves across anchors (avatars, usernames) and the
//! card itself. It never sleeps: the host calls [`HoverScheduler::poll`] from
//! its tick, performs the fetch described by the returned ticket, and feeds the
//! result back through [`HoverScheduler::complete_fetch`].

use crate::api::{ApiError, SocialApi, UserId, UserPreview};
use crate::app::actions::ActionDispatcher;
use crate::clock::Clock;
use crate::config::HoverConfig;

pub mod geometry;
pub mod timer;

use self::geometry::{place_card, AnchorKind, BoundingBox, CardPosition};
use self::timer::{TimerKind, TimerSlot};

/// The anchor currently under the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverTarget {
    pub user_id: UserId,
    pub anchor: BoundingBox,
    pub kind: AnchorKind,
}

impl HoverTarget {
    pub fn new(user_id: impl Into<UserId>, anchor: BoundingBox, kind: AnchorKind) -> Self {
        Self {
            user_id: user_id.into(),
            anchor,
            kind,
        }
    }
}

/// What the card shows. Owned by the component hosting the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewState {
    pub visible: bool,
    pub loading: bool,
    pub data: Option<UserPreview>,
    pub position: CardPosition,
}

impl Default for PreviewState {
    fn default() -> Self {
        Self {
            visible: false,
            loading: false,
            data: None,
            position: CardPosition::OFFSCREEN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Phase {
    Hidden,
    PendingShow,
    #[strum(to_string = "Visible(loading)")]
    VisibleLoading,
    #[strum(to_string = "Visible(loaded)")]
    VisibleLoaded,
    PendingHide,
}

/// Identifies one fetch. Results for an older generation are discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub user_id: UserId,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// The show timer fired; the card is visible and loading.
    FetchRequested(FetchTicket),
    /// The hide timer fired.
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchDisposition {
    Applied,
    Hidden,
    Stale,
}

#[derive(Debug, Clone)]
struct Displayed {
    user_id: UserId,
    generation: u64,
}

pub struct HoverScheduler<C: Clock> {
    clock: C,
    config: HoverConfig,
    viewport_width: f64,
    timer: TimerSlot,
    pending: Option<HoverTarget>,
    displayed: Option<Displayed>,
    generation: u64,
    state: PreviewState,
}

impl<C: Clock> HoverScheduler<C> {
    pub fn new(clock: C, config: &HoverConfig, viewport_width: f64) -> Self {
        Self {
            clock,
            config: config.clone(),
            viewport_width,
            timer: TimerSlot::new(),
            pending: None,
            displayed: None,
            generation: 0,
            state: PreviewState::default(),
        }
    }

    pub fn state(&self) -> &PreviewState {
        &self.state
    }

    pub fn armed_timer(&self) -> Option<TimerKind> {
        self.timer.armed()
    }

    pub fn next_deadline(&self) -> Option<std::time::Duration> {
        self.timer.deadline()
    }

    pub fn displayed_user(&self) -> Option<&UserId> {
        self.displayed.as_ref().map(|d| &d.user_id)
    }

    pub fn pending_target(&self) -> Option<&HoverTarget> {
        self.pending.as_ref()
    }

    pub fn phase(&self) -> Phase {
        match self.timer.armed() {
            Some(TimerKind::Show) => Phase::PendingShow,
            Some(TimerKind::Hide) => Phase::PendingHide,
            None if self.displayed.is_none() => Phase::Hidden,
            None if self.state.loading => Phase::VisibleLoading,
            None => Phase::VisibleLoaded,
        }
    }

    pub fn set_viewport_width(&mut self, width: f64) {
        self.viewport_width = width;
    }

    pub fn pointer_enter(&mut self, target: HoverTarget) {
        let same_as_displayed = self
            .displayed
            .as_ref()
            .is_some_and(|d| d.user_id == target.user_id);
        if same_as_displayed {
            // back on the card's own user: keep it, drop whatever was scheduled
            if let Some(handle) = self.timer.cancel_any() {
                tracing::debug!(user = %target.user_id, timer = %handle.kind(), "hover returned to displayed user");
            }
            self.pending = None;
            return;
        }

        let now = self.clock.now();
        self.timer
            .arm(TimerKind::Show, now, self.config.show_delay());
        tracing::debug!(user = %target.user_id, kind = %target.kind, "show scheduled");
        self.pending = Some(target);
    }

    /// Pointer left an anchor or the card.
    pub fn pointer_leave(&mut self) {
        match self.timer.armed() {
            Some(TimerKind::Hide) => {}
            Some(TimerKind::Show) => {
                self.timer.cancel_any();
                self.pending = None;
                if self.displayed.is_some() {
                    self.arm_hide();
                } else {
                    tracing::debug!("show cancelled before it fired");
                }
            }
            None => {
                if self.displayed.is_some() {
                    self.arm_hide();
                }
            }
        }
    }

    pub fn pointer_enter_card(&mut self) {
        if self.cancel_hide() {
            tracing::debug!("pointer moved onto card, hide cancelled");
        }
    }

    pub fn pointer_leave_card(&mut self) {
        self.pointer_leave();
    }

    /// Fires the armed timer if it is due.
    pub fn poll(&mut self) -> Option<SchedulerEvent> {
        let now = self.clock.now();
        let handle = self.timer.take_due(now)?;
        match handle.kind() {
            TimerKind::Show => {
                let Some(target) = self.pending.take() else {
                    tracing::warn!("show timer fired without a pending target");
                    return None;
                };
                Some(SchedulerEvent::FetchRequested(self.show(target)))
            }
            TimerKind::Hide => {
                self.hide_now();
                tracing::debug!("card hidden after hide delay");
                Some(SchedulerEvent::Hidden)
            }
        }
    }

    pub fn complete_fetch(
        &mut self,
        ticket: &FetchTicket,
        result: Result<UserPreview, ApiError>,
    ) -> FetchDisposition {
        let current = self
            .displayed
            .as_ref()
            .is_some_and(|d| d.generation == ticket.generation && d.user_id == ticket.user_id);
        if !current {
            tracing::debug!(
                user = %ticket.user_id,
                generation = ticket.generation,
                "discarding stale preview result"
            );
            return FetchDisposition::Stale;
        }
        match result {
            Ok(preview) => {
                self.state.data = Some(preview);
                self.state.loading = false;
                FetchDisposition::Applied
            }
            Err(err) => {
                tracing::warn!(%err, user = %ticket.user_id, "preview fetch failed, hiding card");
                // a show already scheduled for another user goes ahead
                self.drop_card();
                FetchDisposition::Hidden
            }
        }
    }

    /// Hides immediately and cancels anything scheduled.
    pub fn hide_now(&mut self) {
        self.timer.cancel_any();
        self.pending = None;
        self.drop_card();
    }

    /// Removes the displayed card and its hide timer; a pending show survives.
    fn drop_card(&mut self) {
        self.cancel_hide();
        self.displayed = None;
        self.state.visible = false;
        self.state.loading = false;
        self.state.data = None;
    }

    fn cancel_hide(&mut self) -> bool {
        match self.timer.handle() {
            Some(handle) if handle.kind() == TimerKind::Hide => self.timer.cancel(handle),
            _ => false,
        }
    }

    fn show(&mut self, target: HoverTarget) -> FetchTicket {
        self.generation += 1;
        let placement = self.config.placements.get(target.kind);
        self.state = PreviewState {
            visible: true,
            loading: true,
            data: None,
            position: place_card(
                &target.anchor,
                placement,
                self.config.metrics(),
                self.viewport_width,
            ),
        };
        tracing::debug!(
            user = %target.user_id,
            generation = self.generation,
            top = self.state.position.top,
            left = self.state.position.left,
            "card shown, fetching preview"
        );
        self.displayed = Some(Displayed {
            user_id: target.user_id.clone(),
            generation: self.generation,
        });
        FetchTicket {
            user_id: target.user_id,
            generation: self.generation,
        }
    }

    fn arm_hide(&mut self) {
        let now = self.clock.now();
        self.timer
            .arm(TimerKind::Hide, now, self.config.hide_delay());
        tracing::debug!("hide scheduled");
    }
}

/// Resolves a ticket through the network layer.
pub async fn fetch_preview<A: SocialApi>(
    dispatcher: &ActionDispatcher<'_, A>,
    ticket: &FetchTicket,
) -> Result<UserPreview, ApiError> {
    dispatcher.fetch_preview(&ticket.user_id).await
}
