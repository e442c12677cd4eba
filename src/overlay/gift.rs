use std::sync::Arc;
use std::time::Duration;
use log::{debug, info};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use crate::models::{Gift, User};
use crate::overlay::events::{OverlayEvent, OverlayEvents};

pub const GIFT_DISPLAY_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveGift {
    pub user: Arc<User>,
    pub gift: Gift,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GiftOverlayState {
    Idle,
    Showing(ActiveGift),
}

struct Slot {
    state: GiftOverlayState,
    generation: u64,
    dismiss_timer: Option<JoinHandle<()>>,
    closed: bool,
}

/// Single-slot gift display. A new gift replaces the current one and gets the
/// full display window; a replaced gift's timer can never clear its successor.
#[derive(Clone)]
pub struct GiftOverlay {
    slot: Arc<Mutex<Slot>>,
    events: OverlayEvents,
    display_for: Duration,
}

impl GiftOverlay {
    pub fn new(events: OverlayEvents) -> Self {
        Self::with_duration(events, GIFT_DISPLAY_DURATION)
    }

    pub fn with_duration(events: OverlayEvents, display_for: Duration) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                state: GiftOverlayState::Idle,
                generation: 0,
                dismiss_timer: None,
                closed: false,
            })),
            events,
            display_for,
        }
    }

    /// Must be called from within a tokio runtime. Ignored after shutdown.
    pub fn show(&self, user: Arc<User>, gift: Gift) {
        let mut slot = self.slot.lock();
        if slot.closed {
            debug!("Gift overlay shut down, dropping {}", gift.name);
            return;
        }

        if let Some(previous) = slot.dismiss_timer.take() {
            previous.abort();
            debug!("Replacing gift display, previous dismiss timer cancelled");
        }

        slot.generation += 1;
        let generation = slot.generation;
        slot.state = GiftOverlayState::Showing(ActiveGift { user: Arc::clone(&user), gift });

        let shared = Arc::clone(&self.slot);
        let events = self.events.clone();
        let display_for = self.display_for;
        slot.dismiss_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(display_for).await;
            let mut slot = shared.lock();
            if slot.generation != generation {
                return;
            }
            slot.state = GiftOverlayState::Idle;
            slot.dismiss_timer = None;
            drop(slot);
            events.emit(OverlayEvent::GiftCleared);
        }));
        drop(slot);

        info!("{} sent {} {}", user.name, gift.name, gift.icon);
        self.events.emit(OverlayEvent::GiftShown { user, gift });
    }

    pub fn state(&self) -> GiftOverlayState {
        self.slot.lock().state.clone()
    }

    pub fn current(&self) -> Option<ActiveGift> {
        match self.state() {
            GiftOverlayState::Showing(active) => Some(active),
            GiftOverlayState::Idle => None,
        }
    }

    pub fn is_showing(&self) -> bool {
        matches!(self.slot.lock().state, GiftOverlayState::Showing(_))
    }

    /// Cancels the outstanding dismiss timer and refuses further gifts. The
    /// slot keeps its last state.
    pub fn shutdown(&self) {
        let mut slot = self.slot.lock();
        slot.closed = true;
        slot.generation += 1;
        if let Some(timer) = slot.dismiss_timer.take() {
            timer.abort();
        }
    }
}
