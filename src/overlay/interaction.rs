use std::sync::Arc;
use std::time::Duration;
use log::{debug, info};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use crate::overlay::events::{OverlayEvent, OverlayEvents};

pub const LONG_PRESS_THRESHOLD: Duration = Duration::from_millis(600);

/// What a completed click should do after the long-press check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The press was a long press; it already toggled clean mode.
    Suppressed,
    /// A tap while clean mode was on restores the overlay.
    ExitedCleanMode,
    /// Nothing special; other handlers (double tap) may act.
    PassThrough,
}

#[derive(Default)]
struct PressState {
    clean_mode: bool,
    long_press: bool,
    press_generation: u64,
    timer: Option<JoinHandle<()>>,
    closed: bool,
}

/// Tells taps from long presses and owns the clean-mode flag.
#[derive(Clone)]
pub struct InteractionController {
    state: Arc<Mutex<PressState>>,
    events: OverlayEvents,
    threshold: Duration,
}

impl InteractionController {
    pub fn new(events: OverlayEvents) -> Self {
        Self {
            state: Arc::new(Mutex::new(PressState::default())),
            events,
            threshold: LONG_PRESS_THRESHOLD,
        }
    }

    pub fn pointer_down(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        if let Some(stale) = state.timer.take() {
            stale.abort();
        }
        state.long_press = false;
        state.press_generation += 1;
        let generation = state.press_generation;

        let shared = Arc::clone(&self.state);
        let events = self.events.clone();
        let threshold = self.threshold;
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(threshold).await;
            let mut state = shared.lock();
            if state.press_generation != generation {
                return;
            }
            state.timer = None;
            state.long_press = true;
            state.clean_mode = !state.clean_mode;
            let clean_mode = state.clean_mode;
            drop(state);
            info!("Long press: clean mode {}", if clean_mode { "on" } else { "off" });
            events.emit(OverlayEvent::CleanModeChanged(clean_mode));
        }));
    }

    /// Pointer release or pointer leaving the surface.
    pub fn pointer_up(&self) {
        let mut state = self.state.lock();
        if let Some(pending) = state.timer.take() {
            pending.abort();
            state.press_generation += 1;
            debug!("Press released before long-press threshold");
        }
    }

    pub fn click(&self) -> ClickOutcome {
        let mut state = self.state.lock();
        if state.long_press || state.closed {
            return ClickOutcome::Suppressed;
        }
        if state.clean_mode {
            state.clean_mode = false;
            drop(state);
            info!("Tap: clean mode off");
            self.events.emit(OverlayEvent::CleanModeChanged(false));
            return ClickOutcome::ExitedCleanMode;
        }
        ClickOutcome::PassThrough
    }

    pub fn is_clean_mode(&self) -> bool {
        self.state.lock().clean_mode
    }

    /// Cancels a pending long press. Later presses and taps are ignored.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.press_generation += 1;
        if let Some(pending) = state.timer.take() {
            pending.abort();
        }
    }
}
