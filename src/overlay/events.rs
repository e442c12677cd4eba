use std::sync::Arc;
use log::trace;
use serde::Serialize;
use tokio::sync::broadcast;
use crate::models::{CommentEvent, Gift, StreamSettings, User};
use crate::overlay::hearts::FloatingHeart;
use crate::voice::VoiceStatus;

/// Everything the presentation layer needs to redraw the overlay.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OverlayEvent {
    CommentAppended(CommentEvent),
    SettingsChanged(StreamSettings),
    GiftShown { user: Arc<User>, gift: Gift },
    GiftCleared,
    HeartSpawned(FloatingHeart),
    HeartExpired(u64),
    CleanModeChanged(bool),
    RecordingChanged(bool),
    VoiceStatusChanged(VoiceStatus),
}

#[derive(Clone)]
pub struct OverlayEvents {
    sender: broadcast::Sender<OverlayEvent>,
}

impl OverlayEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn emit(&self, event: OverlayEvent) {
        // No subscribers is fine: nothing is rendering yet.
        if let Err(e) = self.sender.send(event) {
            trace!("Overlay event dropped without subscribers: {:?}", e.0);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OverlayEvent> {
        self.sender.subscribe()
    }
}

impl Default for OverlayEvents {
    fn default() -> Self {
        Self::new(256)
    }
}
