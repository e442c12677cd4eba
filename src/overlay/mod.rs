mod events;
pub mod gift;
pub mod hearts;
pub mod interaction;

pub use events::{OverlayEvent, OverlayEvents};
pub use gift::{ActiveGift, GiftOverlay, GiftOverlayState};
pub use hearts::{FloatingHeart, HeartPool};
pub use interaction::{ClickOutcome, InteractionController};
