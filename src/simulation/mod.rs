pub mod catalog;
mod generator;

pub use generator::{
    EventGenerator, LikeBurst, TickPlan, CHAT_THRESHOLD, GIFT_THRESHOLD, JOIN_THRESHOLD, LIKE_THRESHOLD, TICK_PERIOD,
};
