mod chat_buffer;
mod errors;
mod manager;
mod state;

pub use chat_buffer::ChatBuffer;
pub use errors::SessionError;
pub use manager::{LiveSession, SessionSnapshot, TickReport};
pub use state::SessionState;
