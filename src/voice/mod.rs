mod adapter;
mod command;

pub use adapter::{CommentSink, VoiceCommandAdapter, RESTART_DELAY};
pub use command::extract_command;

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    #[error("No speech detected")]
    NoSpeech,
    #[error("Microphone access denied.")]
    NotAllowed,
    #[error("Speech recognition not supported on this platform.")]
    Unsupported,
    #[error("Speech recognition error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptSegment {
    pub text: String,
    pub is_final: bool,
}

impl TranscriptSegment {
    pub fn final_text(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_final: true }
    }

    pub fn interim(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_final: false }
    }
}

/// Events a platform recognizer reports while it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Started,
    Result(Vec<TranscriptSegment>),
    Error(RecognitionError),
    Ended,
}

/// Platform speech recognizer. Events are delivered on the channel handed to
/// [`VoiceCommandAdapter::spawn`] alongside it.
pub trait SpeechRecognizer: Send + Sync {
    fn start(&self) -> Result<(), RecognitionError>;
    fn stop(&self);
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VoiceStatus {
    pub listening: bool,
    pub error: Option<String>,
    pub last_transcript: String,
}
