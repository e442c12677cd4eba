use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use log::{debug, info, warn};
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use crate::overlay::{OverlayEvent, OverlayEvents};
use super::command::extract_command;
use super::{RecognitionError, RecognitionEvent, SpeechRecognizer, TranscriptSegment, VoiceStatus};

pub const RESTART_DELAY: Duration = Duration::from_millis(100);

/// Receives comments spoken by the host.
#[async_trait]
pub trait CommentSink: Send + Sync {
    async fn inject_comment(&self, content: String);
}

struct Shared {
    recognizer: Arc<dyn SpeechRecognizer>,
    should_listen: AtomicBool,
    status: Mutex<VoiceStatus>,
    events: OverlayEvents,
}

impl Shared {
    fn update_status(&self, update: impl FnOnce(&mut VoiceStatus)) {
        let snapshot = {
            let mut status = self.status.lock();
            update(&mut status);
            status.clone()
        };
        self.events.emit(OverlayEvent::VoiceStatusChanged(snapshot));
    }

    fn start_recognizer(&self) {
        if let Err(e) = self.recognizer.start() {
            warn!("Recognition start failed: {}", e);
            self.handle_error(e);
        }
    }

    fn handle_error(&self, error: RecognitionError) {
        match error {
            RecognitionError::NoSpeech => debug!("No speech detected, ignoring"),
            RecognitionError::NotAllowed | RecognitionError::Unsupported => {
                warn!("Voice commands disabled: {}", error);
                self.should_listen.store(false, Ordering::SeqCst);
                self.update_status(|s| {
                    s.listening = false;
                    s.error = Some(error.to_string());
                });
            }
            RecognitionError::Other(_) => warn!("{}", error),
        }
    }
}

/// Keeps a recognizer running while listening is wanted and turns
/// "弹幕说 ..." transcripts into injected comments.
pub struct VoiceCommandAdapter {
    shared: Arc<Shared>,
    cancel: CancellationToken,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl VoiceCommandAdapter {
    pub fn spawn(
        recognizer: Arc<dyn SpeechRecognizer>,
        events: UnboundedReceiver<RecognitionEvent>,
        sink: Arc<dyn CommentSink>,
        overlay_events: OverlayEvents,
    ) -> Self {
        Self::spawn_with_delay(recognizer, events, sink, overlay_events, RESTART_DELAY)
    }

    pub fn spawn_with_delay(
        recognizer: Arc<dyn SpeechRecognizer>,
        events: UnboundedReceiver<RecognitionEvent>,
        sink: Arc<dyn CommentSink>,
        overlay_events: OverlayEvents,
        restart_delay: Duration,
    ) -> Self {
        let shared = Arc::new(Shared {
            recognizer,
            should_listen: AtomicBool::new(false),
            status: Mutex::new(VoiceStatus::default()),
            events: overlay_events,
        });
        let cancel = CancellationToken::new();
        let supervisor = tokio::spawn(supervise(
            Arc::clone(&shared),
            events,
            sink,
            cancel.clone(),
            restart_delay,
        ));

        Self {
            shared,
            cancel,
            supervisor: Mutex::new(Some(supervisor)),
        }
    }

    /// Also re-arms listening after a permission failure.
    pub fn start_listening(&self) {
        if self.cancel.is_cancelled() {
            warn!("Voice adapter already shut down, not starting");
            return;
        }
        self.shared.should_listen.store(true, Ordering::SeqCst);
        self.shared.start_recognizer();
    }

    pub fn stop_listening(&self) {
        self.shared.should_listen.store(false, Ordering::SeqCst);
        self.shared.recognizer.stop();
    }

    pub fn status(&self) -> VoiceStatus {
        self.shared.status.lock().clone()
    }

    pub fn wants_listening(&self) -> bool {
        self.shared.should_listen.load(Ordering::SeqCst)
    }

    /// Stops the recognizer and detaches from its events for good.
    pub fn shutdown(&self) {
        self.stop_listening();
        self.cancel.cancel();
        if let Some(supervisor) = self.supervisor.lock().take() {
            supervisor.abort();
        }
    }
}

impl Drop for VoiceCommandAdapter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn supervise(
    shared: Arc<Shared>,
    mut events: UnboundedReceiver<RecognitionEvent>,
    sink: Arc<dyn CommentSink>,
    cancel: CancellationToken,
    restart_delay: Duration,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        match event {
            RecognitionEvent::Started => {
                info!("Speech recognition started");
                shared.update_status(|s| {
                    s.listening = true;
                    s.error = None;
                });
            }
            RecognitionEvent::Ended => {
                info!("Speech recognition ended");
                shared.update_status(|s| s.listening = false);
                if !shared.should_listen.load(Ordering::SeqCst) {
                    continue;
                }
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(restart_delay) => {}
                }
                if shared.should_listen.load(Ordering::SeqCst) {
                    shared.start_recognizer();
                }
            }
            RecognitionEvent::Error(error) => shared.handle_error(error),
            RecognitionEvent::Result(segments) => {
                let transcript = final_transcript(&segments);
                if transcript.is_empty() {
                    continue;
                }
                debug!("Transcript: {}", transcript);
                shared.update_status(|s| s.last_transcript = transcript.clone());

                if let Some(content) = extract_command(&transcript) {
                    info!("Voice comment detected: {}", content);
                    sink.inject_comment(content).await;
                }
            }
        }
    }
    debug!("Voice supervisor stopped");
}

fn final_transcript(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .filter(|s| s.is_final)
        .map(|s| s.text.as_str())
        .collect()
}
