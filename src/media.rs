use async_trait::async_trait;
use chrono::Utc;
use log::{error, info, warn};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use crate::overlay::{OverlayEvent, OverlayEvents};

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Capture permission denied")]
    PermissionDenied,
    #[error("Capture unavailable: {0}")]
    Unavailable(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoHandle {
    pub label: String,
}

#[async_trait]
pub trait CameraCapture: Send + Sync {
    async fn start_camera(&self) -> Result<VideoHandle, CaptureError>;
}

/// Raw bytes produced by a finished recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMedia {
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[async_trait]
pub trait ActiveRecording: Send {
    async fn stop(self: Box<Self>) -> Result<RecordedMedia, CaptureError>;
}

#[async_trait]
pub trait DisplayCapture: Send + Sync {
    async fn start_display_capture(&self) -> Result<Box<dyn ActiveRecording>, CaptureError>;
}

/// A finished recording ready to be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBlob {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl MediaBlob {
    fn from_recording(media: RecordedMedia, stamp: i64) -> Self {
        let extension = match media.mime_type.as_str() {
            "video/webm" => "webm",
            "video/mp4" => "mp4",
            "application/x-ndjson" => "jsonl",
            _ => "bin",
        };
        Self {
            file_name: format!("simulive_{}.{}", stamp, extension),
            mime_type: media.mime_type,
            data: media.data,
        }
    }
}

/// Camera stand-in for terminals with no video device.
pub struct HeadlessCamera;

#[async_trait]
impl CameraCapture for HeadlessCamera {
    async fn start_camera(&self) -> Result<VideoHandle, CaptureError> {
        Err(CaptureError::Unavailable("no camera device in headless mode".to_string()))
    }
}

/// Starts the camera, degrading to "no video" on any failure.
pub async fn start_camera_or_degrade(camera: &dyn CameraCapture) -> Option<VideoHandle> {
    match camera.start_camera().await {
        Ok(handle) => {
            info!("Camera started: {}", handle.label);
            Some(handle)
        }
        Err(CaptureError::PermissionDenied) => {
            warn!("Camera access denied, continuing without video");
            None
        }
        Err(e) => {
            warn!("Camera unavailable ({}), continuing without video", e);
            None
        }
    }
}

/// Record button: toggles display capture on and off.
pub struct RecordingController<C: DisplayCapture> {
    capture: C,
    active: Mutex<Option<Box<dyn ActiveRecording>>>,
    events: OverlayEvents,
}

impl<C: DisplayCapture> RecordingController<C> {
    pub fn new(capture: C, events: OverlayEvents) -> Self {
        Self {
            capture,
            active: Mutex::new(None),
            events,
        }
    }

    pub async fn is_recording(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// Starts a recording, or stops the running one and returns its blob.
    pub async fn toggle(&self) -> Result<Option<MediaBlob>, CaptureError> {
        let mut active = self.active.lock().await;
        if let Some(recording) = active.take() {
            drop(active);
            return self.finish(recording).await.map(Some);
        }

        match self.capture.start_display_capture().await {
            Ok(recording) => {
                *active = Some(recording);
                info!("Recording started");
                self.events.emit(OverlayEvent::RecordingChanged(true));
                Ok(None)
            }
            Err(e) => {
                error!("Failed to start recording: {}", e);
                Err(e)
            }
        }
    }

    /// The captured surface went away on its own.
    pub async fn track_ended(&self) -> Option<MediaBlob> {
        let recording = self.active.lock().await.take()?;
        match self.finish(recording).await {
            Ok(blob) => Some(blob),
            Err(e) => {
                error!("Failed to finalize recording: {}", e);
                None
            }
        }
    }

    async fn finish(&self, recording: Box<dyn ActiveRecording>) -> Result<MediaBlob, CaptureError> {
        let result = recording.stop().await;
        self.events.emit(OverlayEvent::RecordingChanged(false));
        let blob = MediaBlob::from_recording(result?, Utc::now().timestamp_millis());
        info!("Recording stopped: {} ({} bytes)", blob.file_name, blob.data.len());
        Ok(blob)
    }
}

/// Headless "screen" capture: records the overlay event stream as JSON lines.
pub struct OverlayEventCapture {
    events: OverlayEvents,
}

impl OverlayEventCapture {
    pub fn new(events: OverlayEvents) -> Self {
        Self { events }
    }
}

struct OverlayEventRecording {
    collector: JoinHandle<Vec<u8>>,
    stop: tokio::sync::oneshot::Sender<()>,
}

#[async_trait]
impl DisplayCapture for OverlayEventCapture {
    async fn start_display_capture(&self) -> Result<Box<dyn ActiveRecording>, CaptureError> {
        let mut rx = self.events.subscribe();
        let (stop, mut stopped) = tokio::sync::oneshot::channel();
        let collector = tokio::spawn(async move {
            let mut data = Vec::new();
            loop {
                tokio::select! {
                    biased;
                    event = rx.recv() => match event {
                        Ok(OverlayEvent::RecordingChanged(_)) => {}
                        Ok(event) => {
                            if let Ok(line) = serde_json::to_string(&event) {
                                data.extend_from_slice(line.as_bytes());
                                data.push(b'\n');
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("Recording lagged, {} overlay events lost", skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = &mut stopped => break,
                }
            }
            data
        });
        Ok(Box::new(OverlayEventRecording { collector, stop }))
    }
}

#[async_trait]
impl ActiveRecording for OverlayEventRecording {
    async fn stop(self: Box<Self>) -> Result<RecordedMedia, CaptureError> {
        let _ = self.stop.send(());
        let data = self.collector
            .await
            .map_err(|e| CaptureError::Unavailable(e.to_string()))?;
        Ok(RecordedMedia {
            mime_type: "application/x-ndjson".to_string(),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeDisplay {
        deny: AtomicBool,
    }

    struct FakeRecording;

    #[async_trait]
    impl ActiveRecording for FakeRecording {
        async fn stop(self: Box<Self>) -> Result<RecordedMedia, CaptureError> {
            Ok(RecordedMedia { mime_type: "video/webm".into(), data: vec![1, 2, 3] })
        }
    }

    #[async_trait]
    impl DisplayCapture for FakeDisplay {
        async fn start_display_capture(&self) -> Result<Box<dyn ActiveRecording>, CaptureError> {
            if self.deny.load(Ordering::SeqCst) {
                Err(CaptureError::PermissionDenied)
            } else {
                Ok(Box::new(FakeRecording))
            }
        }
    }

    struct DeniedCamera;

    #[async_trait]
    impl CameraCapture for DeniedCamera {
        async fn start_camera(&self) -> Result<VideoHandle, CaptureError> {
            Err(CaptureError::PermissionDenied)
        }
    }

    #[tokio::test]
    async fn toggle_starts_then_yields_webm_blob() {
        let controller = RecordingController::new(FakeDisplay { deny: AtomicBool::new(false) }, OverlayEvents::default());
        assert!(controller.toggle().await.unwrap().is_none());
        assert!(controller.is_recording().await);

        let blob = controller.toggle().await.unwrap().unwrap();
        assert!(blob.file_name.starts_with("simulive_"));
        assert!(blob.file_name.ends_with(".webm"));
        assert_eq!(blob.data, vec![1, 2, 3]);
        assert!(!controller.is_recording().await);
    }

    #[tokio::test]
    async fn denied_capture_leaves_controller_idle() {
        let controller = RecordingController::new(FakeDisplay { deny: AtomicBool::new(true) }, OverlayEvents::default());
        assert!(matches!(controller.toggle().await, Err(CaptureError::PermissionDenied)));
        assert!(!controller.is_recording().await);
        assert!(controller.track_ended().await.is_none());
    }

    #[tokio::test]
    async fn ended_track_finishes_recording() {
        let controller = RecordingController::new(FakeDisplay { deny: AtomicBool::new(false) }, OverlayEvents::default());
        controller.toggle().await.unwrap();
        assert!(controller.track_ended().await.is_some());
        assert!(!controller.is_recording().await);
    }

    #[tokio::test]
    async fn denied_camera_degrades() {
        assert!(start_camera_or_degrade(&DeniedCamera).await.is_none());
        assert!(start_camera_or_degrade(&HeadlessCamera).await.is_none());
    }

    #[tokio::test]
    async fn overlay_capture_records_events_as_json_lines() {
        let events = OverlayEvents::default();
        let controller = RecordingController::new(OverlayEventCapture::new(events.clone()), events.clone());
        controller.toggle().await.unwrap();

        events.emit(OverlayEvent::CleanModeChanged(true));
        events.emit(OverlayEvent::GiftCleared);
        tokio::task::yield_now().await;

        let blob = controller.toggle().await.unwrap().unwrap();
        assert!(blob.file_name.ends_with(".jsonl"));
        let text = String::from_utf8(blob.data).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("clean_mode_changed"));
        assert!(lines[1].contains("gift_cleared"));
    }
}
