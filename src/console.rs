use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use colored::Colorize;
use log::debug;
use tokio::sync::mpsc::UnboundedSender;
use crate::format::format_count;
use crate::models::CommentKind;
use crate::overlay::OverlayEvent;
use crate::voice::{RecognitionError, RecognitionEvent, SpeechRecognizer, TranscriptSegment};

pub const HELP: &str = "commands: like | down | up | tap | hold <ms> | say <speech> | listen | mute | record | status | help | quit";

/// One line typed into the headless session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Like,
    PointerDown,
    PointerUp,
    Tap,
    Hold(Duration),
    Say(String),
    Listen,
    Mute,
    Record,
    Status,
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb.to_ascii_lowercase().as_str() {
            "like" | "double" => Ok(ConsoleCommand::Like),
            "down" => Ok(ConsoleCommand::PointerDown),
            "up" | "leave" => Ok(ConsoleCommand::PointerUp),
            "tap" | "click" => Ok(ConsoleCommand::Tap),
            "hold" => {
                let millis = if rest.is_empty() { 800 } else {
                    rest.parse::<u64>().map_err(|_| format!("hold expects milliseconds, got '{}'", rest))?
                };
                Ok(ConsoleCommand::Hold(Duration::from_millis(millis)))
            }
            "say" if !rest.is_empty() => Ok(ConsoleCommand::Say(rest.to_string())),
            "say" => Err("say expects some speech".to_string()),
            "listen" => Ok(ConsoleCommand::Listen),
            "mute" => Ok(ConsoleCommand::Mute),
            "record" => Ok(ConsoleCommand::Record),
            "status" => Ok(ConsoleCommand::Status),
            "help" | "?" => Ok(ConsoleCommand::Help),
            "quit" | "exit" | "q" => Ok(ConsoleCommand::Quit),
            "" => Err("empty command".to_string()),
            other => Err(format!("unknown command '{}'", other)),
        }
    }
}

/// Recognizer fed by `say` lines, standing in for a microphone.
pub struct ConsoleRecognizer {
    active: AtomicBool,
    events: UnboundedSender<RecognitionEvent>,
}

impl ConsoleRecognizer {
    pub fn new(events: UnboundedSender<RecognitionEvent>) -> Self {
        Self {
            active: AtomicBool::new(false),
            events,
        }
    }

    /// Delivers a spoken line as a finalized transcript.
    pub fn hear(&self, speech: &str) -> bool {
        if !self.active.load(Ordering::SeqCst) {
            debug!("Not listening, ignoring speech");
            return false;
        }
        self.events
            .send(RecognitionEvent::Result(vec![TranscriptSegment::final_text(speech)]))
            .is_ok()
    }
}

impl SpeechRecognizer for ConsoleRecognizer {
    fn start(&self) -> Result<(), RecognitionError> {
        if self.active.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.events
            .send(RecognitionEvent::Started)
            .map_err(|e| RecognitionError::Other(e.to_string()))
    }

    fn stop(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            let _ = self.events.send(RecognitionEvent::Ended);
        }
    }
}

/// Terminal rendering of overlay events. Hearts are only shown when verbose.
pub fn render_event(event: &OverlayEvent, verbose: bool) -> Option<String> {
    match event {
        OverlayEvent::CommentAppended(comment) => Some(match comment.kind {
            CommentKind::Chat if comment.user.is_self() => format!("{} {}", "我:".bright_magenta().bold(), comment.content),
            CommentKind::Chat => format!(
                "{} {} {}",
                format!("Lv{}", comment.user.level).on_bright_blue(),
                format!("{}:", comment.user.name).bright_cyan(),
                comment.content
            ),
            CommentKind::Join => format!("{}", comment.to_string().dimmed()),
            CommentKind::Gift => format!("{}", comment.to_string().bright_yellow()),
        }),
        OverlayEvent::SettingsChanged(settings) if verbose => Some(format!(
            "{} {}本场点赞 | {} 在线",
            settings.host_name.bold(),
            format_count(settings.like_count),
            settings.viewer_count
        )),
        OverlayEvent::GiftShown { user, gift } => Some(
            format!("✨ {} {} 送出 {} x1 ✨", gift.icon, user.name, gift.name)
                .bright_yellow()
                .bold()
                .to_string(),
        ),
        OverlayEvent::GiftCleared if verbose => Some("(gift animation finished)".dimmed().to_string()),
        OverlayEvent::HeartSpawned(heart) if verbose => Some(format!("♥ #{} {}", heart.id, heart.color).red().to_string()),
        OverlayEvent::CleanModeChanged(on) => Some(
            (if *on { "[clean mode: overlay hidden]" } else { "[clean mode off: overlay restored]" })
                .italic()
                .to_string(),
        ),
        OverlayEvent::RecordingChanged(on) => Some(if *on { "● REC".red().bold().to_string() } else { "■ recording stopped".to_string() }),
        OverlayEvent::VoiceStatusChanged(status) => status
            .error
            .as_ref()
            .map(|e| format!("voice: {}", e).yellow().to_string()),
        _ => None,
    }
}
