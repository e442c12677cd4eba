pub mod ai;
pub mod config;
pub mod console;
pub mod format;
pub mod import;
pub mod logging;
pub mod media;
pub mod models;
pub mod overlay;
pub mod session;
pub mod simulation;
pub mod voice;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use crate::ai::ContentClient;
use crate::config::Config;
use crate::console::{ConsoleCommand, ConsoleRecognizer};
use crate::format::format_count;
use crate::media::{HeadlessCamera, MediaBlob, OverlayEventCapture, RecordingController};
use crate::overlay::{ClickOutcome, OverlayEvent};
use crate::session::LiveSession;
use crate::simulation::EventGenerator;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Launch-time choices that are not persisted in the config file.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub comments_file: Option<PathBuf>,
    pub avatar_file: Option<PathBuf>,
    pub generate_avatar: bool,
    pub seed: Option<u64>,
    pub offline: bool,
}

pub struct SessionClients {
    pub session: Arc<LiveSession>,
    pub content: ContentClient,
    pub recorder: RecordingController<OverlayEventCapture>,
    pub recognizer: Arc<ConsoleRecognizer>,
}

pub async fn init(config: &Config, options: &LaunchOptions) -> Result<SessionClients, BoxError> {
    let content = if options.offline {
        ContentClient::offline()
    } else {
        ContentClient::new(config.api_key())
    };
    if !content.is_online() {
        info!("No Gemini API key in use, viewers will be placeholders");
    }

    let mut settings = config.setup.stream_settings();
    if let Some(path) = &options.avatar_file {
        settings.host_avatar = import::avatar_data_url(path)?;
        info!("Host avatar loaded from {}", path.display());
    } else if options.generate_avatar {
        match content.generate_host_avatar(&settings.host_name).await {
            Some(image) => settings.host_avatar = image,
            None => warn!("Avatar generation produced nothing, keeping the configured avatar"),
        }
    }

    let session = LiveSession::new(settings, Vec::new());
    session.merge_comments(config.setup.comments.clone()).await;
    if let Some(path) = &options.comments_file {
        let lines = import::import_comment_file(path)?;
        let added = session.merge_comments(lines).await;
        println!("Imported {} comments", added);
    }

    if media::start_camera_or_degrade(&HeadlessCamera).await.is_none() {
        info!("Going live without a camera feed");
    }

    let users = content.generate_users(config.setup.user_count).await;
    session.set_users(users).await?;

    let (voice_tx, voice_rx) = mpsc::unbounded_channel();
    let recognizer = Arc::new(ConsoleRecognizer::new(voice_tx));
    session.attach_voice(recognizer.clone(), voice_rx);

    let recorder = RecordingController::new(OverlayEventCapture::new(session.events()), session.events());

    let generator = options.seed.map(EventGenerator::seeded).unwrap_or_default();
    session.start(generator).await?;

    Ok(SessionClients {
        session,
        content,
        recorder,
        recognizer,
    })
}

pub async fn run(clients: SessionClients, config: &Config, duration: Option<Duration>) -> Result<(), BoxError> {
    let SessionClients { session, recorder, recognizer, .. } = clients;
    let renderer = tokio::spawn(render_overlay(session.subscribe(), config.verbose_logging));

    println!("{} is live. {}", session.settings().await.host_name, console::HELP);

    let deadline = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => futures::future::pending::<()>().await,
        }
    };

    tokio::select! {
        result = read_commands(&session, &recorder, &recognizer, config) => result?,
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down."),
        _ = deadline => info!("Session duration elapsed, shutting down."),
    }

    if recorder.is_recording().await {
        match recorder.toggle().await {
            Ok(Some(blob)) => save_blob(&blob),
            Ok(None) => {}
            Err(e) => error!("Failed to finish recording: {}", e),
        }
    }
    session.stop();
    renderer.abort();

    println!("Stream ended.");
    Ok(())
}

async fn render_overlay(mut events: broadcast::Receiver<OverlayEvent>, verbose: bool) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Some(line) = console::render_event(&event, verbose) {
                    println!("{}", line);
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Renderer fell behind, {} overlay events skipped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn read_commands(
    session: &Arc<LiveSession>,
    recorder: &RecordingController<OverlayEventCapture>,
    recognizer: &ConsoleRecognizer,
    config: &Config,
) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<ConsoleCommand>() {
            Ok(command) => {
                log_verbose!(config, "Console command: {:?}", command);
                if !handle_command(session, recorder, recognizer, command).await {
                    return Ok(());
                }
            }
            Err(e) => println!("{} ({})", e, console::HELP),
        }
    }

    info!("Input closed, the stream keeps running until Ctrl+C");
    futures::future::pending::<()>().await;
    Ok(())
}

/// Returns false once the user asked to quit.
async fn handle_command(
    session: &Arc<LiveSession>,
    recorder: &RecordingController<OverlayEventCapture>,
    recognizer: &ConsoleRecognizer,
    command: ConsoleCommand,
) -> bool {
    match command {
        ConsoleCommand::Like => {
            session.double_click().await;
        }
        ConsoleCommand::PointerDown => session.pointer_down(),
        ConsoleCommand::PointerUp => session.pointer_up(),
        ConsoleCommand::Tap => report_click(session.click()),
        ConsoleCommand::Hold(duration) => {
            session.pointer_down();
            tokio::time::sleep(duration).await;
            session.pointer_up();
            report_click(session.click());
        }
        ConsoleCommand::Say(speech) => {
            if !recognizer.hear(&speech) {
                println!("Not listening, type `listen` first");
            }
        }
        ConsoleCommand::Listen => session.start_listening(),
        ConsoleCommand::Mute => session.stop_listening(),
        ConsoleCommand::Record => match recorder.toggle().await {
            Ok(Some(blob)) => save_blob(&blob),
            Ok(None) => {}
            Err(e) => println!("Recording failed: {}", e),
        },
        ConsoleCommand::Status => print_status(session).await,
        ConsoleCommand::Help => println!("{}", console::HELP),
        ConsoleCommand::Quit => return false,
    }
    true
}

fn report_click(outcome: ClickOutcome) {
    if outcome == ClickOutcome::PassThrough {
        println!("(tap)");
    }
}

async fn print_status(session: &LiveSession) {
    let snapshot = session.snapshot().await;
    let settings = &snapshot.settings;
    let top: Vec<&str> = snapshot.top_viewers.iter().map(|u| u.name.as_str()).collect();

    println!(
        "{} | {} 本场点赞 | {} 在线 | filter {:?}",
        settings.host_name,
        format_count(settings.like_count),
        settings.viewer_count,
        settings.filter
    );
    println!("top viewers: {}", top.join(", "));
    println!(
        "chat lines: {} | hearts on screen: {} | clean mode: {}",
        snapshot.comments.len(),
        snapshot.hearts.len(),
        snapshot.clean_mode
    );
    if let Some(gift) = &snapshot.gift {
        println!("gift on screen: {} from {}", gift.gift.name, gift.user.name);
    }
    if let Some(voice) = session.voice_status() {
        println!(
            "voice: {}{}",
            if voice.listening { "listening" } else { "idle" },
            voice.error.map(|e| format!(" ({})", e)).unwrap_or_default()
        );
    }
}

fn save_blob(blob: &MediaBlob) {
    match fs::write(&blob.file_name, &blob.data) {
        Ok(()) => println!("Saved recording to {}", blob.file_name),
        Err(e) => error!("Failed to save {}: {}", blob.file_name, e),
    }
}
