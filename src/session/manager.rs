use std::sync::Arc;
use async_trait::async_trait;
use log::{info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use crate::models::{CommentEvent, Gift, StreamSettings, User};
use crate::overlay::{
    ActiveGift, ClickOutcome, FloatingHeart, GiftOverlay, HeartPool, InteractionController, OverlayEvent,
    OverlayEvents,
};
use crate::simulation::catalog::GIFT_CATALOG;
use crate::simulation::{EventGenerator, TickPlan};
use crate::voice::{CommentSink, RecognitionEvent, SpeechRecognizer, VoiceCommandAdapter, VoiceStatus};
use super::errors::SessionError;
use super::state::SessionState;

/// What one generator tick changed.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub draw: f64,
    pub likes_added: u64,
    pub heart: Option<FloatingHeart>,
    pub comments: Vec<CommentEvent>,
    pub gift: Option<Gift>,
    pub viewer_delta: i64,
}

/// A consistent copy of everything the overlay draws.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub settings: StreamSettings,
    pub comments: Vec<CommentEvent>,
    pub gift: Option<ActiveGift>,
    pub hearts: Vec<FloatingHeart>,
    pub clean_mode: bool,
    pub top_viewers: Vec<Arc<User>>,
}

/// Coordinator owning one simulated live session.
pub struct LiveSession {
    state: RwLock<SessionState>,
    gifts: GiftOverlay,
    hearts: HeartPool,
    interaction: InteractionController,
    events: OverlayEvents,
    cancel: CancellationToken,
    generator: Mutex<Option<JoinHandle<()>>>,
    voice: Mutex<Option<VoiceCommandAdapter>>,
}

impl LiveSession {
    pub fn new(settings: StreamSettings, comment_pool: Vec<String>) -> Arc<Self> {
        let events = OverlayEvents::default();
        Arc::new(Self {
            state: RwLock::new(SessionState::new(settings, comment_pool)),
            gifts: GiftOverlay::new(events.clone()),
            hearts: HeartPool::new(events.clone()),
            interaction: InteractionController::new(events.clone()),
            events,
            cancel: CancellationToken::new(),
            generator: Mutex::new(None),
            voice: Mutex::new(None),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OverlayEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> OverlayEvents {
        self.events.clone()
    }

    /// Replaces the roster. An empty roster is refused so a running
    /// generator always has someone to pick.
    pub async fn set_users(&self, users: Vec<User>) -> Result<(), SessionError> {
        if users.is_empty() {
            return Err(SessionError::EmptyUserPool);
        }
        info!("Session roster set to {} users", users.len());
        self.state.write().await.set_users(users);
        Ok(())
    }

    pub async fn merge_comments(&self, lines: Vec<String>) -> usize {
        self.state.write().await.merge_comments(lines)
    }

    /// Replaces the whole settings value (setup-time edits).
    pub async fn set_settings(&self, settings: StreamSettings) {
        self.state.write().await.set_settings(settings.clone());
        self.events.emit(OverlayEvent::SettingsChanged(settings));
    }

    pub async fn settings(&self) -> StreamSettings {
        self.state.read().await.settings().clone()
    }

    /// Starts the generator. Both pools have to be populated first.
    pub async fn start(self: &Arc<Self>, generator: EventGenerator) -> Result<(), SessionError> {
        if self.cancel.is_cancelled() {
            return Err(SessionError::Stopped);
        }
        {
            let state = self.state.read().await;
            if state.users().is_empty() {
                return Err(SessionError::EmptyUserPool);
            }
            if state.comment_pool().is_empty() {
                return Err(SessionError::EmptyCommentPool);
            }
        }

        let mut slot = self.generator.lock();
        if slot.is_some() {
            return Err(SessionError::AlreadyStarted);
        }
        *slot = Some(tokio::spawn(generator.run(Arc::clone(self), self.cancel.clone())));
        info!("Live session started");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        let generator = self.generator.lock();
        generator.as_ref().is_some_and(|handle| !handle.is_finished()) && !self.cancel.is_cancelled()
    }

    /// Rolls and applies one tick. Skipped while either pool is empty.
    pub(crate) async fn run_tick(&self, generator: &mut EventGenerator) -> Option<TickReport> {
        let mut state = self.state.write().await;
        let (users, comments) = (state.users().len(), state.comment_pool().len());
        if users == 0 || comments == 0 {
            warn!("Skipping tick: {} users, {} comments in pool", users, comments);
            return None;
        }
        let plan = generator.plan_tick(users, comments);
        Some(self.apply_plan(&mut state, &plan))
    }

    /// Applies a tick plan as one atomic step. Gates whose picks fall outside
    /// the current pools are skipped.
    pub async fn apply_tick(&self, plan: &TickPlan) -> TickReport {
        let mut state = self.state.write().await;
        self.apply_plan(&mut state, plan)
    }

    fn apply_plan(&self, state: &mut SessionState, plan: &TickPlan) -> TickReport {
        let mut report = TickReport {
            draw: plan.draw,
            ..TickReport::default()
        };
        if self.cancel.is_cancelled() {
            return report;
        }
        let mut settings_changed = false;

        if let Some(burst) = plan.like {
            state.add_likes(burst.added);
            report.likes_added = burst.added;
            settings_changed |= burst.added > 0;
            if burst.heart {
                let trigger = state.bump_like_trigger();
                report.heart = self.hearts.on_trigger(trigger);
            }
        }

        let chat = plan.chat.and_then(|(user, line)| {
            Some((state.users().get(user).cloned()?, state.comment_pool().get(line).cloned()?))
        });
        if let Some((user, content)) = chat {
            report.comments.push(self.append(state, CommentEvent::chat(user, content)));
        } else if plan.chat.is_some() {
            warn!("Chat pick {:?} is outside the current pools", plan.chat);
        }

        if let Some(user) = plan.join.and_then(|user| state.users().get(user).cloned()) {
            report.comments.push(self.append(state, CommentEvent::join(user)));
            state.adjust_viewers(1);
            report.viewer_delta += 1;
            settings_changed = true;
        } else if plan.join.is_some() {
            warn!("Join pick {:?} is outside the roster", plan.join);
        }

        let gift = plan.gift.and_then(|(user, gift)| {
            Some((state.users().get(user).cloned()?, *GIFT_CATALOG.get(gift)?))
        });
        if plan.gift.is_some() && gift.is_none() {
            warn!("Gift pick {:?} is outside the roster or catalog", plan.gift);
        }
        if let Some((user, gift)) = gift {
            self.gifts.show(Arc::clone(&user), gift);
            report.comments.push(self.append(state, CommentEvent::gift(user, &gift)));
            report.gift = Some(gift);
        }

        if let Some(delta) = plan.viewer_delta {
            let before = state.settings().viewer_count;
            let after = state.adjust_viewers(delta);
            report.viewer_delta += after as i64 - before as i64;
            settings_changed |= after != before;
        }

        if settings_changed {
            self.events.emit(OverlayEvent::SettingsChanged(state.settings().clone()));
        }
        report
    }

    fn append(&self, state: &mut SessionState, event: CommentEvent) -> CommentEvent {
        state.append_comment(event.clone());
        self.events.emit(OverlayEvent::CommentAppended(event.clone()));
        event
    }

    /// Like button or double tap: one like and one heart.
    pub async fn manual_like(&self) -> Option<FloatingHeart> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let mut state = self.state.write().await;
        state.add_likes(1);
        let trigger = state.bump_like_trigger();
        let heart = self.hearts.on_trigger(trigger);
        self.events.emit(OverlayEvent::SettingsChanged(state.settings().clone()));
        heart
    }

    /// Appends a chat line from the host's own pseudo-user.
    pub async fn inject_self_comment(&self, content: String) -> Result<CommentEvent, SessionError> {
        if self.cancel.is_cancelled() {
            return Err(SessionError::Stopped);
        }
        let mut state = self.state.write().await;
        let settings = state.settings();
        let user = Arc::new(User::self_user(&settings.host_name, &settings.host_avatar));
        Ok(self.append(&mut state, CommentEvent::chat(user, content)))
    }

    pub fn pointer_down(&self) {
        if !self.cancel.is_cancelled() {
            self.interaction.pointer_down();
        }
    }

    pub fn pointer_up(&self) {
        self.interaction.pointer_up();
    }

    /// A stopped session swallows every click.
    pub fn click(&self) -> ClickOutcome {
        if self.cancel.is_cancelled() {
            return ClickOutcome::Suppressed;
        }
        self.interaction.click()
    }

    pub async fn double_click(&self) -> Option<FloatingHeart> {
        self.manual_like().await
    }

    pub fn is_clean_mode(&self) -> bool {
        self.interaction.is_clean_mode()
    }

    pub fn gift_overlay(&self) -> &GiftOverlay {
        &self.gifts
    }

    pub fn hearts(&self) -> &HeartPool {
        &self.hearts
    }

    /// Wires a speech recognizer to the chat. Replaces any earlier adapter.
    pub fn attach_voice(
        self: &Arc<Self>,
        recognizer: Arc<dyn SpeechRecognizer>,
        events: mpsc::UnboundedReceiver<RecognitionEvent>,
    ) {
        let sink: Arc<dyn CommentSink> = Arc::clone(self) as Arc<dyn CommentSink>;
        let adapter = VoiceCommandAdapter::spawn(recognizer, events, sink, self.events.clone());
        if let Some(previous) = self.voice.lock().replace(adapter) {
            previous.shutdown();
        }
    }

    pub fn start_listening(&self) {
        match self.voice.lock().as_ref() {
            Some(voice) => voice.start_listening(),
            None => warn!("No speech recognizer attached"),
        }
    }

    pub fn stop_listening(&self) {
        if let Some(voice) = self.voice.lock().as_ref() {
            voice.stop_listening();
        }
    }

    pub fn voice_status(&self) -> Option<VoiceStatus> {
        self.voice.lock().as_ref().map(|v| v.status())
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;
        SessionSnapshot {
            settings: state.settings().clone(),
            comments: state.chat().to_vec(),
            gift: self.gifts.current(),
            hearts: self.hearts.live(),
            clean_mode: self.interaction.is_clean_mode(),
            top_viewers: state.top_viewers(3),
        }
    }

    /// Cancels the generator and every outstanding timer, and detaches voice input.
    pub fn stop(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        if let Some(generator) = self.generator.lock().take() {
            generator.abort();
        }
        self.gifts.shutdown();
        self.hearts.shutdown();
        self.interaction.shutdown();
        if let Some(voice) = self.voice.lock().take() {
            voice.shutdown();
        }
        info!("Live session stopped");
    }
}

#[async_trait]
impl CommentSink for LiveSession {
    async fn inject_comment(&self, content: String) {
        if let Err(e) = self.inject_self_comment(content).await {
            warn!("Voice comment dropped: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CommentKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    fn users(n: usize) -> Vec<User> {
        (0..n)
            .map(|i| User {
                id: format!("u{}", i),
                name: format!("观众{}", i),
                avatar: String::new(),
                level: 1 + i as u32,
                location: None,
            })
            .collect()
    }

    async fn ready_session() -> Arc<LiveSession> {
        let session = LiveSession::new(StreamSettings::default(), vec!["主播好".into(), "来了".into()]);
        session.set_users(users(4)).await.unwrap();
        session
    }

    #[tokio::test(start_paused = true)]
    async fn refuses_to_start_with_empty_pools() {
        let session = LiveSession::new(StreamSettings::default(), vec!["x".into()]);
        assert_eq!(session.start(EventGenerator::seeded(1)).await, Err(SessionError::EmptyUserPool));

        let session = LiveSession::new(StreamSettings::default(), Vec::new());
        session.set_users(users(2)).await.unwrap();
        assert_eq!(session.start(EventGenerator::seeded(1)).await, Err(SessionError::EmptyCommentPool));
    }

    #[tokio::test(start_paused = true)]
    async fn starts_once() {
        let session = ready_session().await;
        session.start(EventGenerator::seeded(1)).await.unwrap();
        assert_eq!(session.start(EventGenerator::seeded(2)).await, Err(SessionError::AlreadyStarted));
        session.stop();
        assert!(!session.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn generator_keeps_chat_bounded() {
        let session = ready_session().await;
        session.start(EventGenerator::seeded(5)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(800)).await;

        let snapshot = session.snapshot().await;
        assert!(!snapshot.comments.is_empty());
        assert!(snapshot.comments.len() <= 50);
        assert!(snapshot.settings.like_count >= StreamSettings::default().like_count);
        session.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_all_mutation() {
        let session = ready_session().await;
        session.start(EventGenerator::seeded(11)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        session.stop();

        let frozen = session.snapshot().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        let later = session.snapshot().await;
        assert_eq!(frozen.settings, later.settings);
        assert_eq!(frozen.comments, later.comments);
        assert!(later.hearts.is_empty());
        assert_eq!(session.start(EventGenerator::seeded(1)).await, Err(SessionError::Stopped));
    }

    #[tokio::test(start_paused = true)]
    async fn manual_like_adds_one_and_spawns_heart() {
        let session = ready_session().await;
        let before = session.settings().await.like_count;
        let heart = session.double_click().await;
        assert!(heart.is_some());
        assert_eq!(session.settings().await.like_count, before + 1);
        assert_eq!(session.hearts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn self_comment_is_attributed_to_host() {
        let session = ready_session().await;
        let event = session.inject_self_comment("大家好".into()).await.unwrap();
        assert_eq!(event.kind, CommentKind::Chat);
        assert!(event.user.is_self());
        assert_eq!(event.user.name, StreamSettings::default().host_name);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_session_ignores_input() {
        let session = ready_session().await;
        let before = session.snapshot().await;
        session.stop();

        session.pointer_down();
        tokio::time::sleep(Duration::from_millis(700)).await;
        session.pointer_up();
        assert_eq!(session.click(), ClickOutcome::Suppressed);
        assert!(session.double_click().await.is_none());
        assert_eq!(session.inject_self_comment("晚安".into()).await, Err(SessionError::Stopped));

        let after = session.snapshot().await;
        assert!(!after.clean_mode);
        assert_eq!(after.settings, before.settings);
        assert!(after.comments.is_empty());
        assert!(after.hearts.is_empty());
        assert!(session.hearts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn long_press_in_flight_is_cancelled_by_stop() {
        let session = ready_session().await;
        session.pointer_down();
        tokio::time::sleep(Duration::from_millis(300)).await;
        session.stop();
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!session.is_clean_mode());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_roster_is_refused() {
        let session = ready_session().await;
        session.start(EventGenerator::seeded(4)).await.unwrap();
        assert_eq!(session.set_users(Vec::new()).await, Err(SessionError::EmptyUserPool));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(session.is_running());
        assert_eq!(session.snapshot().await.top_viewers.len(), 3);
        session.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn emptied_pool_skips_ticks_without_killing_generator() {
        let session = LiveSession::new(StreamSettings::default(), vec!["在吗".into()]);
        session.set_users(users(3)).await.unwrap();
        session.start(EventGenerator::seeded(8)).await.unwrap();
        session.state.write().await.set_users(Vec::new());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(session.is_running());
        assert!(session.snapshot().await.comments.is_empty());
        session.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_range_picks_are_skipped() {
        let session = ready_session().await;
        let plan = TickPlan {
            draw: 0.999,
            like: None,
            chat: Some((99, 0)),
            join: Some(42),
            gift: Some((0, 999)),
            viewer_delta: None,
        };

        let report = session.apply_tick(&plan).await;
        assert!(report.comments.is_empty());
        assert!(report.gift.is_none());
        assert_eq!(report.viewer_delta, 0);
        assert!(!session.gift_overlay().is_showing());
    }

    #[tokio::test(start_paused = true)]
    async fn viewer_fluctuation_floors_at_zero() {
        let session = ready_session().await;
        session
            .set_settings(StreamSettings { viewer_count: 2, ..StreamSettings::default() })
            .await;
        let mut rng = StdRng::seed_from_u64(3);
        let mut plan = TickPlan::from_draw(0.5, &mut rng, 4, 2);
        plan.viewer_delta = Some(-5);

        let report = session.apply_tick(&plan).await;
        assert_eq!(report.viewer_delta, -2);
        assert_eq!(session.settings().await.viewer_count, 0);
    }
}
