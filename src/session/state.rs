use std::sync::Arc;
use crate::models::{CommentEvent, StreamSettings, User};
use super::chat_buffer::ChatBuffer;

/// All state shared between the generator, the voice adapter and the
/// presentation layer. Lives behind the session's lock; readers get clones.
#[derive(Debug, Clone)]
pub struct SessionState {
    settings: StreamSettings,
    chat: ChatBuffer,
    users: Vec<Arc<User>>,
    comment_pool: Vec<String>,
    like_trigger: u64,
}

impl SessionState {
    pub fn new(settings: StreamSettings, comment_pool: Vec<String>) -> Self {
        Self {
            settings,
            chat: ChatBuffer::default(),
            users: Vec::new(),
            comment_pool,
            like_trigger: 0,
        }
    }

    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: StreamSettings) {
        self.settings = settings;
    }

    pub fn chat(&self) -> &ChatBuffer {
        &self.chat
    }

    pub fn users(&self) -> &[Arc<User>] {
        &self.users
    }

    pub fn comment_pool(&self) -> &[String] {
        &self.comment_pool
    }

    pub fn like_trigger(&self) -> u64 {
        self.like_trigger
    }

    pub fn set_users(&mut self, users: Vec<User>) {
        self.users = users.into_iter().map(Arc::new).collect();
    }

    /// Adds non-empty trimmed lines to the comment pool, returning how many were added.
    pub fn merge_comments<I, S>(&mut self, lines: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let before = self.comment_pool.len();
        self.comment_pool.extend(
            lines
                .into_iter()
                .map(|l| l.as_ref().trim().to_string())
                .filter(|l| !l.is_empty()),
        );
        self.comment_pool.len() - before
    }

    pub fn append_comment(&mut self, event: CommentEvent) {
        self.chat.append(event);
    }

    pub fn add_likes(&mut self, likes: u64) -> u64 {
        self.settings.like_count = self.settings.like_count.saturating_add(likes);
        self.settings.like_count
    }

    /// Advances the heart trigger counter and returns its new value.
    pub fn bump_like_trigger(&mut self) -> u64 {
        self.like_trigger += 1;
        self.like_trigger
    }

    /// Applies a signed change to the viewer count, floored at zero.
    pub fn adjust_viewers(&mut self, delta: i64) -> u64 {
        self.settings.viewer_count = self.settings.viewer_count.saturating_add_signed(delta);
        self.settings.viewer_count
    }

    /// The first few users, shown as avatars in the header.
    pub fn top_viewers(&self, count: usize) -> Vec<Arc<User>> {
        self.users.iter().take(count).cloned().collect()
    }
}
