use std::collections::VecDeque;
use crate::models::CommentEvent;

/// Bounded, insertion-ordered danmaku list. Oldest entries are evicted first.
#[derive(Debug, Clone)]
pub struct ChatBuffer {
    entries: VecDeque<CommentEvent>,
    capacity: usize,
}

impl Default for ChatBuffer {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

impl ChatBuffer {
    pub const DEFAULT_CAPACITY: usize = 50;

    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "chat buffer capacity must be positive");
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends to the end, returning the evicted entry if the buffer was full.
    pub fn append(&mut self, event: CommentEvent) -> Option<CommentEvent> {
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(event);
        evicted
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommentEvent> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<CommentEvent> {
        self.entries.iter().cloned().collect()
    }

    pub fn last(&self) -> Option<&CommentEvent> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
