use std::fmt;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A member of the simulated audience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub level: u32,
    pub location: Option<String>,
}

impl User {
    pub const SELF_ID: &'static str = "self";

    /// Pseudo-user that voice-injected comments are attributed to.
    pub fn self_user(name: &str, avatar: &str) -> Self {
        Self {
            id: Self::SELF_ID.to_string(),
            name: name.to_string(),
            avatar: avatar.to_string(),
            level: 1,
            location: None,
        }
    }

    pub fn is_self(&self) -> bool {
        self.id == Self::SELF_ID
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentKind {
    Chat,
    Join,
    Gift,
}

/// One entry of the danmaku list. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentEvent {
    pub id: String,
    pub user: Arc<User>,
    pub content: String,
    pub kind: CommentKind,
    pub gift_name: Option<String>,
    pub gift_icon: Option<String>,
}

impl CommentEvent {
    pub fn chat(user: Arc<User>, content: impl Into<String>) -> Self {
        Self {
            id: format!("c_{}", Uuid::new_v4()),
            user,
            content: content.into(),
            kind: CommentKind::Chat,
            gift_name: None,
            gift_icon: None,
        }
    }

    pub fn join(user: Arc<User>) -> Self {
        Self {
            id: format!("j_{}", Uuid::new_v4()),
            user,
            content: String::new(),
            kind: CommentKind::Join,
            gift_name: None,
            gift_icon: None,
        }
    }

    pub fn gift(user: Arc<User>, gift: &Gift) -> Self {
        Self {
            id: format!("g_{}", Uuid::new_v4()),
            user,
            content: String::new(),
            kind: CommentKind::Gift,
            gift_name: Some(gift.name.to_string()),
            gift_icon: Some(gift.icon.to_string()),
        }
    }
}

impl fmt::Display for CommentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            CommentKind::Chat => write!(f, "[Lv{}] {}: {}", self.user.level, self.user.name, self.content),
            CommentKind::Join => write!(f, "{} 来了", self.user.name),
            CommentKind::Gift => write!(
                f,
                "{} 送出 {} {}",
                self.user.name,
                self.gift_name.as_deref().unwrap_or_default(),
                self.gift_icon.as_deref().unwrap_or_default()
            ),
        }
    }
}

/// Catalog entry for a gift animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Gift {
    pub name: &'static str,
    pub icon: &'static str,
    pub value: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    None,
    Warm,
    Cool,
    #[default]
    Soft,
    #[serde(alias = "bw")]
    Monochrome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSettings {
    pub viewer_count: u64,
    pub like_count: u64,
    pub host_name: String,
    pub host_avatar: String,
    pub filter: FilterType,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            viewer_count: 4272,
            like_count: 107000,
            host_name: "小喵悦读".to_string(),
            host_avatar: "https://picsum.photos/seed/catreader/200/200".to_string(),
            filter: FilterType::Soft,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer() -> Arc<User> {
        Arc::new(User {
            id: "u1".into(),
            name: "阿狸".into(),
            avatar: "a.png".into(),
            level: 7,
            location: Some("杭州".into()),
        })
    }

    #[test]
    fn only_chat_events_carry_content() {
        let gift = Gift { name: "玫瑰", icon: "🌹", value: 1 };
        let chat = CommentEvent::chat(viewer(), "主播好");
        let join = CommentEvent::join(viewer());
        let gifted = CommentEvent::gift(viewer(), &gift);

        assert!(!chat.content.is_empty());
        assert!(join.content.is_empty());
        assert!(gifted.content.is_empty());
        assert_eq!(gifted.gift_name.as_deref(), Some("玫瑰"));
        assert_eq!(gifted.gift_icon.as_deref(), Some("🌹"));
        assert!(chat.gift_name.is_none() && join.gift_icon.is_none());
    }

    #[test]
    fn comment_ids_are_unique() {
        let a = CommentEvent::chat(viewer(), "1");
        let b = CommentEvent::chat(viewer(), "1");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn legacy_bw_filter_name_still_parses() {
        #[derive(Deserialize)]
        struct Wrapper {
            filter: FilterType,
        }
        let parsed: Wrapper = toml::from_str("filter = \"bw\"").unwrap();
        assert_eq!(parsed.filter, FilterType::Monochrome);
    }
}
