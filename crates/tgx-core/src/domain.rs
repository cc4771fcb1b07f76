use chrono::{DateTime, Utc};

/// Telegram message id (monotonic per channel).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(pub i32);

/// Kind of peer, enough for an adapter to rebuild an input peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PeerKind {
    User,
    Bot,
    Chat,
    Megagroup,
    Broadcast,
    Gigagroup,
}

/// Transport-neutral reference to a resolved peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PeerRef {
    pub kind: PeerKind,
    pub id: i64,
    pub access_hash: Option<i64>,
}

/// A channel reference after resolution against the account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedChannel {
    pub id: i64,
    pub title: String,
    pub username: Option<String>,
    pub peer: PeerRef,
}

impl ResolvedChannel {
    /// Human label for logs: `@username` when available, otherwise the title.
    pub fn display_name(&self) -> String {
        match &self.username {
            Some(u) => format!("@{u}"),
            None if !self.title.trim().is_empty() => self.title.clone(),
            None => format!("Channel {}", self.id),
        }
    }
}

/// Formatting entities relevant to URL extraction.
///
/// Offsets and lengths are in UTF-16 code units, as Telegram sends them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextEntity {
    Url { offset: usize, length: usize },
    TextUrl { url: String },
}

/// One fetched message. Never mutated after the adapter builds it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRecord {
    pub id: MessageId,
    pub date: DateTime<Utc>,
    pub sender: Option<String>,
    pub text: String,
    pub urls: Vec<String>,
    pub has_media: bool,
}

impl MessageRecord {
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}
