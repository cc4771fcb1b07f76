//! Raw TL history responses into [`MessageRecord`]s.

use std::collections::HashMap;

use chrono::DateTime;
use grammers_tl_types as tl;

use tgx_core::{
    domain::{MessageId, MessageRecord, TextEntity},
    errors::Error,
    formatting::{chat_display_name, extract_urls, user_display_name},
    ports::HistoryPage,
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum SenderKey {
    User(i64),
    Chat(i64),
    Channel(i64),
}

impl From<&tl::enums::Peer> for SenderKey {
    fn from(peer: &tl::enums::Peer) -> Self {
        match peer {
            tl::enums::Peer::User(p) => SenderKey::User(p.user_id),
            tl::enums::Peer::Chat(p) => SenderKey::Chat(p.chat_id),
            tl::enums::Peer::Channel(p) => SenderKey::Channel(p.channel_id),
        }
    }
}

/// One `messages.getHistory` response as a [`HistoryPage`].
///
/// Service and empty messages produce no record but still count towards
/// `last_id`, so a page made only of them does not read as end of history.
pub(crate) fn history_page(response: tl::enums::messages::Messages) -> Result<HistoryPage> {
    use tl::enums::messages::Messages;

    let (messages, users, chats) = match response {
        Messages::Messages(m) => (m.messages, m.users, m.chats),
        Messages::Slice(m) => (m.messages, m.users, m.chats),
        Messages::ChannelMessages(m) => (m.messages, m.users, m.chats),
        Messages::NotModified(_) => return Ok(HistoryPage::default()),
    };

    let last_id = messages.iter().map(raw_id).max().map(MessageId);
    let names = sender_names(&users, &chats);
    let mut records = messages
        .into_iter()
        .filter_map(|m| match m {
            tl::enums::Message::Message(m) => Some(m),
            _ => None,
        })
        .map(|m| record(m, &names))
        .collect::<Result<Vec<_>>>()?;
    records.sort_by_key(|r| r.id);

    Ok(HistoryPage { records, last_id })
}

fn raw_id(message: &tl::enums::Message) -> i32 {
    match message {
        tl::enums::Message::Empty(m) => m.id,
        tl::enums::Message::Message(m) => m.id,
        tl::enums::Message::Service(m) => m.id,
    }
}

fn sender_names(users: &[tl::enums::User], chats: &[tl::enums::Chat]) -> HashMap<SenderKey, String> {
    let mut names = HashMap::new();
    for user in users {
        if let tl::enums::User::User(u) = user {
            names.insert(
                SenderKey::User(u.id),
                user_display_name(
                    u.first_name.as_deref(),
                    u.last_name.as_deref(),
                    u.username.as_deref(),
                    u.id,
                ),
            );
        }
    }
    for chat in chats {
        let (key, title) = match chat {
            tl::enums::Chat::Chat(c) => (SenderKey::Chat(c.id), c.title.as_str()),
            tl::enums::Chat::Forbidden(c) => (SenderKey::Chat(c.id), c.title.as_str()),
            tl::enums::Chat::Channel(c) => (SenderKey::Channel(c.id), c.title.as_str()),
            tl::enums::Chat::ChannelForbidden(c) => (SenderKey::Channel(c.id), c.title.as_str()),
            tl::enums::Chat::Empty(_) => continue,
        };
        let id = match key {
            SenderKey::User(id) | SenderKey::Chat(id) | SenderKey::Channel(id) => id,
        };
        names.insert(key, chat_display_name(title, id));
    }
    names
}

fn record(m: tl::types::Message, names: &HashMap<SenderKey, String>) -> Result<MessageRecord> {
    let date = DateTime::from_timestamp(i64::from(m.date), 0)
        .ok_or_else(|| Error::Transport(format!("message {} has an invalid date", m.id)))?;

    // Channel posts have no `from_id`; the channel itself is the author.
    let sender_peer = m.from_id.as_ref().unwrap_or(&m.peer_id);
    let sender = names
        .get(&SenderKey::from(sender_peer))
        .cloned()
        .or(m.post_author);

    let entities: Vec<TextEntity> = m
        .entities
        .unwrap_or_default()
        .into_iter()
        .filter_map(text_entity)
        .collect();
    let urls = extract_urls(&m.message, &entities);

    Ok(MessageRecord {
        id: MessageId(m.id),
        date,
        sender,
        text: m.message,
        urls,
        has_media: m.media.is_some(),
    })
}

fn text_entity(entity: tl::enums::MessageEntity) -> Option<TextEntity> {
    match entity {
        tl::enums::MessageEntity::Url(e) => Some(TextEntity::Url {
            offset: usize::try_from(e.offset).ok()?,
            length: usize::try_from(e.length).ok()?,
        }),
        tl::enums::MessageEntity::TextUrl(e) => Some(TextEntity::TextUrl { url: e.url }),
        _ => None,
    }
}
