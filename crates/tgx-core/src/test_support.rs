//! In-memory fakes shared by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::{
    channel::ChannelRef,
    domain::{MessageId, MessageRecord, PeerKind, PeerRef, ResolvedChannel},
    errors::Error,
    ports::{HistoryPage, HistorySource},
    Result,
};

/// Message `id` posted at noon on 2024-01-`day`.
pub fn msg(id: i32, day: u32, text: &str) -> MessageRecord {
    MessageRecord {
        id: MessageId(id),
        date: Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap(),
        sender: Some("Alpha".to_string()),
        text: text.to_string(),
        urls: vec![],
        has_media: text.is_empty(),
    }
}

#[derive(Default)]
struct FakeState {
    pages_served: HashMap<i64, usize>,
    /// (only this peer id, or every peer; pages served before failing; error)
    fail_after: Option<(Option<i64>, usize, Error)>,
    ignore_cursor: bool,
    requests: Vec<Option<MessageId>>,
}

struct FakeChannel {
    channel: ResolvedChannel,
    messages: Vec<MessageRecord>,
    /// Ids of entries that produce no record (service messages).
    service: Vec<MessageId>,
}

#[derive(Default)]
pub struct FakeSource {
    channels: HashMap<String, FakeChannel>,
    inaccessible: Vec<String>,
    state: Mutex<FakeState>,
}

impl FakeSource {
    pub fn with_channel(username: &str, messages: Vec<MessageRecord>) -> Self {
        let mut s = Self::default();
        s.add_channel(username, None, messages);
        s
    }

    /// Register a channel; `title` defaults to the username.
    pub fn add_channel(
        &mut self,
        username: &str,
        title: Option<&str>,
        messages: Vec<MessageRecord>,
    ) {
        let id = 1000 + self.channels.len() as i64;
        let channel = ResolvedChannel {
            id,
            title: title.unwrap_or(username).to_string(),
            username: title.is_none().then(|| username.to_string()),
            peer: PeerRef {
                kind: PeerKind::Broadcast,
                id,
                access_hash: Some(id * 7),
            },
        };
        self.channels.insert(
            username.to_string(),
            FakeChannel {
                channel,
                messages,
                service: Vec::new(),
            },
        );
    }

    pub fn add_service_messages(&mut self, username: &str, ids: &[i32]) {
        let channel = self.channels.get_mut(username).unwrap();
        channel.service.extend(ids.iter().map(|id| MessageId(*id)));
    }

    pub fn mark_inaccessible(&mut self, username: &str) {
        self.inaccessible.push(username.to_string());
    }

    pub fn peer(&self, username: &str) -> PeerRef {
        self.channels[username].channel.peer
    }

    /// Every peer fails once `pages` pages have been served to it.
    pub fn fail_after_pages(&self, pages: usize, err: Error) {
        self.state.lock().unwrap().fail_after = Some((None, pages, err));
    }

    /// Only `username` fails once `pages` of its pages have been served.
    pub fn fail_channel_after_pages(&self, username: &str, pages: usize, err: Error) {
        let peer = self.peer(username);
        self.state.lock().unwrap().fail_after = Some((Some(peer.id), pages, err));
    }

    pub fn ignore_cursor(&self) {
        self.state.lock().unwrap().ignore_cursor = true;
    }

    pub fn requests(&self) -> Vec<Option<MessageId>> {
        self.state.lock().unwrap().requests.clone()
    }
}

fn clone_err(e: &Error) -> Error {
    match e {
        Error::FloodWait { seconds } => Error::FloodWait { seconds: *seconds },
        other => Error::Transport(other.to_string()),
    }
}

#[async_trait]
impl HistorySource for FakeSource {
    async fn resolve(&self, reference: &ChannelRef) -> Result<ResolvedChannel> {
        let ChannelRef::Username(name) = reference else {
            return Err(Error::ChannelNotFound(reference.to_string()));
        };
        if self.inaccessible.contains(name) {
            return Err(Error::ChannelNotAccessible(reference.to_string()));
        }
        self.channels
            .get(name)
            .map(|c| c.channel.clone())
            .ok_or_else(|| Error::ChannelNotFound(reference.to_string()))
    }

    async fn fetch_page(
        &self,
        peer: &PeerRef,
        after: Option<MessageId>,
        limit: u32,
    ) -> Result<HistoryPage> {
        let mut st = self.state.lock().unwrap();
        st.requests.push(after);
        let served = st.pages_served.get(&peer.id).copied().unwrap_or(0);
        if let Some((only, n, e)) = &st.fail_after {
            if (*only).map_or(true, |id| id == peer.id) && served >= *n {
                return Err(clone_err(e));
            }
        }
        st.pages_served.insert(peer.id, served + 1);

        let Some(fake) = self.channels.values().find(|c| c.channel.peer == *peer) else {
            return Err(Error::ChannelNotAccessible(format!("peer {}", peer.id)));
        };
        let after = if st.ignore_cursor { None } else { after };

        let mut entries: Vec<(MessageId, Option<&MessageRecord>)> = fake
            .messages
            .iter()
            .map(|m| (m.id, Some(m)))
            .chain(fake.service.iter().map(|id| (*id, None)))
            .filter(|(id, _)| after.map_or(true, |a| *id > a))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries.truncate(limit as usize);

        Ok(HistoryPage {
            last_id: entries.last().map(|(id, _)| *id),
            records: entries.iter().filter_map(|(_, m)| (*m).cloned()).collect(),
        })
    }
}
