//! Telegram adapter (grammers).
//!
//! This crate implements the `tgx-core` history and auth ports over MTProto
//! with a user account session.

use async_trait::async_trait;

use grammers_client::{Client, InvocationError};
use grammers_session::{PackedChat, PackedType};
use grammers_tl_types as tl;

mod convert;
mod resolve;
pub mod session;

pub use session::{connect, GrammersAuth};

use tgx_core::{
    channel::ChannelRef,
    config::MAX_PAGE_SIZE,
    domain::{MessageId, PeerKind, PeerRef, ResolvedChannel},
    errors::Error,
    ports::{HistoryPage, HistorySource},
    Result,
};

/// [`HistorySource`] backed by a connected grammers client.
#[derive(Clone)]
pub struct TelegramSource {
    client: Client,
}

impl TelegramSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HistorySource for TelegramSource {
    async fn resolve(&self, reference: &ChannelRef) -> Result<ResolvedChannel> {
        match reference {
            ChannelRef::Username(name) => resolve::by_username(&self.client, name).await,
            ChannelRef::Invite(hash) => resolve::by_invite(&self.client, hash).await,
            ChannelRef::Id(id) => resolve::by_dialog_id(&self.client, *id).await,
        }
    }

    async fn fetch_page(
        &self,
        peer: &PeerRef,
        after: Option<MessageId>,
        limit: u32,
    ) -> Result<HistoryPage> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE) as i32;
        let request = tl::functions::messages::GetHistory {
            peer: packed(peer).to_input_peer(),
            // Anchor is inclusive; a negative offset walks towards newer ids.
            offset_id: after.map_or(1, |id| id.0 + 1),
            offset_date: 0,
            add_offset: -limit,
            limit,
            max_id: 0,
            min_id: after.map_or(0, |id| id.0),
            hash: 0,
        };
        let response = self
            .client
            .invoke(&request)
            .await
            .map_err(|e| map_err(e, &format!("history of {}", peer.id)))?;

        let mut page = convert::history_page(response)?;
        page.records.retain(|r| after.map_or(true, |a| r.id > a));
        Ok(page)
    }
}

pub(crate) fn packed(peer: &PeerRef) -> PackedChat {
    let ty = match peer.kind {
        PeerKind::User => PackedType::User,
        PeerKind::Bot => PackedType::Bot,
        PeerKind::Chat => PackedType::Chat,
        PeerKind::Megagroup => PackedType::Megagroup,
        PeerKind::Broadcast => PackedType::Broadcast,
        PeerKind::Gigagroup => PackedType::Gigagroup,
    };
    PackedChat {
        ty,
        id: peer.id,
        access_hash: peer.access_hash,
    }
}

pub(crate) fn peer_ref(chat: &PackedChat) -> PeerRef {
    let kind = match chat.ty {
        PackedType::User => PeerKind::User,
        PackedType::Bot => PeerKind::Bot,
        PackedType::Chat => PeerKind::Chat,
        PackedType::Megagroup => PeerKind::Megagroup,
        PackedType::Broadcast => PeerKind::Broadcast,
        PackedType::Gigagroup => PeerKind::Gigagroup,
    };
    PeerRef {
        kind,
        id: chat.id,
        access_hash: chat.access_hash,
    }
}

pub(crate) fn map_err(e: InvocationError, context: &str) -> Error {
    match &e {
        InvocationError::Rpc(rpc) => classify_rpc(&rpc.name, rpc.value, &format!("{context}: {e}")),
        _ => Error::Transport(format!("{context}: {e}")),
    }
}

/// Map an RPC error name (with the `_X` suffix already split into `value`).
fn classify_rpc(name: &str, value: Option<u32>, detail: &str) -> Error {
    match name {
        "FLOOD_WAIT" | "FLOOD_PREMIUM_WAIT" | "SLOWMODE_WAIT" => Error::FloodWait {
            seconds: value.unwrap_or(0),
        },
        "USERNAME_NOT_OCCUPIED" | "USERNAME_INVALID" | "INVITE_HASH_EXPIRED"
        | "INVITE_HASH_INVALID" | "INVITE_HASH_EMPTY" | "PEER_ID_INVALID" => {
            Error::ChannelNotFound(detail.to_string())
        }
        "CHANNEL_PRIVATE" | "CHANNEL_INVALID" | "CHAT_ADMIN_REQUIRED" | "CHAT_FORBIDDEN"
        | "USER_BANNED_IN_CHANNEL" | "CHANNEL_PUBLIC_GROUP_NA" => {
            Error::ChannelNotAccessible(detail.to_string())
        }
        "AUTH_KEY_UNREGISTERED" | "AUTH_KEY_INVALID" | "SESSION_REVOKED" | "SESSION_EXPIRED"
        | "USER_DEACTIVATED" | "USER_DEACTIVATED_BAN" => Error::Auth(detail.to_string()),
        _ => Error::Transport(detail.to_string()),
    }
}
