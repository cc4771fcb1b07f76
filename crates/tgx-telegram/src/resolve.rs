//! Channel reference resolution: public usernames, invite links and numeric
//! ids from the account's dialog list.

use grammers_client::{types::Chat, Client};
use grammers_tl_types as tl;
use tracing::debug;

use tgx_core::{
    domain::{PeerKind, PeerRef, ResolvedChannel},
    errors::Error,
    Result,
};

use crate::{map_err, peer_ref};

pub(crate) async fn by_username(client: &Client, name: &str) -> Result<ResolvedChannel> {
    let chat = client
        .resolve_username(name)
        .await
        .map_err(|e| map_err(e, &format!("@{name}")))?
        .ok_or_else(|| Error::ChannelNotFound(format!("@{name}")))?;
    from_chat(&chat, &format!("@{name}"))
}

pub(crate) async fn by_invite(client: &Client, hash: &str) -> Result<ResolvedChannel> {
    let context = format!("invite link +{hash}");
    let invite = client
        .invoke(&tl::functions::messages::CheckChatInvite {
            hash: hash.to_string(),
        })
        .await
        .map_err(|e| map_err(e, &context))?;

    match invite {
        tl::enums::ChatInvite::Already(tl::types::ChatInviteAlready { chat }) => {
            from_raw(chat, &context)
        }
        tl::enums::ChatInvite::Peek(tl::types::ChatInvitePeek { chat, .. }) => {
            from_raw(chat, &context)
        }
        _ => Err(Error::ChannelNotAccessible(format!(
            "{context}: the account has not joined this channel"
        ))),
    }
}

/// Numeric ids carry no access hash, so the channel must already be one of
/// the account's dialogs.
pub(crate) async fn by_dialog_id(client: &Client, id: i64) -> Result<ResolvedChannel> {
    let context = format!("channel id {id}");
    let mut dialogs = client.iter_dialogs();
    let mut scanned = 0usize;
    while let Some(dialog) = dialogs.next().await.map_err(|e| map_err(e, &context))? {
        scanned += 1;
        let chat = dialog.chat();
        if chat.id() == id {
            return from_chat(chat, &context);
        }
    }
    debug!(id, scanned, "id not present in dialogs");
    Err(Error::ChannelNotFound(format!(
        "{context}: not among the account's {scanned} dialogs"
    )))
}

fn from_chat(chat: &Chat, context: &str) -> Result<ResolvedChannel> {
    let packed = chat.pack();
    debug!(context, id = chat.id(), "resolved");
    Ok(ResolvedChannel {
        id: chat.id(),
        title: chat.name().to_string(),
        username: chat.username().map(str::to_string),
        peer: peer_ref(&packed),
    })
}

fn from_raw(chat: tl::enums::Chat, context: &str) -> Result<ResolvedChannel> {
    match chat {
        tl::enums::Chat::Channel(c) => Ok(ResolvedChannel {
            id: c.id,
            title: c.title,
            username: c.username,
            peer: PeerRef {
                kind: channel_kind(c.broadcast, c.gigagroup),
                id: c.id,
                access_hash: c.access_hash,
            },
        }),
        tl::enums::Chat::Chat(c) => Ok(ResolvedChannel {
            id: c.id,
            title: c.title,
            username: None,
            peer: PeerRef {
                kind: PeerKind::Chat,
                id: c.id,
                access_hash: None,
            },
        }),
        _ => Err(Error::ChannelNotAccessible(format!(
            "{context}: channel is forbidden or deleted"
        ))),
    }
}

fn channel_kind(broadcast: bool, gigagroup: bool) -> PeerKind {
    if broadcast {
        PeerKind::Broadcast
    } else if gigagroup {
        PeerKind::Gigagroup
    } else {
        PeerKind::Megagroup
    }
}
