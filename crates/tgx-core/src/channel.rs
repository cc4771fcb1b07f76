//! Channel references as written by the user, and output file naming.

use std::{fmt, path::Path, path::PathBuf};

use crate::{domain::ResolvedChannel, errors::Error, Result};

/// Prefix Telegram clients put in front of channel/supergroup ids (`-100…`).
const CHANNEL_ID_PREFIX: i64 = 1_000_000_000_000;

const LINK_HOSTS: [&str; 3] = ["t.me/", "telegram.me/", "telegram.dog/"];

/// A parsed channel reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChannelRef {
    /// Public username, without the leading `@`.
    Username(String),
    /// Invite hash from a `joinchat/` or `+` link.
    Invite(String),
    /// Bare (unprefixed) peer id.
    Id(i64),
}

impl ChannelRef {
    /// Parse a username, `t.me` link, invite link, or numeric id.
    pub fn parse(raw: &str) -> Result<Self> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(Error::ChannelNotFound("empty channel reference".to_string()));
        }

        if let Ok(n) = s.parse::<i64>() {
            return Ok(Self::Id(strip_channel_prefix(n)));
        }

        if let Some(path) = link_path(s) {
            return parse_link_path(path).ok_or_else(|| {
                Error::ChannelNotFound(format!("unrecognized channel link {s:?}"))
            });
        }

        let name = s.strip_prefix('@').unwrap_or(s);
        if is_valid_username(name) {
            Ok(Self::Username(name.to_string()))
        } else {
            Err(Error::ChannelNotFound(format!(
                "{s:?} is not a valid username, link, or id"
            )))
        }
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelRef::Username(u) => write!(f, "@{u}"),
            ChannelRef::Invite(h) => write!(f, "https://t.me/+{h}"),
            ChannelRef::Id(id) => write!(f, "{id}"),
        }
    }
}

/// `-1002481698957` → `2481698957`; plain ids pass through.
fn strip_channel_prefix(n: i64) -> i64 {
    if n < 0 {
        let abs = n.unsigned_abs() as i64;
        if abs > CHANNEL_ID_PREFIX {
            abs - CHANNEL_ID_PREFIX
        } else {
            abs
        }
    } else {
        n
    }
}

/// Returns the path part after the host for `t.me`-style links.
fn link_path(s: &str) -> Option<&str> {
    let rest = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"))
        .unwrap_or(s);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    LINK_HOSTS.iter().find_map(|host| rest.strip_prefix(host))
}

fn parse_link_path(path: &str) -> Option<ChannelRef> {
    let path = path.split(&['?', '#'][..]).next().unwrap_or_default();
    let mut segments = path.split('/').filter(|p| !p.is_empty());
    let first = segments.next()?;

    if let Some(hash) = first.strip_prefix('+') {
        return (!hash.is_empty()).then(|| ChannelRef::Invite(hash.to_string()));
    }
    match first {
        "joinchat" => segments.next().map(|h| ChannelRef::Invite(h.to_string())),
        // Web preview (`t.me/s/name`) and private message links (`t.me/c/<id>/<msg>`).
        "s" => segments
            .next()
            .filter(|n| is_valid_username(n))
            .map(|n| ChannelRef::Username(n.to_string())),
        "c" => segments
            .next()
            .and_then(|id| id.parse::<i64>().ok())
            .map(ChannelRef::Id),
        name if is_valid_username(name) => Some(ChannelRef::Username(name.to_string())),
        _ => None,
    }
}

fn is_valid_username(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Filesystem-safe slug of a display title.
///
/// ASCII only: letters are lowercased, every run of other characters becomes a
/// single `_`, and leading/trailing separators are dropped. May be empty.
pub fn slugify(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_sep = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Base file name (without extension) for a resolved channel.
pub fn file_stem(channel: &ResolvedChannel) -> String {
    if let Some(username) = channel.username.as_deref().filter(|u| !u.is_empty()) {
        return username.to_string();
    }
    let slug = slugify(&channel.title);
    if slug.is_empty() {
        format!("channel_{}", channel.id)
    } else {
        slug
    }
}

pub fn output_path(output_dir: &Path, channel: &ResolvedChannel) -> PathBuf {
    output_dir.join(format!("{}.md", file_stem(channel)))
}
