use std::path::PathBuf;

/// Core error type for the exporter.
///
/// Adapter crates map their library errors into this type so the run loop can
/// decide between aborting the whole run and skipping a single channel.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error("channel not accessible: {0}")]
    ChannelNotAccessible(String),

    #[error("rate limited by Telegram, retry in {seconds}s")]
    FloodWait { seconds: u32 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    /// Configuration and authentication failures end the run; everything else
    /// is scoped to a single channel job.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Auth(_))
    }

    /// Short label used in per-job failure logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::Auth(_) => "auth",
            Error::ChannelNotFound(_) | Error::ChannelNotAccessible(_) => "resolution",
            Error::FloodWait { .. } | Error::Transport(_) => "transport",
            Error::Io(_) | Error::Write { .. } => "write",
            Error::External(_) => "external",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_config_and_auth_are_fatal() {
        assert!(Error::Config("x".into()).is_fatal());
        assert!(Error::Auth("x".into()).is_fatal());
        assert!(!Error::ChannelNotFound("x".into()).is_fatal());
        assert!(!Error::FloodWait { seconds: 3 }.is_fatal());
        assert!(!Error::Transport("x".into()).is_fatal());
    }

    #[test]
    fn resolution_errors_share_a_kind() {
        assert_eq!(Error::ChannelNotFound("a".into()).kind(), "resolution");
        assert_eq!(Error::ChannelNotAccessible("a".into()).kind(), "resolution");
    }
}
