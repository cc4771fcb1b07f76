use async_trait::async_trait;

use crate::{
    channel::ChannelRef,
    domain::{MessageId, MessageRecord, PeerRef, ResolvedChannel},
    Result,
};

/// Hexagonal port for reading channel history.
///
/// The Telegram adapter implements this over MTProto; tests use in-memory fakes.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Resolve a user-supplied reference to a channel the account can read.
    async fn resolve(&self, reference: &ChannelRef) -> Result<ResolvedChannel>;

    /// The next `limit` history entries with ids strictly greater than
    /// `after` (or from the very first message when `None`).
    ///
    /// Entries that carry no exportable message (service and deleted
    /// messages) still count against `limit` and still advance the cursor.
    async fn fetch_page(
        &self,
        peer: &PeerRef,
        after: Option<MessageId>,
        limit: u32,
    ) -> Result<HistoryPage>;
}

/// One page of history.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HistoryPage {
    /// Exportable messages of the page, ascending by id.
    pub records: Vec<MessageRecord>,
    /// Highest id of any entry in the page, including the ones that produced
    /// no record. `None` only when the page held no entries at all, which is
    /// the end of history.
    pub last_id: Option<MessageId>,
}

/// Outcome of submitting a login code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignInOutcome {
    SignedIn,
    PasswordRequired { hint: Option<String> },
}

/// Login steps of a user session. Implementations hold any protocol tokens
/// between calls.
#[async_trait]
pub trait AuthFlow: Send + Sync {
    async fn is_authorized(&self) -> Result<bool>;
    async fn request_login_code(&self, phone: &str) -> Result<()>;
    async fn sign_in(&self, code: &str) -> Result<SignInOutcome>;
    async fn check_password(&self, password: &str) -> Result<()>;
}

/// Synchronous interactive input (login code, 2FA password).
pub trait Prompter: Send + Sync {
    fn prompt(&self, message: &str) -> Result<String>;
}
