use chrono::{DateTime, Utc};

use crate::domain::MessageRecord;

/// Why a record was or was not accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    BeforeRange,
    /// Past `to_date`; history is ascending so nothing later can match.
    AfterRange,
    NoText,
}

/// Date-range and content filter applied while streaming.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportFilter {
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub only_text: bool,
}

impl ExportFilter {
    pub fn check(&self, record: &MessageRecord) -> Verdict {
        if self.from_date.is_some_and(|from| record.date < from) {
            return Verdict::BeforeRange;
        }
        if self.to_date.is_some_and(|to| record.date > to) {
            return Verdict::AfterRange;
        }
        if self.only_text && !record.has_text() {
            return Verdict::NoText;
        }
        Verdict::Accept
    }
}
