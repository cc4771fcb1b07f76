//! Lazy oldest-to-newest message stream over a [`HistorySource`].

use std::collections::VecDeque;

use tracing::debug;

use crate::{
    domain::{MessageId, MessageRecord, PeerRef},
    filter::{ExportFilter, Verdict},
    ports::HistorySource,
    Result,
};

/// Per-stream skip counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Records received from the source, before filtering.
    pub fetched: u64,
    pub pages: u64,
    pub skipped_no_text: u64,
    /// Subset of `skipped_no_text` that carried media.
    pub skipped_media_only: u64,
    pub skipped_out_of_range: u64,
}

/// Pages through a channel's history and yields accepted records once each.
///
/// Not restartable: a new stream re-issues the requests from its start point.
pub struct HistoryStream<'a> {
    source: &'a dyn HistorySource,
    peer: PeerRef,
    filter: ExportFilter,
    page_size: u32,
    cursor: Option<MessageId>,
    buffer: VecDeque<MessageRecord>,
    done: bool,
    stats: StreamStats,
}

impl<'a> HistoryStream<'a> {
    /// Start after `after` (exclusive), or at the first message when `None`.
    pub fn new(
        source: &'a dyn HistorySource,
        peer: PeerRef,
        filter: ExportFilter,
        page_size: u32,
        after: Option<MessageId>,
    ) -> Self {
        Self {
            source,
            peer,
            filter,
            page_size: page_size.max(1),
            cursor: after,
            buffer: VecDeque::new(),
            done: false,
            stats: StreamStats::default(),
        }
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    /// Next accepted record, `Ok(None)` at end of history (or past `to_date`).
    ///
    /// A transport error is returned as-is and leaves the stream finished.
    pub async fn next(&mut self) -> Result<Option<MessageRecord>> {
        loop {
            if self.done {
                return Ok(None);
            }

            let Some(record) = self.buffer.pop_front() else {
                if let Err(e) = self.fill().await {
                    self.done = true;
                    return Err(e);
                }
                continue;
            };

            match self.filter.check(&record) {
                Verdict::Accept => return Ok(Some(record)),
                Verdict::BeforeRange => self.stats.skipped_out_of_range += 1,
                Verdict::NoText => {
                    self.stats.skipped_no_text += 1;
                    if record.has_media {
                        self.stats.skipped_media_only += 1;
                    }
                }
                Verdict::AfterRange => {
                    debug!(id = record.id.0, "reached end of date range");
                    self.stats.skipped_out_of_range += 1;
                    self.done = true;
                    self.buffer.clear();
                }
            }
        }
    }

    async fn fill(&mut self) -> Result<()> {
        let page = self
            .source
            .fetch_page(&self.peer, self.cursor, self.page_size)
            .await?;
        self.stats.pages += 1;

        // Only a page without any entries ends the history; a page of service
        // messages yields no records but still moves the cursor.
        let Some(page_last) = page.last_id else {
            self.done = true;
            return Ok(());
        };
        if self.cursor.is_some_and(|c| page_last <= c) {
            debug!(cursor = ?self.cursor, page_last = page_last.0, "cursor did not advance");
            self.done = true;
            return Ok(());
        }

        let mut high = self.cursor;
        let before = self.buffer.len();
        for record in page.records {
            // Sources promise ascending ids past the cursor; enforce it so the
            // output order can never regress.
            if high.is_some_and(|h| record.id <= h) {
                continue;
            }
            high = Some(record.id);
            self.buffer.push_back(record);
        }
        self.cursor = high.max(Some(page_last));

        let added = self.buffer.len() - before;
        self.stats.fetched += added as u64;
        debug!(page = self.stats.pages, added, cursor = page_last.0, "fetched history page");
        Ok(())
    }
}
