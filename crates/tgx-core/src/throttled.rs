use std::{sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    channel::ChannelRef,
    domain::{MessageId, PeerRef, ResolvedChannel},
    ports::{HistoryPage, HistorySource},
    Result,
};

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// HistorySource decorator that spaces out outbound requests.
///
/// Flood waits are still handled by the transport; this only keeps long
/// exports from bursting page requests back to back.
pub struct ThrottledSource {
    inner: Arc<dyn HistorySource>,
    limiter: Mutex<IntervalLimiter>,
}

impl ThrottledSource {
    pub fn new(inner: Arc<dyn HistorySource>, min_interval: Duration) -> Self {
        Self {
            inner,
            limiter: Mutex::new(IntervalLimiter::new(min_interval)),
        }
    }

    async fn throttle(&self) {
        let wait = { self.limiter.lock().await.reserve() };
        if wait > Duration::from_millis(0) {
            sleep(wait).await;
        }
    }
}

#[async_trait::async_trait]
impl HistorySource for ThrottledSource {
    async fn resolve(&self, reference: &ChannelRef) -> Result<ResolvedChannel> {
        self.throttle().await;
        self.inner.resolve(reference).await
    }

    async fn fetch_page(
        &self,
        peer: &PeerRef,
        after: Option<MessageId>,
        limit: u32,
    ) -> Result<HistoryPage> {
        self.throttle().await;
        self.inner.fetch_page(peer, after, limit).await
    }
}
