//! UTC timestamps, available only after the clock has synchronized.

use std::thread;
use std::time::Duration;

use crate::prelude::*;

/// The wall clock reads as an epoch close to zero until the first successful
/// time-sync exchange. Anything above this is considered a real time.
const VALID_EPOCH: i64 = 100_000;

const SYNC_ATTEMPTS: usize = 20;
const SYNC_POLL_INTERVAL: Duration = Duration::from_millis(250);

const ISO_8601_SECONDS: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Raw wall-clock source. Read-only from the provider's perspective; the
/// actual synchronization exchange happens elsewhere.
pub trait ClockSource: Send {
    fn now(&self) -> DateTime<Utc>;
}

/// The process clock.
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hands out UTC timestamps once the underlying clock has synchronized.
///
/// Two states: unsynced (initial) and synced (terminal). The latch engages as
/// soon as any read observes a plausible epoch and never releases afterwards.
pub struct TimestampProvider {
    source: Box<dyn ClockSource>,
    synced: bool,
}

impl TimestampProvider {
    pub fn new(source: Box<dyn ClockSource>) -> Self {
        Self {
            source,
            synced: false,
        }
    }

    /// Wait for the initial synchronization, bounded. Timestamps are an
    /// enrichment, not a precondition: when the budget runs out the node
    /// proceeds without them.
    pub fn sync(&mut self) {
        for _ in 0..SYNC_ATTEMPTS {
            if self.check() {
                info!("clock synchronized");
                return;
            }
            thread::sleep(SYNC_POLL_INTERVAL);
        }
        warn!("clock sync incomplete, proceeding without timestamps");
    }

    /// The current UTC instant, or `None` while unsynced.
    pub fn now(&mut self) -> Option<DateTime<Utc>> {
        if self.check() {
            Some(self.source.now())
        } else {
            None
        }
    }

    /// The current instant formatted as whole-second UTC, e.g.
    /// `2024-01-01T00:00:00Z`.
    pub fn now_iso8601(&mut self) -> Option<String> {
        self.now().map(|now| now.format(ISO_8601_SECONDS).to_string())
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    fn check(&mut self) -> bool {
        if !self.synced && self.source.now().timestamp() > VALID_EPOCH {
            self.synced = true;
        }
        self.synced
    }
}
