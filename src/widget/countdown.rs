//! Retry countdowns for rate-limited messages.
//!
//! Each rate-limited error message gets its own task ticking once per
//! second. Countdowns are independent of each other and of new submissions.
//! A countdown whose message is cleared is aborted along with it.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, interval_at};
use tracing::{debug, info};

use super::ChatWidget;
use crate::conversation::{MessageId, Tick};

/// Countdown resolution.
pub const TICK: Duration = Duration::from_secs(1);

impl ChatWidget {
    /// Spawn the ticking task for `id`. Must be called inside a tokio runtime.
    pub(super) fn start_countdown(&self, id: MessageId) {
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + TICK, TICK);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if !(ChatWidget { inner }).tick_countdown(id) {
                    break;
                }
            }
        });
        debug!(name: "countdown.started", message_id = %id, "Retry countdown started");
        self.timers().insert(id, handle);
    }

    /// Advance one countdown. Returns whether it should keep ticking.
    fn tick_countdown(&self, id: MessageId) -> bool {
        let tick = self.log_mut().tick(id);
        match tick {
            Tick::Remaining(secs) => {
                self.sync();
                debug!(name: "countdown.tick", message_id = %id, remaining = secs, "Countdown tick");
                true
            }
            Tick::Elapsed => {
                self.timers().remove(&id);
                self.sync();
                info!(name: "countdown.elapsed", message_id = %id, "Retry countdown finished");
                false
            }
            Tick::Missing => {
                self.timers().remove(&id);
                false
            }
        }
    }

    /// Abort the countdown tasks of removed messages.
    pub(super) fn cancel_countdowns(&self, removed: &[MessageId]) {
        let mut timers = self.timers();
        for id in removed {
            if let Some(handle) = timers.remove(id) {
                handle.abort();
                debug!(name: "countdown.cancelled", message_id = %id, "Retry countdown cancelled");
            }
        }
    }

    /// Number of countdown tasks still running.
    #[must_use]
    pub fn active_countdowns(&self) -> usize {
        self.timers().len()
    }
}
