//! Distance walked between two authoritative samples.

use coil_shared::constants::SPEED_HISTORY_BITS;
use coil_shared::SyncConfig;

/// Turns elapsed ticks plus boost flags into a travelled distance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OffsetWalker {
    slow: f64,
    fast: f64,
}

impl OffsetWalker {
    /// Uses the configured per-tick distances.
    #[must_use]
    pub const fn new(config: &SyncConfig) -> Self {
        Self {
            slow: config.slow_speed,
            fast: config.fast_speed,
        }
    }

    /// Distance covered over `elapsed_ticks`.
    ///
    /// Tick 0 (the most recent) uses `fast_now`, ticks 1..=7 read `history`
    /// bit `tick - 1`. Anything older defaults to slow.
    #[must_use]
    pub fn distance(&self, elapsed_ticks: u64, fast_now: bool, history: u8) -> f64 {
        if elapsed_ticks == 0 {
            return 0.0;
        }
        let covered = elapsed_ticks.min(u64::from(SPEED_HISTORY_BITS) + 1);
        let mask = (1u8 << (covered - 1)) - 1;
        let fast_ticks = u64::from(fast_now) + u64::from((history & mask).count_ones());
        let slow_ticks = elapsed_ticks - fast_ticks;
        fast_ticks as f64 * self.fast + slow_ticks as f64 * self.slow
    }
}
