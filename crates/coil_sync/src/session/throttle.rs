//! Trailing-edge throttle for outbound input.
//!
//! ```text
//! offers:   a   b  c        d
//! sends:    a ─────── c ─── d     (interval between sends, latest wins)
//! ```

use std::time::Duration;

use tokio::time::Instant;

/// Holds back values offered faster than `interval`, keeping only the newest.
#[derive(Debug)]
pub struct InputThrottle<T> {
    interval: Duration,
    last_sent: Option<Instant>,
    pending: Option<T>,
    superseded: u64,
}

impl<T> InputThrottle<T> {
    /// Creates a throttle with the given minimum spacing.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_sent: None,
            pending: None,
            superseded: 0,
        }
    }

    /// Offers a value. Returns it if it may be sent right away; otherwise it
    /// replaces any pending value.
    pub fn offer(&mut self, value: T, now: Instant) -> Option<T> {
        let ready = self
            .last_sent
            .map_or(true, |last| now.duration_since(last) >= self.interval);
        if ready && self.pending.is_none() {
            self.last_sent = Some(now);
            return Some(value);
        }
        if self.pending.replace(value).is_some() {
            self.superseded += 1;
        }
        None
    }

    /// Releases the pending value once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.deadline() {
            Some(deadline) if now >= deadline => {
                self.last_sent = Some(now);
                self.pending.take()
            }
            _ => None,
        }
    }

    /// When the pending value becomes sendable, if there is one.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref()?;
        Some(self.last_sent.map_or_else(Instant::now, |last| last + self.interval))
    }

    /// True if a value is waiting.
    #[must_use]
    pub const fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Values dropped because a newer one replaced them.
    #[must_use]
    pub const fn superseded(&self) -> u64 {
        self.superseded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(100);

    #[test]
    fn test_first_offer_goes_straight_out() {
        let mut throttle = InputThrottle::new(INTERVAL);
        assert_eq!(throttle.offer(1, Instant::now()), Some(1));
        assert!(throttle.deadline().is_none());
    }

    #[test]
    fn test_latest_value_wins() {
        let start = Instant::now();
        let mut throttle = InputThrottle::new(INTERVAL);
        assert_eq!(throttle.offer(1, start), Some(1));
        assert_eq!(throttle.offer(2, start + Duration::from_millis(10)), None);
        assert_eq!(throttle.offer(3, start + Duration::from_millis(20)), None);
        assert_eq!(throttle.superseded(), 1);

        assert_eq!(throttle.deadline(), Some(start + INTERVAL));
        assert_eq!(throttle.poll(start + Duration::from_millis(50)), None);
        assert_eq!(throttle.poll(start + INTERVAL), Some(3));
        assert!(!throttle.has_pending());
    }

    #[test]
    fn test_spacing_restarts_after_trailing_send() {
        let start = Instant::now();
        let mut throttle = InputThrottle::new(INTERVAL);
        throttle.offer(1, start);
        throttle.offer(2, start + Duration::from_millis(30));
        assert_eq!(throttle.poll(start + INTERVAL), Some(2));

        // Too soon after the trailing send
        assert_eq!(throttle.offer(3, start + Duration::from_millis(150)), None);
        assert_eq!(throttle.deadline(), Some(start + 2 * INTERVAL));
        // Idle long enough: immediate again
        assert_eq!(throttle.poll(start + 2 * INTERVAL), Some(3));
        assert_eq!(throttle.offer(4, start + Duration::from_millis(400)), Some(4));
    }
}
