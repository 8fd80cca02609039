//! Loop timers.
//!
//! The bridge runs a single hot loop.  Periodic work is gated by
//! free-running intervals that share one monotonic clock:
//!
//! ```text
//!  now ──┬──▶ reconnect (30 s) ──▶ ResendCounter (every 20th connected fire)
//!        ├──▶ wakeup    (50 s)
//!        └──▶ status    (10 s)
//! ```
//!
//! An interval fires once `now - last_fired` is strictly greater than its
//! period and then restarts from `now`, so a late tick pushes the next fire
//! back rather than bunching fires together.  The intervals are not
//! phase-locked to each other.

use crate::config::TimingConfig;

// ═══════════════════════════════════════════════════════════════
//  Interval
// ═══════════════════════════════════════════════════════════════

/// One free-running periodic timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    period_ms: u64,
    last_fired_ms: u64,
}

impl Interval {
    /// A timer whose first fire comes one period after boot.
    pub const fn new(period_ms: u64) -> Self {
        Self {
            period_ms,
            last_fired_ms: 0,
        }
    }

    /// Returns `true` and restarts if the period has elapsed at `now_ms`.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        if now_ms.saturating_sub(self.last_fired_ms) > self.period_ms {
            self.last_fired_ms = now_ms;
            true
        } else {
            false
        }
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    pub fn last_fired_ms(&self) -> u64 {
        self.last_fired_ms
    }
}

// ═══════════════════════════════════════════════════════════════
//  Resend counter
// ═══════════════════════════════════════════════════════════════

/// Counts reconnect-timer fires while the link is up and signals every
/// `every`th one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResendCounter {
    every: u32,
    count: u32,
}

impl ResendCounter {
    pub const fn new(every: u32) -> Self {
        Self { every, count: 0 }
    }

    /// Record one fire.  Returns `true` on every `every`th call.
    pub fn tick(&mut self) -> bool {
        if self.count + 1 >= self.every {
            self.count = 0;
            true
        } else {
            self.count += 1;
            false
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

// ═══════════════════════════════════════════════════════════════
//  Timer set
// ═══════════════════════════════════════════════════════════════

/// Identifies which loop timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerId {
    Reconnect,
    Wakeup,
    Status,
}

/// The bridge's loop timers.
#[derive(Debug, Clone)]
pub struct TimerSet {
    pub reconnect: Interval,
    pub wakeup: Interval,
    pub status: Interval,
    pub resend: ResendCounter,
}

impl TimerSet {
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            reconnect: Interval::new(timing.reconnect_interval_ms),
            wakeup: Interval::new(timing.wakeup_interval_ms),
            status: Interval::new(timing.status_interval_ms),
            resend: ResendCounter::new(timing.config_resend_every),
        }
    }

    /// Poll every interval at `now_ms`.  Fired timers are returned in loop
    /// order: reconnect, wakeup, status.
    pub fn poll(&mut self, now_ms: u64) -> heapless::Vec<TimerId, 3> {
        let mut fired = heapless::Vec::new();
        let timers = [
            (TimerId::Reconnect, &mut self.reconnect),
            (TimerId::Wakeup, &mut self.wakeup),
            (TimerId::Status, &mut self.status),
        ];
        for (id, timer) in timers {
            if timer.poll(now_ms) {
                // At most three ids into a capacity-three vec.
                let _ = fired.push(id);
            }
        }
        fired
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_is_strictly_greater() {
        let mut t = Interval::new(10_000);
        assert!(!t.poll(10_000));
        assert!(t.poll(10_001));
        assert_eq!(t.last_fired_ms(), 10_001);
    }

    #[test]
    fn interval_restarts_from_fire_time() {
        let mut t = Interval::new(10_000);
        assert!(t.poll(25_000));
        assert!(!t.poll(35_000));
        assert!(t.poll(35_001));
    }

    #[test]
    fn late_poll_fires_once() {
        let mut t = Interval::new(1_000);
        assert!(t.poll(10_000));
        assert!(!t.poll(10_001));
    }

    #[test]
    fn resend_counter_fires_on_twentieth() {
        let mut c = ResendCounter::new(20);
        let fires: Vec<usize> = (1..=60).filter(|_| c.tick()).collect();
        assert_eq!(fires, vec![20, 40, 60]);
    }

    #[test]
    fn resend_every_one_always_fires() {
        let mut c = ResendCounter::new(1);
        assert!(c.tick());
        assert!(c.tick());
    }

    #[test]
    fn timer_set_reports_in_loop_order() {
        let mut set = TimerSet::new(&TimingConfig::default());
        assert!(set.poll(5_000).is_empty());
        assert_eq!(set.poll(10_001).as_slice(), &[TimerId::Status]);
        assert_eq!(
            set.poll(50_001).as_slice(),
            &[TimerId::Reconnect, TimerId::Wakeup, TimerId::Status]
        );
    }

    #[test]
    fn timers_are_independent() {
        let mut set = TimerSet::new(&TimingConfig::default());
        set.poll(30_001);
        assert_eq!(set.reconnect.last_fired_ms(), 30_001);
        assert_eq!(set.wakeup.last_fired_ms(), 0);
        assert_eq!(set.status.last_fired_ms(), 30_001);
    }
}
