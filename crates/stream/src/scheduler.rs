//! Cooperative time-slicing between walker steps.

use std::time::{Duration, Instant};
use xssr_core::RenderOptions;

/// When a render should hand control back to its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YieldPolicy {
    frame_threshold: u32,
    time_threshold: Duration,
}

impl YieldPolicy {
    /// Creates a policy; a zero frame threshold is treated as one.
    pub fn new(frame_threshold: u32, time_threshold: Duration) -> Self {
        Self {
            frame_threshold: frame_threshold.max(1),
            time_threshold,
        }
    }

    /// Policy configured by `options`.
    pub fn from_options(options: &RenderOptions) -> Self {
        Self::new(
            options.yield_frame_threshold(),
            options.yield_time_threshold(),
        )
    }

    /// Yield once either threshold is reached, whichever comes first.
    pub fn should_yield(&self, frames_since_yield: u32, elapsed_since_yield: Duration) -> bool {
        frames_since_yield >= self.frame_threshold || elapsed_since_yield >= self.time_threshold
    }

    /// Frame threshold.
    pub fn frame_threshold(&self) -> u32 {
        self.frame_threshold
    }

    /// Time threshold.
    pub fn time_threshold(&self) -> Duration {
        self.time_threshold
    }
}

/// Tracks work since the last yield point of one session.
#[derive(Debug, Clone)]
pub struct Scheduler {
    policy: YieldPolicy,
    frames_since_yield: u32,
    last_yield: Instant,
    yields: u64,
}

impl Scheduler {
    /// Creates a scheduler starting its first slice now.
    pub fn new(policy: YieldPolicy) -> Self {
        Self {
            policy,
            frames_since_yield: 0,
            last_yield: Instant::now(),
            yields: 0,
        }
    }

    /// Starts a fresh slice, e.g. when the host resumes the render.
    pub fn reset(&mut self) {
        self.frames_since_yield = 0;
        self.last_yield = Instant::now();
    }

    /// Records one processed frame. Returns true if the render should yield now.
    pub fn tick(&mut self) -> bool {
        self.frames_since_yield = self.frames_since_yield.saturating_add(1);
        if self
            .policy
            .should_yield(self.frames_since_yield, self.last_yield.elapsed())
        {
            self.yields += 1;
            self.reset();
            true
        } else {
            false
        }
    }

    /// Frames processed in the current slice.
    pub fn frames_since_yield(&self) -> u32 {
        self.frames_since_yield
    }

    /// Yield points offered so far.
    pub fn yields(&self) -> u64 {
        self.yields
    }

    /// The policy in use.
    pub fn policy(&self) -> YieldPolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG: Duration = Duration::from_secs(3600);

    #[test]
    fn frame_threshold_triggers() {
        let policy = YieldPolicy::new(4, LONG);
        assert!(!policy.should_yield(3, Duration::ZERO));
        assert!(policy.should_yield(4, Duration::ZERO));
        assert!(policy.should_yield(9, Duration::ZERO));
    }

    #[test]
    fn time_threshold_triggers() {
        let policy = YieldPolicy::new(u32::MAX, Duration::from_millis(5));
        assert!(!policy.should_yield(1, Duration::from_millis(4)));
        assert!(policy.should_yield(1, Duration::from_millis(5)));
    }

    #[test]
    fn zero_frame_threshold_is_one() {
        let policy = YieldPolicy::new(0, LONG);
        assert_eq!(policy.frame_threshold(), 1);
        assert!(policy.should_yield(1, Duration::ZERO));
    }

    #[test]
    fn tick_yields_every_n_frames() {
        let mut scheduler = Scheduler::new(YieldPolicy::new(3, LONG));
        let pattern: Vec<bool> = (0..7).map(|_| scheduler.tick()).collect();
        assert_eq!(
            pattern,
            vec![false, false, true, false, false, true, false]
        );
        assert_eq!(scheduler.yields(), 2);
        assert_eq!(scheduler.frames_since_yield(), 1);
    }

    #[test]
    fn zero_time_threshold_yields_every_frame() {
        let mut scheduler = Scheduler::new(YieldPolicy::new(100, Duration::ZERO));
        assert!(scheduler.tick());
        assert!(scheduler.tick());
    }

    #[test]
    fn reset_starts_a_new_slice() {
        let mut scheduler = Scheduler::new(YieldPolicy::new(2, LONG));
        assert!(!scheduler.tick());
        scheduler.reset();
        assert!(!scheduler.tick());
        assert!(scheduler.tick());
    }

    #[test]
    fn reads_thresholds_from_options() {
        let options = RenderOptions {
            yield_frame_threshold: 16,
            yield_time_threshold_ms: 7,
            ..RenderOptions::default()
        };
        let policy = YieldPolicy::from_options(&options);
        assert_eq!(policy.frame_threshold(), 16);
        assert_eq!(policy.time_threshold(), Duration::from_millis(7));
    }
}
