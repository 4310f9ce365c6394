//! Step timing tracker.
//!
//! Two timestamps, scoped to one epoch:
//! - step start, used at step end for the intra-step duration
//! - step end, used at the next step start for the inter-step duration
//!
//! Calls alternate start, end, start, end within an epoch. `reset` clears both
//! slots so no inter-step duration ever spans an epoch boundary.

use std::time::Instant;

/// Time spent inside one step.
pub const INTRA_STEP_METRIC: &str = "batch_time/intra_step (ms)";

/// Time between the end of one step and the start of the next.
pub const INTER_STEP_METRIC: &str = "batch_time/inter_step (ms)";

#[derive(Debug, Clone)]
pub struct StepTimer {
    intra_enabled: bool,
    inter_enabled: bool,
    last_step_start: Option<Instant>,
    last_step_end: Option<Instant>,
}

impl StepTimer {
    pub fn new(intra_enabled: bool, inter_enabled: bool) -> Self {
        Self {
            intra_enabled,
            inter_enabled,
            last_step_start: None,
            last_step_end: None,
        }
    }

    pub fn reset(&mut self) {
        self.last_step_start = None;
        self.last_step_end = None;
    }

    /// Returns the inter-step duration in ms, if one can be measured.
    ///
    /// The first step of an epoch has no previous step end and yields `None`.
    pub fn on_step_start(&mut self, now: Instant) -> Option<f64> {
        let inter = if self.inter_enabled {
            self.last_step_end.map(|end| millis_between(end, now))
        } else {
            None
        };

        if self.intra_enabled {
            self.last_step_start = Some(now);
        }

        inter
    }

    /// Returns the intra-step duration in ms, if the step start was recorded.
    pub fn on_step_end(&mut self, now: Instant) -> Option<f64> {
        let intra = if self.intra_enabled {
            self.last_step_start.map(|start| millis_between(start, now))
        } else {
            None
        };

        if self.inter_enabled {
            self.last_step_end = Some(now);
        }

        intra
    }

    pub fn last_step_start(&self) -> Option<Instant> {
        self.last_step_start
    }

    pub fn last_step_end(&self) -> Option<Instant> {
        self.last_step_end
    }
}

fn millis_between(earlier: Instant, later: Instant) -> f64 {
    later.saturating_duration_since(earlier).as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_first_step_has_no_inter_step() {
        let mut timer = StepTimer::new(true, true);
        timer.reset();
        assert_eq!(timer.on_step_start(Instant::now()), None);
    }

    #[test]
    fn test_two_step_sequence() {
        let base = Instant::now();
        let mut timer = StepTimer::new(true, true);
        timer.reset();

        assert_eq!(timer.on_step_start(at(base, 0)), None);
        let intra_1 = timer.on_step_end(at(base, 120)).unwrap();
        let inter = timer.on_step_start(at(base, 150)).unwrap();
        let intra_2 = timer.on_step_end(at(base, 400)).unwrap();

        assert!(close(intra_1, 120.0));
        assert!(close(inter, 30.0));
        assert!(close(intra_2, 250.0));
    }

    #[test]
    fn test_reset_forgets_previous_epoch() {
        let base = Instant::now();
        let mut timer = StepTimer::new(true, true);
        timer.on_step_start(at(base, 0));
        timer.on_step_end(at(base, 10));

        timer.reset();
        assert!(timer.last_step_start().is_none());
        assert!(timer.last_step_end().is_none());
        assert_eq!(timer.on_step_start(at(base, 500)), None);
    }

    #[test]
    fn test_disabled_timings_record_nothing() {
        let base = Instant::now();
        let mut timer = StepTimer::new(false, false);
        for i in 0..3 {
            assert_eq!(timer.on_step_start(at(base, i * 100)), None);
            assert_eq!(timer.on_step_end(at(base, i * 100 + 50)), None);
        }
        assert!(timer.last_step_start().is_none());
        assert!(timer.last_step_end().is_none());
    }

    #[test]
    fn test_inter_only() {
        let base = Instant::now();
        let mut timer = StepTimer::new(false, true);
        timer.on_step_start(at(base, 0));
        assert_eq!(timer.on_step_end(at(base, 40)), None);
        let inter = timer.on_step_start(at(base, 45)).unwrap();
        assert!(close(inter, 5.0));
    }

    #[test]
    fn test_clock_going_backwards_saturates() {
        let base = Instant::now() + Duration::from_secs(1);
        let mut timer = StepTimer::new(true, false);
        timer.on_step_start(base);
        let intra = timer.on_step_end(base - Duration::from_millis(10)).unwrap();
        assert_eq!(intra, 0.0);
    }
}
