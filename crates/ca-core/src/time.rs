//! Simulation time model.
//!
//! Time advances in whole CA steps.  The mapping to simulated seconds is held
//! in `StepClock`:
//!
//!   simulated_secs = step * step_secs
//!
//! Every comparison the driver makes (end of run, warm-up threshold) is on the
//! integer step counter, so there is no floating-point drift in control flow.

use std::fmt;

// ── Tick ─────────────────────────────────────────────────────────────────────

/// An absolute step counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);
}

impl std::ops::Sub for Tick {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: Tick) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── StepClock ────────────────────────────────────────────────────────────────

/// Tracks the current step and converts step counts to simulated seconds.
#[derive(Clone, Debug)]
pub struct StepClock {
    /// Simulated seconds represented by one step.
    pub step_secs: f64,
    /// The current step, advanced by `StepClock::advance()` once per step.
    pub current_tick: Tick,
}

impl StepClock {
    pub fn new(step_secs: f64) -> Self {
        Self {
            step_secs,
            current_tick: Tick::ZERO,
        }
    }

    #[inline]
    pub fn advance(&mut self) {
        self.current_tick = Tick(self.current_tick.0 + 1);
    }

    /// Elapsed simulated seconds since step 0.
    #[inline]
    pub fn elapsed_secs(&self) -> f64 {
        self.secs_for_steps(self.current_tick.0)
    }

    #[inline]
    pub fn secs_for_steps(&self, steps: u64) -> f64 {
        steps as f64 * self.step_secs
    }

    /// Whole steps covered by `secs` simulated seconds (rounds down).
    ///
    /// Used for spawn countdowns: an interarrival of 5.0 s at 0.5 s/step is
    /// 10 steps.
    #[inline]
    pub fn steps_for_secs(&self, secs: f64) -> u64 {
        if secs <= 0.0 || !secs.is_finite() {
            return 0;
        }
        (secs / self.step_secs).floor() as u64
    }
}

impl fmt::Display for StepClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.1} s)", self.current_tick, self.elapsed_secs())
    }
}
