//! End-of-run summary.

use std::fmt;
use std::time::Duration;

use ca_core::{Statistic, Strategy};

/// What a finished run reports: wall-clock cost and the travel-time
/// statistic.
///
/// In a sharded run only rank 0's report covers the whole road; the other
/// ranks' `travel_time` holds their local samples.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub strategy:    Strategy,
    /// Worker threads (shared memory) or ranks (distributed).
    pub parallelism: usize,
    pub steps:       u64,
    pub elapsed:     Duration,
    /// Travel time in simulated seconds of every vehicle that left the road
    /// after the warm-up period.
    pub travel_time: Statistic,
}

impl RunReport {
    /// Steps per wall-clock second.
    pub fn iterations_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 { self.steps as f64 / secs } else { 0.0 }
    }

    /// Wall-clock seconds per step.
    pub fn secs_per_iteration(&self) -> f64 {
        if self.steps > 0 { self.elapsed.as_secs_f64() / self.steps as f64 } else { 0.0 }
    }
}

fn or_na(v: Option<f64>) -> String {
    v.map_or_else(|| "n/a".to_string(), |x| format!("{x:.3}"))
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} steps ({}, parallelism {}) in {:.3} s, {:.3e} s/step, {:.1} it/s",
            self.steps,
            self.strategy,
            self.parallelism,
            self.elapsed.as_secs_f64(),
            self.secs_per_iteration(),
            self.iterations_per_sec(),
        )?;
        write!(
            f,
            "travel time: mean {} s, std dev {} s, n = {}",
            or_na(self.travel_time.mean()),
            or_na(self.travel_time.std_dev()),
            self.travel_time.count(),
        )
    }
}
