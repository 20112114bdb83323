//! Empirical interarrival-time distribution and its CSV loader.
//!
//! # CSV format
//!
//! One row per table point, sorted by `x`:
//!
//! ```csv
//! x,cdf
//! 0.0,0.0
//! 2.5,0.4
//! 6.0,0.9
//! 12.0,1.0
//! ```
//!
//! Sampling is inverse-CDF: draw `u` in `[0, 1)`, find the table interval
//! whose cumulative probabilities bracket `u`, and interpolate `x` linearly
//! inside it.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::{CaError, CaResult, SimRng};

#[derive(Deserialize)]
struct CdfRecord {
    x:   f64,
    cdf: f64,
}

/// Piecewise-linear cumulative distribution loaded from a table.
#[derive(Clone, Debug, PartialEq)]
pub struct EmpiricalCdf {
    x:   Vec<f64>,
    cdf: Vec<f64>,
}

impl EmpiricalCdf {
    /// Build from `(x, cumulative probability)` points.
    ///
    /// # Errors
    ///
    /// `CaError::Distribution` if the table is empty, holds non-finite values,
    /// has a cumulative probability outside `[0, 1]`, or is not sorted.
    pub fn from_points(points: &[(f64, f64)]) -> CaResult<Self> {
        if points.is_empty() {
            return Err(CaError::Distribution("table has no rows".into()));
        }
        for (i, &(x, p)) in points.iter().enumerate() {
            if !x.is_finite() || !p.is_finite() {
                return Err(CaError::Distribution(format!("row {i}: non-finite value")));
            }
            if !(0.0..=1.0).contains(&p) {
                return Err(CaError::Distribution(format!(
                    "row {i}: cumulative probability {p} outside [0, 1]"
                )));
            }
        }
        for (i, pair) in points.windows(2).enumerate() {
            let ((x0, p0), (x1, p1)) = (pair[0], pair[1]);
            if x1 < x0 || p1 < p0 {
                return Err(CaError::Distribution(format!(
                    "rows {i} and {}: table must be non-decreasing in x and cdf",
                    i + 1
                )));
            }
        }
        Ok(Self {
            x:   points.iter().map(|&(x, _)| x).collect(),
            cdf: points.iter().map(|&(_, p)| p).collect(),
        })
    }

    /// Load a table from a CSV file with an `x,cdf` header.
    pub fn load_csv(path: &Path) -> CaResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Like [`load_csv`](Self::load_csv) but accepts any `Read` source.
    pub fn from_reader<R: Read>(reader: R) -> CaResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let points = csv_reader
            .deserialize::<CdfRecord>()
            .map(|row| row.map(|r| (r.x, r.cdf)))
            .collect::<Result<Vec<_>, csv::Error>>()?;
        Self::from_points(&points)
    }

    /// Number of table points.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Inverse CDF at `u`.
    ///
    /// `u` at or below the first cumulative probability yields the first `x`;
    /// at or above the last yields the last `x`.
    pub fn quantile(&self, u: f64) -> f64 {
        let last = self.x.len() - 1;
        if u <= self.cdf[0] {
            return self.x[0];
        }
        if u >= self.cdf[last] {
            return self.x[last];
        }
        // First index whose cdf exceeds u; the bracket is [hi - 1, hi].
        let hi = self.cdf.partition_point(|&p| p <= u);
        let lo = hi - 1;
        let span = self.cdf[hi] - self.cdf[lo];
        if span <= 0.0 {
            return self.x[lo];
        }
        self.x[lo] + (u - self.cdf[lo]) / span * (self.x[hi] - self.x[lo])
    }

    /// Draw one value from the distribution.
    pub fn sample(&self, rng: &mut SimRng) -> f64 {
        self.quantile(rng.uniform())
    }
}
