//! Running sample statistic (travel time on the road).
//!
//! Uses Welford's update so samples are not retained, and Chan's pairwise
//! combination so per-rank statistics can be merged at the end of a
//! distributed run.

/// Count, mean and Bessel-corrected variance of a stream of samples.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Statistic {
    count: u64,
    mean:  f64,
    /// Sum of squared deviations from the running mean.
    m2:    f64,
}

impl Statistic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// Fold `other` into `self` as if its samples had been added here.
    pub fn merge(&mut self, other: &Statistic) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }
        let n_a = self.count as f64;
        let n_b = other.count as f64;
        let n = n_a + n_b;
        let delta = other.mean - self.mean;
        self.mean += delta * n_b / n;
        self.m2 += other.m2 + delta * delta * n_a * n_b / n;
        self.count += other.count;
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// `None` until at least one sample has been added.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// Sample variance with an `N - 1` denominator; `None` below two samples.
    pub fn variance(&self) -> Option<f64> {
        (self.count > 1).then(|| self.m2 / (self.count - 1) as f64)
    }

    pub fn std_dev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }
}
