//! Bounded price windows and incrementally maintained pair statistics.
//!
//! `RollingPair` keeps running sums of a, b, a², b² and ab over the last
//! `capacity` observations, so hedge ratio, spread mean and spread deviation
//! cost O(1) per bar. Sums are kept on values shifted by a reference point
//! and recomputed exactly every `resync_every` pushes to bound drift.

use super::regression;
use std::collections::VecDeque;

/// Relative variance below which a window is treated as degenerate.
pub const DEGENERATE_REL_VARIANCE: f64 = 1e-12;

/// Bounded, append-only history of closes for one symbol.
#[derive(Debug, Clone)]
pub struct PriceHistory {
    capacity: usize,
    values: VecDeque<f64>,
}

impl PriceHistory {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "history capacity must be >= 1");
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity + 1),
        }
    }

    /// Append a close. Returns the evicted oldest value once the window is full.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        self.values.push_back(value);
        if self.values.len() > self.capacity {
            self.values.pop_front()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last(&self) -> Option<f64> {
        self.values.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }
}

/// Window statistics for a pair, A regressed on B.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairStats {
    pub beta: f64,
    pub mean_a: f64,
    pub mean_b: f64,
    pub var_a: f64,
    pub var_b: f64,
    pub cov_ab: f64,
    /// Mean of `a - beta * b` over the window.
    pub spread_mean: f64,
    /// Population standard deviation of `a - beta * b` over the window.
    pub spread_std: f64,
}

impl PairStats {
    /// Build from population moments. `beta` is `cov / var_b` (0 when B is flat).
    pub fn from_moments(mean_a: f64, mean_b: f64, var_a: f64, var_b: f64, cov_ab: f64) -> Self {
        let var_a = var_a.max(0.0);
        let var_b = var_b.max(0.0);
        let beta = if var_b > 0.0 { cov_ab / var_b } else { 0.0 };
        let spread_var = (var_a - 2.0 * beta * cov_ab + beta * beta * var_b).max(0.0);
        Self {
            beta,
            mean_a,
            mean_b,
            var_a,
            var_b,
            cov_ab,
            spread_mean: mean_a - beta * mean_b,
            spread_std: spread_var.sqrt(),
        }
    }

    /// Two-pass computation over explicit windows.
    pub fn compute(a: &[f64], b: &[f64]) -> Option<Self> {
        if a.len() != b.len() || a.is_empty() {
            return None;
        }
        let mean_a = regression::mean(a);
        let mean_b = regression::mean(b);
        let n = a.len() as f64;
        let cov_ab = a
            .iter()
            .zip(b)
            .map(|(x, y)| (x - mean_a) * (y - mean_b))
            .sum::<f64>()
            / n;
        Some(Self::from_moments(
            mean_a,
            mean_b,
            regression::population_variance(a),
            regression::population_variance(b),
            cov_ab,
        ))
    }

    pub fn spread(&self, a: f64, b: f64) -> f64 {
        a - self.beta * b
    }

    /// True when B has no variance or the spread has no variance relative to A.
    pub fn is_degenerate(&self) -> bool {
        let scale = self.var_a.max(self.var_b);
        if scale <= 0.0 || !self.spread_std.is_finite() {
            return true;
        }
        self.var_b <= DEGENERATE_REL_VARIANCE * scale
            || self.spread_std * self.spread_std <= DEGENERATE_REL_VARIANCE * scale
    }

    /// Standardized spread, `None` when the window is degenerate.
    pub fn z_score(&self, a: f64, b: f64) -> Option<f64> {
        if self.is_degenerate() {
            return None;
        }
        Some((self.spread(a, b) - self.spread_mean) / self.spread_std)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Sums {
    a: f64,
    b: f64,
    aa: f64,
    bb: f64,
    ab: f64,
}

impl Sums {
    fn add(&mut self, a: f64, b: f64) {
        self.a += a;
        self.b += b;
        self.aa += a * a;
        self.bb += b * b;
        self.ab += a * b;
    }

    fn remove(&mut self, a: f64, b: f64) {
        self.a -= a;
        self.b -= b;
        self.aa -= a * a;
        self.bb -= b * b;
        self.ab -= a * b;
    }
}

/// Paired bounded histories with O(1) rolling regression statistics.
#[derive(Debug, Clone)]
pub struct RollingPair {
    a: PriceHistory,
    b: PriceHistory,
    sums: Sums,
    shift_a: f64,
    shift_b: f64,
    resync_every: usize,
    since_resync: usize,
}

impl RollingPair {
    /// Window of `capacity` observations, resynchronised once per window.
    pub fn new(capacity: usize) -> Self {
        Self::with_resync_interval(capacity, capacity)
    }

    pub fn with_resync_interval(capacity: usize, resync_every: usize) -> Self {
        Self {
            a: PriceHistory::new(capacity),
            b: PriceHistory::new(capacity),
            sums: Sums::default(),
            shift_a: 0.0,
            shift_b: 0.0,
            resync_every: resync_every.max(1),
            since_resync: 0,
        }
    }

    /// Append one observation of both legs.
    pub fn push(&mut self, a: f64, b: f64) {
        if self.a.is_empty() {
            self.shift_a = a;
            self.shift_b = b;
        }
        let evicted_a = self.a.push(a);
        let evicted_b = self.b.push(b);
        self.sums.add(a - self.shift_a, b - self.shift_b);
        if let (Some(old_a), Some(old_b)) = (evicted_a, evicted_b) {
            self.sums.remove(old_a - self.shift_a, old_b - self.shift_b);
        }

        self.since_resync += 1;
        if self.since_resync >= self.resync_every {
            self.resync();
        }
    }

    /// Recompute the running sums exactly, re-centred on the window means.
    pub fn resync(&mut self) {
        self.since_resync = 0;
        let n = self.a.len();
        if n == 0 {
            self.sums = Sums::default();
            return;
        }
        self.shift_a = self.a.iter().sum::<f64>() / n as f64;
        self.shift_b = self.b.iter().sum::<f64>() / n as f64;
        let mut sums = Sums::default();
        for (a, b) in self.a.iter().zip(self.b.iter()) {
            sums.add(a - self.shift_a, b - self.shift_b);
        }
        self.sums = sums;
    }

    pub fn len(&self) -> usize {
        self.a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.a.capacity()
    }

    pub fn is_full(&self) -> bool {
        self.a.is_full() && self.b.is_full()
    }

    pub fn history_a(&self) -> &PriceHistory {
        &self.a
    }

    pub fn history_b(&self) -> &PriceHistory {
        &self.b
    }

    /// Statistics over the current window; `None` until the window is full.
    pub fn stats(&self) -> Option<PairStats> {
        if !self.is_full() {
            return None;
        }
        let n = self.len() as f64;
        let ma = self.sums.a / n;
        let mb = self.sums.b / n;
        let var_a = self.sums.aa / n - ma * ma;
        let var_b = self.sums.bb / n - mb * mb;
        let cov = self.sums.ab / n - ma * mb;
        Some(PairStats::from_moments(
            self.shift_a + ma,
            self.shift_b + mb,
            var_a,
            var_b,
            cov,
        ))
    }

    /// Spread `a - beta * b` for every observation in the window.
    pub fn spread_series(&self, beta: f64) -> Vec<f64> {
        self.a
            .iter()
            .zip(self.b.iter())
            .map(|(a, b)| a - beta * b)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_bounded_and_evicts_oldest() {
        let mut h = PriceHistory::new(3);
        assert_eq!(h.push(1.0), None);
        assert_eq!(h.push(2.0), None);
        assert_eq!(h.push(3.0), None);
        assert!(h.is_full());
        assert_eq!(h.push(4.0), Some(1.0));
        assert_eq!(h.len(), 3);
        assert_eq!(h.to_vec(), vec![2.0, 3.0, 4.0]);
        assert_eq!(h.last(), Some(4.0));
    }

    #[test]
    fn stats_undefined_until_full() {
        let mut pair = RollingPair::new(5);
        for i in 0..4 {
            pair.push(i as f64, 2.0 * i as f64);
            assert!(pair.stats().is_none());
        }
        pair.push(4.0, 8.0);
        assert!(pair.stats().is_some());
    }

    #[test]
    fn exact_linear_relation_is_degenerate() {
        let mut pair = RollingPair::new(20);
        for i in 0..30 {
            let b = 50.0 + (i as f64 * 0.3).sin() * 5.0;
            pair.push(0.5 * b, b);
        }
        let stats = pair.stats().unwrap();
        assert!((stats.beta - 0.5).abs() < 1e-9);
        assert!(stats.is_degenerate());
        assert!(stats.z_score(25.0, 50.0).is_none());
    }

    #[test]
    fn constant_leg_b_is_degenerate() {
        let mut pair = RollingPair::new(10);
        for i in 0..10 {
            pair.push(10.0 + i as f64, 20.0);
        }
        let stats = pair.stats().unwrap();
        assert_eq!(stats.beta, 0.0);
        assert!(stats.is_degenerate());
    }

    #[test]
    fn incremental_matches_two_pass() {
        let mut pair = RollingPair::with_resync_interval(25, 1_000);
        let a: Vec<f64> = (0..200)
            .map(|i| 100.0 + (i as f64 * 0.21).sin() * 3.0 + i as f64 * 0.05)
            .collect();
        let b: Vec<f64> = (0..200)
            .map(|i| 50.0 + (i as f64 * 0.17).cos() * 2.0 + i as f64 * 0.02)
            .collect();
        for i in 0..200 {
            pair.push(a[i], b[i]);
            if i + 1 >= 25 {
                let lo = i + 1 - 25;
                let naive = PairStats::compute(&a[lo..=i], &b[lo..=i]).unwrap();
                let fast = pair.stats().unwrap();
                assert!((naive.beta - fast.beta).abs() < 1e-8);
                assert!((naive.spread_mean - fast.spread_mean).abs() < 1e-8);
                assert!((naive.spread_std - fast.spread_std).abs() < 1e-8);
            }
        }
    }

    #[test]
    fn resync_preserves_statistics() {
        let mut pair = RollingPair::with_resync_interval(10, 1_000);
        for i in 0..37 {
            pair.push(10.0 + (i as f64).sqrt(), 5.0 + (i as f64 * 0.4).sin());
        }
        let before = pair.stats().unwrap();
        pair.resync();
        let after = pair.stats().unwrap();
        assert!((before.beta - after.beta).abs() < 1e-9);
        assert!((before.spread_std - after.spread_std).abs() < 1e-9);
        assert!((before.mean_a - after.mean_a).abs() < 1e-9);
    }

    #[test]
    fn z_score_sign_follows_spread() {
        let stats = PairStats::from_moments(10.0, 5.0, 4.0, 1.0, 1.5);
        // beta = 1.5, spread mean = 2.5, spread var = 4 - 4.5 + 2.25 = 1.75
        assert!((stats.beta - 1.5).abs() < 1e-12);
        assert!((stats.spread_mean - 2.5).abs() < 1e-12);
        let high = stats.z_score(12.0, 5.0).unwrap();
        let low = stats.z_score(8.0, 5.0).unwrap();
        assert!(high > 0.0 && low < 0.0);
        assert!((high - 2.0 / 1.75_f64.sqrt()).abs() < 1e-12);
    }
}
