//! Two-pass regression helpers and a residual-based Dickey-Fuller test.
//!
//! These are the exact (naive) computations. The rolling engine in
//! `stats::rolling` keeps incremental sums instead and must agree with
//! these within floating-point tolerance.

/// Result of an ordinary least squares fit `y = intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ols {
    pub slope: f64,
    pub intercept: f64,
}

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return f64::NAN;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Population variance (divides by n).
pub fn population_variance(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return f64::NAN;
    }
    let m = mean(xs);
    xs.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / xs.len() as f64
}

/// Population standard deviation (divides by n).
pub fn population_std(xs: &[f64]) -> f64 {
    population_variance(xs).sqrt()
}

/// Regress `ys` on `xs`. Returns `None` when the inputs differ in length,
/// hold fewer than two points, or `xs` has no variance.
pub fn ols(xs: &[f64], ys: &[f64]) -> Option<Ols> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs);
    let my = mean(ys);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        sxy += dx * (y - my);
        sxx += dx * dx;
    }
    if sxx.abs() < 1e-12 {
        return None;
    }
    let slope = sxy / sxx;
    Some(Ols {
        slope,
        intercept: my - slope * mx,
    })
}

/// Outcome of a Dickey-Fuller regression `dy_t = alpha + phi * y_{t-1} + e_t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DickeyFuller {
    pub phi: f64,
    pub t_stat: f64,
    /// Approximate p-value bucket from interpolated critical values.
    pub p_value: f64,
    /// Mean-reversion half-life in bars; infinite when the series does not revert.
    pub half_life: f64,
    pub observations: usize,
}

/// Dickey-Fuller test on a residual series (e.g. the spread `A - beta * B`).
///
/// Returns `None` for fewer than five points or a constant series.
pub fn dickey_fuller(series: &[f64]) -> Option<DickeyFuller> {
    if series.len() < 5 {
        return None;
    }
    let lagged: Vec<f64> = series[..series.len() - 1].to_vec();
    let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();
    let n = lagged.len();

    let fit = ols(&lagged, &diffs)?;
    let mx = mean(&lagged);
    let sxx: f64 = lagged.iter().map(|x| (x - mx) * (x - mx)).sum();

    let rss: f64 = lagged
        .iter()
        .zip(&diffs)
        .map(|(x, dy)| {
            let err = dy - (fit.intercept + fit.slope * x);
            err * err
        })
        .sum();
    let sigma2 = rss / n.saturating_sub(2).max(1) as f64;
    let se_phi = (sigma2 / sxx).sqrt();
    let t_stat = if se_phi < 1e-12 {
        // Perfect fit: a reverting series is maximally significant.
        if fit.slope < 0.0 {
            f64::NEG_INFINITY
        } else {
            0.0
        }
    } else {
        fit.slope / se_phi
    };

    // |ar| < 1 reverts; a negative ar reverts while flipping sign each bar.
    let ar = (1.0 + fit.slope).abs();
    let half_life = if ar > 0.0 && ar < 1.0 {
        -(2.0_f64.ln()) / ar.ln()
    } else {
        f64::INFINITY
    };

    Some(DickeyFuller {
        phi: fit.slope,
        t_stat,
        p_value: residual_p_value(t_stat, n),
        half_life,
        observations: n,
    })
}

/// Critical values (1%, 5%, 10%) for the residual-based cointegration test
/// with a constant and two variables, interpolated by sample size.
const CRITICAL_VALUES: &[(usize, f64, f64, f64)] = &[
    (25, -4.37, -3.59, -3.22),
    (50, -4.12, -3.46, -3.13),
    (100, -4.01, -3.39, -3.09),
    (250, -3.94, -3.36, -3.06),
    (500, -3.92, -3.35, -3.05),
];

/// Map a DF t-statistic to a coarse p-value bucket.
pub fn residual_p_value(t_stat: f64, n: usize) -> f64 {
    let (c1, c5, c10) = interpolate_critical_values(n, CRITICAL_VALUES);
    if t_stat < c1 {
        0.005
    } else if t_stat < c5 {
        0.025
    } else if t_stat < c10 {
        0.075
    } else {
        0.5
    }
}

fn interpolate_critical_values(n: usize, table: &[(usize, f64, f64, f64)]) -> (f64, f64, f64) {
    let Some(&(n0, c1, c5, c10)) = table.first() else {
        return (f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
    };
    if n <= n0 {
        return (c1, c5, c10);
    }
    for w in table.windows(2) {
        let (n1, c1_1, c5_1, c10_1) = w[0];
        let (n2, c1_2, c5_2, c10_2) = w[1];
        if n >= n1 && n <= n2 {
            let t = (n - n1) as f64 / (n2 - n1) as f64;
            let lerp = |a: f64, b: f64| a + t * (b - a);
            return (lerp(c1_1, c1_2), lerp(c5_1, c5_2), lerp(c10_1, c10_2));
        }
    }
    table
        .last()
        .map_or((c1, c5, c10), |&(_, c1, c5, c10)| (c1, c5, c10))
}
