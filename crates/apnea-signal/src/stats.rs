//! Time-domain statistics over a single epoch.
//!
//! All moments use the population (N-denominator) convention the trained
//! models were fitted against. Skewness and kurtosis are the biased
//! sample estimators g1 and g2 (excess kurtosis); both report 0.0 for a
//! zero-variance epoch instead of propagating a NaN into the classifier.

/// Arithmetic mean. Returns 0.0 for an empty slice.
#[must_use]
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population standard deviation (N denominator).
#[must_use]
pub fn population_std(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    let var = data.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / data.len() as f64;
    var.sqrt()
}

/// Median via sort; the average of the two middle values for even N.
#[must_use]
pub fn median(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        f64::midpoint(sorted[n / 2 - 1], sorted[n / 2])
    }
}

/// Percentile with linear interpolation between closest ranks, `q` in
/// [0, 100].
#[must_use]
pub fn percentile(data: &[f64], q: f64) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let pos = q / 100.0 * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = pos - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

/// Biased sample skewness g1 = m3 / m2^(3/2).
///
/// 0.0 for zero-variance or empty input.
#[must_use]
pub fn skewness(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    let n = data.len() as f64;
    let m2 = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / n;
    if m2 < 1e-30 {
        return 0.0;
    }
    let m3 = data.iter().map(|x| (x - m).powi(3)).sum::<f64>() / n;
    m3 / m2.powf(1.5)
}

/// Biased excess kurtosis g2 = m4 / m2^2 - 3.
///
/// 0.0 for zero-variance or empty input.
#[must_use]
pub fn kurtosis(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    let n = data.len() as f64;
    let m2 = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / n;
    if m2 < 1e-30 {
        return 0.0;
    }
    let m4 = data.iter().map(|x| (x - m).powi(4)).sum::<f64>() / n;
    m4 / (m2 * m2) - 3.0
}

/// Minimum value; 0.0 for an empty slice.
#[must_use]
pub fn min(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().copied().fold(f64::INFINITY, f64::min)
}

/// Maximum value; 0.0 for an empty slice.
#[must_use]
pub fn max(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}
