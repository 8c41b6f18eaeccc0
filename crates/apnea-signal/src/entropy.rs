//! Nonlinear regularity measures: approximate and sample entropy.
//!
//! Both use embedding dimension `m = 2`, tolerance `r = 0.2 × population
//! std`, and the Chebyshev (max-coordinate) distance between templates.
//!
//! Degenerate inputs — too few samples, zero tolerance from a constant
//! epoch, or no template matches — are reported as
//! [`SignalError::DegenerateSignal`] so the caller can apply its fallback
//! policy instead of receiving a NaN or infinity.

use apnea_core::error::SignalError;

use crate::stats::population_std;

/// Embedding dimension used by both entropy measures.
pub const EMBEDDING_ORDER: usize = 2;

/// Tolerance factor applied to the signal's population std.
pub const TOLERANCE_FACTOR: f64 = 0.2;

/// Approximate entropy ApEn(m, r) with `m = 2`, `r = 0.2·σ`.
///
/// ApEn = Φ(m) − Φ(m+1), where Φ counts Chebyshev template matches
/// including self-matches.
///
/// # Errors
///
/// [`SignalError::DegenerateSignal`] when the signal is shorter than
/// `m + 2` samples or has (near-)zero variance.
pub fn app_entropy(signal: &[f64]) -> Result<f64, SignalError> {
    let r = tolerance(signal, "app_entropy")?;
    let phi_m = phi(signal, EMBEDDING_ORDER, r);
    let phi_m1 = phi(signal, EMBEDDING_ORDER + 1, r);
    Ok(phi_m - phi_m1)
}

/// Sample entropy SampEn(m, r) with `m = 2`, `r = 0.2·σ`.
///
/// SampEn = −ln(A / B), where B counts template pairs matching at length
/// `m` and A those also matching at length `m + 1`, self-matches excluded.
///
/// # Errors
///
/// [`SignalError::DegenerateSignal`] when the signal is too short, has
/// (near-)zero variance, or yields no template matches at either length
/// (the ratio would be 0/0 or its logarithm infinite).
pub fn sample_entropy(signal: &[f64]) -> Result<f64, SignalError> {
    let r = tolerance(signal, "sample_entropy")?;
    let m = EMBEDDING_ORDER;
    let n = signal.len();

    let mut count_m = 0_u64;
    let mut count_m1 = 0_u64;

    for i in 0..n - m {
        for j in (i + 1)..n - m {
            if chebyshev_match(signal, i, j, m, r) {
                count_m += 1;
                if (signal[i + m] - signal[j + m]).abs() <= r {
                    count_m1 += 1;
                }
            }
        }
    }

    if count_m == 0 || count_m1 == 0 {
        return Err(SignalError::DegenerateSignal {
            measure: "sample_entropy",
            reason: format!("no template matches (B={count_m}, A={count_m1})"),
        });
    }

    Ok(-((count_m1 as f64) / (count_m as f64)).ln())
}

/// Shared tolerance computation and degeneracy gate.
fn tolerance(signal: &[f64], measure: &'static str) -> Result<f64, SignalError> {
    let n = signal.len();
    if n < EMBEDDING_ORDER + 2 {
        return Err(SignalError::DegenerateSignal {
            measure,
            reason: format!("{n} samples, need at least {}", EMBEDDING_ORDER + 2),
        });
    }
    let r = TOLERANCE_FACTOR * population_std(signal);
    if !(r > 0.0) || !r.is_finite() {
        return Err(SignalError::DegenerateSignal {
            measure,
            reason: "zero tolerance from constant signal".into(),
        });
    }
    Ok(r)
}

/// Mean log-frequency of Chebyshev matches at template length `m`,
/// self-matches included (so every count is at least 1).
fn phi(signal: &[f64], m: usize, r: f64) -> f64 {
    let n = signal.len();
    let n_templates = n - m + 1;

    let mut log_sum = 0.0;
    for i in 0..n_templates {
        let mut matches = 0_u64;
        for j in 0..n_templates {
            if chebyshev_match(signal, i, j, m, r) {
                matches += 1;
            }
        }
        log_sum += ((matches as f64) / (n_templates as f64)).ln();
    }
    log_sum / n_templates as f64
}

/// Whether the length-`m` templates at `i` and `j` match within `r`
/// under the Chebyshev distance.
fn chebyshev_match(signal: &[f64], i: usize, j: usize, m: usize, r: f64) -> bool {
    for k in 0..m {
        if (signal[i + k] - signal[j + k]).abs() > r {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(n: usize) -> Vec<f64> {
        (0..n).map(|i| (i as f64 * 0.3).sin()).collect()
    }

    fn noisy(n: usize) -> Vec<f64> {
        // Deterministic pseudo-noise: irrational-frequency sine mixture
        (0..n)
            .map(|i| {
                let t = i as f64;
                (t * 1.37).sin() * 0.7 + (t * 2.71).sin() * 0.5 + (t * 0.11).cos() * 0.3
            })
            .collect()
    }

    #[test]
    fn short_signal_is_degenerate() {
        let err = app_entropy(&[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, SignalError::DegenerateSignal { .. }));
        assert!(sample_entropy(&[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn constant_signal_is_degenerate() {
        let flat = vec![0.7; 200];
        assert!(app_entropy(&flat).is_err());
        assert!(sample_entropy(&flat).is_err());
    }

    #[test]
    fn regular_signal_has_lower_entropy_than_irregular() {
        let regular = sine(300);
        let irregular = noisy(300);
        let se_regular = sample_entropy(&regular).unwrap();
        let se_irregular = sample_entropy(&irregular).unwrap();
        assert!(
            se_regular < se_irregular,
            "regular={se_regular}, irregular={se_irregular}"
        );
    }

    #[test]
    fn app_entropy_ranks_regularity() {
        let apen_regular = app_entropy(&sine(300)).unwrap();
        let apen_irregular = app_entropy(&noisy(300)).unwrap();
        assert!(apen_regular.is_finite());
        assert!(
            apen_regular < apen_irregular,
            "regular={apen_regular}, irregular={apen_irregular}"
        );
    }

    #[test]
    fn entropy_is_deterministic() {
        let signal = noisy(250);
        let a1 = app_entropy(&signal).unwrap();
        let a2 = app_entropy(&signal).unwrap();
        assert!((a1 - a2).abs() < 1e-15);
        let s1 = sample_entropy(&signal).unwrap();
        let s2 = sample_entropy(&signal).unwrap();
        assert!((s1 - s2).abs() < 1e-15);
    }

    #[test]
    fn sample_entropy_positive_for_noise() {
        let se = sample_entropy(&noisy(300)).unwrap();
        assert!(se > 0.0);
        assert!(se.is_finite());
    }
}
