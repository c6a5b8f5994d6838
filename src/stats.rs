// OUTLIER-ROBUST SAMPLE REDUCTION
// POWER READINGS ARE NOISY: THE SAMPLING THREAD STRADDLES PHASE BOUNDARIES
// AND OCCASIONALLY CATCHES A TRANSIENT SPIKE. MIDRANGE AFTER OUTLIER
// REJECTION TRACKS THE STEADY-STATE DRAW BETTER THAN A PLAIN MEAN.

use anyhow::{ensure, Result};

// OUTLIER CUTOFF: DELTA FROM MEAN > 1.5 * SAMPLE STDDEV
const OUTLIER_STDDEVS: f64 = 1.5;

// MIDRANGE OF THE SAMPLES THAT SURVIVE OUTLIER REJECTION.
// NEEDS AT LEAST TWO SAMPLES (SAMPLE STDDEV IS UNDEFINED FOR ONE).
pub fn midrange(values: &[f64]) -> Result<f64> {
    ensure!(
        values.len() >= 2,
        "midrange needs at least 2 samples, got {}",
        values.len()
    );

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1.0);
    let threshold = variance.sqrt() * OUTLIER_STDDEVS;

    let kept: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| (v - mean).abs() <= threshold)
        .collect();
    ensure!(!kept.is_empty(), "every sample rejected as an outlier");

    let min = kept.iter().copied().fold(f64::INFINITY, f64::min);
    let max = kept.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Ok((min + max) / 2.0)
}

// STANDARD MEDIAN. EVEN-LENGTH LISTS AVERAGE THE TWO CENTRAL VALUES.
pub fn median(values: &[f64]) -> Result<f64> {
    ensure!(!values.is_empty(), "median of an empty sample list");

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Ok(sorted[mid])
    } else {
        Ok((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midrange_removes_outlier() {
        // 100 DEVIATES FROM THE MEAN (28) BY MORE THAN 1.5 STDDEVS -> DROPPED
        let v = [10.0, 10.0, 10.0, 10.0, 100.0];
        assert_eq!(midrange(&v).unwrap(), 10.0);
    }

    #[test]
    fn midrange_without_outliers_is_plain_midrange() {
        // NO SAMPLE BEYOND 1.5 STDDEVS -> (MIN + MAX) / 2 OF THE ORIGINAL LIST
        let v = [10.0, 20.0, 30.0];
        assert_eq!(midrange(&v).unwrap(), 20.0);
        let v = [8.0, 12.0];
        assert_eq!(midrange(&v).unwrap(), 10.0);
    }

    #[test]
    fn midrange_rejects_degenerate_input() {
        assert!(midrange(&[]).is_err());
        assert!(midrange(&[42.0]).is_err());
    }

    #[test]
    fn median_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]).unwrap(), 2.0);
    }

    #[test]
    fn median_even_averages_central_pair() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]).unwrap(), 2.5);
    }

    #[test]
    fn median_singleton() {
        assert_eq!(median(&[7.0]).unwrap(), 7.0);
    }

    #[test]
    fn median_rejects_empty() {
        assert!(median(&[]).is_err());
    }
}
