//! Robust latency reduction.
//!
//! The reducer is a Winsorized Mean: instead of discarding outliers, values
//! beyond a rank chosen per tail are clamped to the value at that rank, and
//! the arithmetic mean is taken over the clamped sequence.

/// Default fraction of samples clamped up from the low tail.
pub const DEFAULT_LOWER_LIMIT: f64 = 0.05;

/// Default fraction of samples clamped down from the high tail.
pub const DEFAULT_UPPER_LIMIT: f64 = 0.10;

/// Clamp fractions for [`winsorized_mean`].
///
/// Both fractions are policy rather than algorithm; they can be overridden
/// from the command line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WinsorLimits {
    pub lower: f64,
    pub upper: f64,
}

impl WinsorLimits {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }
}

impl Default for WinsorLimits {
    fn default() -> Self {
        Self {
            lower: DEFAULT_LOWER_LIMIT,
            upper: DEFAULT_UPPER_LIMIT,
        }
    }
}

/// Reduce a target's samples to one representative latency in milliseconds.
///
/// Failure markers are discarded first; with no successful samples the
/// statistic is unavailable and `None` is returned. The result depends only
/// on the multiset of successful values, never on their order.
pub fn winsorized_mean(samples: &[Option<f64>], limits: &WinsorLimits) -> Option<f64> {
    let values: Vec<f64> = samples.iter().copied().flatten().collect();
    if values.is_empty() {
        return None;
    }
    let clamped = winsorize(&values, limits);
    Some(clamped.iter().sum::<f64>() / clamped.len() as f64)
}

/// Clamp each tail of `values` to the value at the rank selected by the
/// matching limit.
///
/// A limit whose rank is not interior to the sequence (too few samples for
/// the fraction to bite) leaves that tail unchanged, so small sample sets
/// degrade to a plain mean.
pub fn winsorize(values: &[f64], limits: &WinsorLimits) -> Vec<f64> {
    let n = values.len();
    let mut clamped = values.to_vec();
    if n == 0 {
        return clamped;
    }

    // Ranks over the original values; ties keep their input order.
    let mut ranks: Vec<usize> = (0..n).collect();
    ranks.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let lower_rank = (limits.lower * n as f64) as usize;
    if lower_rank > 0 && lower_rank < n {
        let lower_value = values[ranks[lower_rank]];
        for &i in &ranks[..lower_rank] {
            clamped[i] = lower_value;
        }
    }

    let upper_cut = ((limits.upper * n as f64) as usize).min(n);
    let upper_rank = n - upper_cut;
    if upper_rank > 0 && upper_rank < n {
        let upper_value = values[ranks[upper_rank - 1]];
        for &i in &ranks[upper_rank..] {
            clamped[i] = upper_value;
        }
    }

    clamped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(lower: f64, upper: f64) -> WinsorLimits {
        WinsorLimits::new(lower, upper)
    }

    #[test]
    fn no_successful_samples_is_unavailable() {
        assert_eq!(winsorized_mean(&[], &WinsorLimits::default()), None);
        assert_eq!(
            winsorized_mean(&[None, None, None], &WinsorLimits::default()),
            None
        );
    }

    #[test]
    fn single_sample_is_its_own_mean() {
        assert_eq!(
            winsorized_mean(&[Some(42.0)], &WinsorLimits::default()),
            Some(42.0)
        );
    }

    #[test]
    fn failure_markers_are_discarded() {
        let samples = [Some(10.0), None, Some(12.0), None];
        assert_eq!(winsorized_mean(&samples, &limits(0.0, 0.0)), Some(11.0));
    }

    #[test]
    fn outlier_clamps_to_upper_rank_value() {
        // Upper limit chosen so exactly the top sample is clamped: the
        // 100 ms outlier collapses onto the 12 ms rank value.
        let samples = [Some(10.0), Some(12.0), Some(100.0)];
        let mean = winsorized_mean(&samples, &limits(0.0, 0.34)).unwrap();
        assert!((mean - 34.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn result_ignores_sample_order() {
        let lim = limits(0.0, 0.34);
        let a = winsorized_mean(&[Some(100.0), Some(10.0), Some(12.0)], &lim);
        let b = winsorized_mean(&[Some(10.0), Some(12.0), Some(100.0)], &lim);
        assert_eq!(a, b);
    }

    #[test]
    fn upper_tail_is_insensitive_beyond_the_clamp_rank() {
        let lim = limits(0.0, 0.34);
        let base = winsorized_mean(&[Some(10.0), Some(12.0), Some(100.0)], &lim);
        let worse = winsorized_mean(&[Some(10.0), Some(12.0), Some(10_000.0)], &lim);
        assert_eq!(base, worse);
    }

    #[test]
    fn default_limits_degenerate_to_plain_mean_on_few_samples() {
        // Three samples leave neither default rank interior, so nothing
        // clamps and the plain mean comes back.
        let samples = [Some(10.0), Some(12.0), Some(100.0)];
        let mean = winsorized_mean(&samples, &WinsorLimits::default()).unwrap();
        assert!((mean - 122.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn default_upper_limit_bites_at_ten_samples() {
        // n = 10 puts the 0.10 upper limit exactly on the maximum.
        let mut values: Vec<f64> = (1..=9).map(f64::from).collect();
        values.push(1000.0);
        let clamped = winsorize(&values, &WinsorLimits::default());
        assert_eq!(clamped[9], 9.0);
        assert_eq!(&clamped[..9], &values[..9]);
    }

    #[test]
    fn clamped_values_stay_inside_the_band() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 50.0];
        let clamped = winsorize(&values, &limits(0.2, 0.2));
        // Band is [3.0, 8.0]: rank 2 from below, rank 7 from above.
        assert!(clamped.iter().all(|v| (3.0..=8.0).contains(v)));
        assert_eq!(&clamped[2..8], &values[2..8]);
    }

    #[test]
    fn both_tails_clamp_on_unsorted_input() {
        let values = [50.0, 5.0, 1.0, 4.0, 2.0, 3.0, 6.0, 7.0, 9.0, 8.0];
        let clamped = winsorize(&values, &limits(0.2, 0.2));
        let mean = clamped.iter().sum::<f64>() / clamped.len() as f64;
        // Clamped multiset is {3, 3, 3, 4, 5, 6, 7, 8, 8, 8}.
        assert!((mean - 5.5).abs() < 1e-9);
    }
}
