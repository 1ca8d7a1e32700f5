//! Trailing-mean smoothing
//!
//! Right-aligned moving average with a minimum effective window of one day:
//! early positions with fewer than `window` predecessors average over the
//! days that do exist. Single pass with a sliding accumulator.

/// Trailing mean of `values` over a `window`-day right-aligned window.
///
/// `smoothed[i]` is the mean of `values[i.saturating_sub(window-1)..=i]`.
/// A zero window is treated as one.
pub fn trailing_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, &v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        let n = (i + 1).min(window);
        out.push(sum / n as f64);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warmup_uses_available_days() {
        let smoothed = trailing_mean(&[1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(smoothed, vec![1.0, 1.5, 2.0, 3.0]);
    }

    #[test]
    fn test_window_one_is_identity() {
        let values = vec![3.0, -1.0, 7.5];
        assert_eq!(trailing_mean(&values, 1), values);
    }

    #[test]
    fn test_window_longer_than_series() {
        let smoothed = trailing_mean(&[2.0, 4.0], 30);
        assert_eq!(smoothed, vec![2.0, 3.0]);
    }

    #[test]
    fn test_empty_input() {
        assert!(trailing_mean(&[], 3).is_empty());
    }

    #[test]
    fn test_zero_window_treated_as_one() {
        assert_eq!(trailing_mean(&[5.0, 6.0], 0), vec![5.0, 6.0]);
    }
}
