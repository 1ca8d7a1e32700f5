//! Masked descriptive statistics
//!
//! Free functions over slices of optional values. A `None` entry is a day with
//! no usable value (e.g. a rainless day); statistics ignore those entries and
//! return `None` when no usable value remains, so "no qualifying data" is an
//! ordinary outcome rather than an error.

/// Arithmetic mean of the present values.
pub fn mean(values: &[Option<f64>]) -> Option<f64> {
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in values.iter().flatten() {
        sum += v;
        n += 1;
    }
    if n == 0 { None } else { Some(sum / n as f64) }
}

/// Minimum of the present values.
pub fn min(values: &[Option<f64>]) -> Option<f64> {
    values
        .iter()
        .flatten()
        .copied()
        .fold(None, |acc, v| match acc {
            Some(m) if m <= v => Some(m),
            _ => Some(v),
        })
}

/// Maximum of the present values.
pub fn max(values: &[Option<f64>]) -> Option<f64> {
    values
        .iter()
        .flatten()
        .copied()
        .fold(None, |acc, v| match acc {
            Some(m) if m >= v => Some(m),
            _ => Some(v),
        })
}

/// Sum of the present values. `None` when no value is present.
pub fn total(values: &[Option<f64>]) -> Option<f64> {
    let mut sum = 0.0;
    let mut any = false;
    for v in values.iter().flatten() {
        sum += v;
        any = true;
    }
    if any { Some(sum) } else { None }
}

/// Max minus min of the present values.
pub fn range(values: &[Option<f64>]) -> Option<f64> {
    match (max(values), min(values)) {
        (Some(hi), Some(lo)) => Some(hi - lo),
        _ => None,
    }
}

/// Population standard deviation of the present values.
pub fn pop_std(values: &[Option<f64>]) -> Option<f64> {
    let m = mean(values)?;
    let mut sq = 0.0;
    let mut n = 0usize;
    for v in values.iter().flatten() {
        let d = v - m;
        sq += d * d;
        n += 1;
    }
    if n == 0 {
        None
    } else {
        Some((sq / n as f64).sqrt())
    }
}

/// Coefficient of variation: population std divided by the mean.
///
/// Absent when the mean is exactly zero (division undefined) or when no
/// value is present.
pub fn variability(values: &[Option<f64>]) -> Option<f64> {
    let m = mean(values)?;
    if m == 0.0 {
        return None;
    }
    pop_std(values).map(|s| s / m)
}
