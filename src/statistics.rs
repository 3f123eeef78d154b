//! Descriptive statistics over plain `f64` populations.
//!
//! All functions return `None` for an empty population. Standard deviation is
//! the population form (divides by `n`).

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn variance(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    Some(values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / values.len() as f64)
}

pub fn std_dev(values: &[f64]) -> Option<f64> {
    variance(values).map(f64::sqrt)
}

/// Returns the `p`th percentile (0 to 100) using linear interpolation
/// between the closest ranks.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=100.0).contains(&p) {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

pub fn median(values: &[f64]) -> Option<f64> {
    percentile(values, 50.0)
}

/// Distance between the 75th and 25th percentiles.
pub fn iqr(values: &[f64]) -> Option<f64> {
    Some(percentile(values, 75.0)? - percentile(values, 25.0)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use quickcheck_macros::quickcheck;
    use rstest::rstest;

    #[rstest]
    #[case(&[1.0], 1.0)]
    #[case(&[3.0, 1.0, 2.0], 2.0)]
    #[case(&[4.0, 1.0, 3.0, 2.0], 2.5)]
    fn median_of(#[case] values: &[f64], #[case] expected: f64) {
        assert_relative_eq!(median(values).unwrap(), expected);
    }

    #[test]
    fn population_std_dev() {
        // Mean 5, squared deviations sum to 32 over 8 values.
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&values).unwrap(), 5.0);
        assert_relative_eq!(std_dev(&values).unwrap(), 2.0);
    }

    #[test]
    fn interquartile_range() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(percentile(&values, 25.0).unwrap(), 2.0);
        assert_relative_eq!(percentile(&values, 75.0).unwrap(), 4.0);
        assert_relative_eq!(iqr(&values).unwrap(), 2.0);
    }

    #[test]
    fn empty_population() {
        assert_eq!(mean(&[]), None);
        assert_eq!(std_dev(&[]), None);
        assert_eq!(median(&[]), None);
        assert_eq!(iqr(&[]), None);
    }

    #[quickcheck]
    fn median_within_bounds(values: Vec<i16>) -> bool {
        let values: Vec<f64> = values.into_iter().map(f64::from).collect();
        match median(&values) {
            None => values.is_empty(),
            Some(m) => {
                let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
                let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                min <= m && m <= max
            }
        }
    }
}
