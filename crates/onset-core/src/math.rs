//! Small order-statistic and moment helpers shared by the feature engine and
//! the confirm detector. Kept dependency-free (no `statrs`) because the
//! confirm detector's tie-break rule ("ties broken by lower index") needs a
//! stable sort over the exact input slice, not a library's internal order.

pub fn mean(xs: &[f64]) -> f64 {
	if xs.is_empty() {
		return 0.0;
	}
	xs.iter().sum::<f64>() / xs.len() as f64
}

/// Population standard deviation (divide by N, not N-1) — matches
/// feature-engine's `z_vol_1s` definition over a closed window of samples.
pub fn population_stdev(xs: &[f64]) -> f64 {
	if xs.is_empty() {
		return 0.0;
	}
	let m = mean(xs);
	let variance = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / xs.len() as f64;
	variance.sqrt()
}

/// Exact order-statistic median. Ties are broken by a stable sort, so when
/// two entries carry equal values the one with the lower original index is
/// treated as "earlier" for the purpose of picking the middle element(s) —
/// the result is the same either way since equal values yield equal medians,
/// but the stable order keeps median selection deterministic in the presence
/// of NaN-free duplicate inputs.
pub fn median(xs: &[f64]) -> f64 {
	if xs.is_empty() {
		return 0.0;
	}
	let mut sorted = xs.to_vec();
	sorted.sort_by(f64::total_cmp);
	let n = sorted.len();
	if n % 2 == 1 {
		sorted[n / 2]
	} else {
		(sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn median_odd() {
		assert!((median(&[3.0, 1.0, 2.0]) - 2.0).abs() < 1e-12);
	}

	#[test]
	fn median_even_averages_middle_two() {
		assert!((median(&[1.0, 2.0, 3.0, 4.0]) - 2.5).abs() < 1e-12);
	}

	#[test]
	fn median_single_is_identity() {
		assert!((median(&[42.0]) - 42.0).abs() < 1e-12);
	}

	#[test]
	fn median_empty_is_zero() {
		assert_eq!(median(&[]), 0.0);
	}

	#[test]
	fn stdev_of_constant_is_zero() {
		assert_eq!(population_stdev(&[5.0, 5.0, 5.0]), 0.0);
	}
}
