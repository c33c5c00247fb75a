/// Area under a spectrum between two energies
///
/// The window is snapped to the samples nearest to each bound. The sample
/// nearest to `xmax` is left out of the slice, so the integral runs over
/// `[i(xmin), i(xmax))`.

use crate::data::spectrum::Sample;

/// Index of the sample whose energy is closest to `value`.
/// Ties resolve to the lowest index. `None` for an empty slice.
pub fn nearest_index(samples: &[Sample], value: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, s) in samples.iter().enumerate() {
        let dist = (s.energy - value).abs();
        if best.map_or(true, |(_, d)| dist < d) {
            best = Some((i, dist));
        }
    }
    best.map(|(i, _)| i)
}

/// Signed trapezoidal integral of intensity over energy
pub fn trapezoid(samples: &[Sample]) -> f64 {
    samples
        .windows(2)
        .map(|w| 0.5 * (w[0].intensity + w[1].intensity) * (w[1].energy - w[0].energy))
        .sum()
}

/// Trapezoidal area of `samples` clipped to `[xmin, xmax]`.
///
/// Fewer than two samples in the clipped slice gives 0. A reversed window
/// (nearest index of `xmin` past that of `xmax`) is an empty slice and also
/// gives 0.
pub fn area(samples: &[Sample], xmin: f64, xmax: f64) -> f64 {
    let (Some(lo), Some(hi)) = (nearest_index(samples, xmin), nearest_index(samples, xmax)) else {
        return 0.0;
    };
    if hi <= lo {
        return 0.0;
    }
    let slice = &samples[lo..hi];
    if slice.len() < 2 {
        return 0.0;
    }
    trapezoid(slice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn triangle() -> Vec<Sample> {
        [(-2.0, 0.0), (-1.0, 1.0), (0.0, 2.0), (1.0, 1.0), (2.0, 0.0)]
            .iter()
            .map(|&(e, i)| Sample::new(e, i, 0.1))
            .collect()
    }

    #[test]
    fn test_right_endpoint_is_excluded() {
        // indices [1, 2] only: 0.5 * (1 + 2) * 1
        assert_relative_eq!(area(&triangle(), -1.0, 1.0), 1.5);
    }

    #[test]
    fn test_full_span_drops_last_interval() {
        // [0, 4) covers -2..1: 0.5 + 1.5 + 1.5
        assert_relative_eq!(area(&triangle(), -2.0, 2.0), 3.5);
        assert_relative_eq!(trapezoid(&triangle()), 4.0);
    }

    #[test]
    fn test_bounds_snap_to_nearest_sample() {
        // -1.2 -> index 1, 0.9 -> index 3
        assert_relative_eq!(area(&triangle(), -1.2, 0.9), 1.5);
        // far outside the data snaps to the ends
        assert_relative_eq!(area(&triangle(), -100.0, 100.0), 3.5);
    }

    #[test]
    fn test_short_or_empty_windows_are_zero() {
        // one sample in the slice
        assert_eq!(area(&triangle(), -1.0, 0.0), 0.0);
        // both bounds on the same sample
        assert_eq!(area(&triangle(), 0.1, -0.1), 0.0);
        assert_eq!(area(&[], -1.0, 1.0), 0.0);
    }

    #[test]
    fn test_reversed_window_is_zero() {
        assert_eq!(area(&triangle(), 1.0, -1.0), 0.0);
    }

    #[test]
    fn test_nearest_index_ties_pick_first() {
        let s = triangle();
        assert_eq!(nearest_index(&s, -0.5), Some(1));
        assert_eq!(nearest_index(&s, 0.2), Some(2));
        assert_eq!(nearest_index(&[], 0.0), None);
    }

    #[test]
    fn test_area_is_deterministic() {
        let s = triangle();
        let a = area(&s, -1.7, 1.4);
        let b = area(&s, -1.7, 1.4);
        assert_eq!(a.to_bits(), b.to_bits());
    }
}
