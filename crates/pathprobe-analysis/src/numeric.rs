//! Numeric utilities shared by the analyzers.
//!
//! Everything here is independent of signal synthesis and of any particular
//! analyzer: epsilon-floored dB conversion, RMS, medians, an O(n) prefix-sum
//! sliding RMS, a 'same'-aligned moving average and a first-degree
//! least-squares fit.

/// Additive floor used by every logarithm and RMS in the crate.
pub const EPSILON: f64 = 1e-12;

/// Convert a linear amplitude ratio to dB with the additive epsilon floor.
///
/// ```text
/// dB = 20 · log10(x + ε)
/// ```
#[inline]
pub fn amplitude_to_db(x: f64) -> f64 {
    20.0 * (x + EPSILON).log10()
}

/// Mean of `signal` in f64, `0.0` for an empty slice.
pub fn mean(signal: &[f32]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    signal.iter().map(|&x| x as f64).sum::<f64>() / signal.len() as f64
}

/// Mean square of `signal` in f64, `0.0` for an empty slice.
pub fn mean_square(signal: &[f32]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    signal.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>() / signal.len() as f64
}

/// RMS with the epsilon folded into the mean square: `sqrt(mean(x²) + ε)`.
///
/// Never returns zero, so ratios and logarithms of the result stay finite.
pub fn rms_floored(signal: &[f32]) -> f64 {
    (mean_square(signal) + EPSILON).sqrt()
}

/// Median of `values`; the two middle elements are averaged for even lengths.
///
/// Returns `NaN` for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Prefix sums of squares: `out[0] = 0`, `out[k] = Σ_{j<k} x[j]²`.
pub fn prefix_sum_squares(signal: &[f32]) -> Vec<f64> {
    let mut out = Vec::with_capacity(signal.len() + 1);
    let mut acc = 0.0f64;
    out.push(acc);
    for &x in signal {
        acc += (x as f64) * (x as f64);
        out.push(acc);
    }
    out
}

/// Centred sliding RMS over `2 · half_width` samples, O(n) in the signal length.
///
/// The signal is zero-padded by `half_width` on both sides; entry `i` is the
/// RMS of `x[i + 1 - half_width ..= i + half_width]` (samples outside the
/// signal count as zero). Output has the same length as the input.
pub fn sliding_rms(signal: &[f32], half_width: usize) -> Vec<f32> {
    let w = half_width.max(1);
    let n = signal.len();

    let mut padded = vec![0.0f32; n + 2 * w];
    padded[w..w + n].copy_from_slice(signal);
    let prefix = prefix_sum_squares(&padded);

    let denom = (2 * w) as f64;
    (0..n)
        .map(|i| {
            let energy = (prefix[i + 2 * w + 1] - prefix[i + 1]).max(0.0);
            (energy / denom).sqrt() as f32
        })
        .collect()
}

/// Moving average of `signal` with a uniform kernel of `width` samples.
///
/// Output is 'same'-aligned with the input: entry `i` averages
/// `x[i - width/2 ..= i + (width - 1) - width/2]`, treating samples outside
/// the signal as zero and always dividing by `width`.
pub fn moving_average(signal: &[f32], width: usize) -> Vec<f32> {
    let n = signal.len();
    if n == 0 || width == 0 {
        return signal.to_vec();
    }

    let mut prefix = Vec::with_capacity(n + 1);
    let mut acc = 0.0f64;
    prefix.push(acc);
    for &x in signal {
        acc += x as f64;
        prefix.push(acc);
    }

    let left = width / 2;
    let right = width - 1 - left;
    (0..n)
        .map(|i| {
            let start = i.saturating_sub(left);
            let end = (i + right + 1).min(n);
            ((prefix[end] - prefix[start]) / width as f64) as f32
        })
        .collect()
}

/// Least-squares line `y ≈ slope · x + intercept`.
///
/// Returns `None` when fewer than two points are given or all `x` coincide.
pub fn linear_fit(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let mean_x = x[..n].iter().sum::<f64>() / n as f64;
    let mean_y = y[..n].iter().sum::<f64>() / n as f64;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (&xi, &yi) in x[..n].iter().zip(&y[..n]) {
        let dx = xi - mean_x;
        sxx += dx * dx;
        sxy += dx * (yi - mean_y);
    }

    if sxx <= f64::EPSILON * n as f64 {
        return None;
    }
    let slope = sxy / sxx;
    Some((slope, mean_y - slope * mean_x))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amplitude_to_db_floor() {
        assert!((amplitude_to_db(0.0) + 240.0).abs() < 1e-9);
        assert!(amplitude_to_db(1.0).abs() < 1e-9);
        assert!((amplitude_to_db(0.1) + 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_rms_floored_never_zero() {
        assert!((rms_floored(&[]) - 1e-6).abs() < 1e-12);
        assert!((rms_floored(&[0.0; 16]) - 1e-6).abs() < 1e-12);
        assert!((rms_floored(&[0.5; 16]) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_median_odd_even_empty() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn test_prefix_sum_squares() {
        let p = prefix_sum_squares(&[1.0, 2.0, 3.0]);
        assert_eq!(p, vec![0.0, 1.0, 5.0, 14.0]);
    }

    #[test]
    fn test_sliding_rms_constant_interior() {
        let signal = vec![0.5f32; 100];
        let env = sliding_rms(&signal, 4);
        assert_eq!(env.len(), 100);
        // Interior windows are fully inside the signal
        for &v in &env[4..96] {
            assert!((v - 0.5).abs() < 1e-6, "got {v}");
        }
        // Edges see zero padding
        assert!(env[0] < 0.5);
        assert!(env[99] < 0.5);
    }

    #[test]
    fn test_sliding_rms_matches_direct_window() {
        let signal: Vec<f32> = (0..50).map(|i| ((i * 7) % 11) as f32 / 11.0 - 0.5).collect();
        let w = 3;
        let env = sliding_rms(&signal, w);
        for i in 0..signal.len() {
            let lo = (i + 1) as i64 - w as i64;
            let hi = (i + w) as i64;
            let energy: f64 = (lo..=hi)
                .filter(|&j| j >= 0 && (j as usize) < signal.len())
                .map(|j| (signal[j as usize] as f64).powi(2))
                .sum();
            let expected = (energy / (2 * w) as f64).sqrt() as f32;
            assert!((env[i] - expected).abs() < 1e-6, "index {i}");
        }
    }

    #[test]
    fn test_moving_average_same_alignment() {
        let mut signal = vec![0.0f32; 9];
        signal[4] = 4.0;
        let avg = moving_average(&signal, 4);
        assert_eq!(avg.len(), 9);
        // Kernel spans i-2 ..= i+1
        assert_eq!(avg[2], 0.0);
        assert_eq!(avg[3], 1.0);
        assert_eq!(avg[6], 1.0);
        assert_eq!(avg[7], 0.0);
    }

    #[test]
    fn test_linear_fit_exact_line() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 0.25 * v - 3.0).collect();
        let (a, b) = linear_fit(&x, &y).unwrap();
        assert!((a - 0.25).abs() < 1e-12);
        assert!((b + 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_fit_degenerate() {
        assert!(linear_fit(&[1.0], &[2.0]).is_none());
        assert!(linear_fit(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_none());
    }
}
