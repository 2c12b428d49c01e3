//! Full-range FFT cross-correlation with bounded peak search.
//!
//! # Mathematical Definition
//!
//! ```text
//! R_xy(τ) = Σ_{n} x[n] · y[n + τ]
//! ```
//!
//! With `x` the reference and `y` the target, `R_xy` peaks at `τ = d > 0`
//! when the target is the reference delayed by `d` samples.
//!
//! # FFT-based Computation
//!
//! ```text
//! R_xy(τ) = IFFT( conj(X(f)) · Y(f) )
//! ```
//!
//! Both inputs are zero-padded to a power of two no shorter than
//! `len(x) + len(y) − 1`, so the circular result holds every linear lag
//! without wrap-around. The transform runs in f64: envelope correlations
//! have broad plateaus whose neighbouring lags differ by a few parts per
//! million, below f32 round-off.

use rustfft::{FftPlanner, num_complex::Complex};

/// Cross-correlation over every lag where the two signals overlap.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossCorrelation {
    values: Vec<f64>,
    min_lag: isize,
}

impl CrossCorrelation {
    /// Correlation values ordered from the most negative lag upward.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Smallest lag represented, `−(len(x) − 1)`.
    pub fn min_lag(&self) -> isize {
        self.min_lag
    }

    /// Largest lag represented, `len(y) − 1`.
    pub fn max_lag(&self) -> isize {
        self.min_lag + self.values.len() as isize - 1
    }

    /// Correlation at `lag`, `None` outside the overlap range.
    pub fn at(&self, lag: isize) -> Option<f64> {
        let idx = usize::try_from(lag - self.min_lag).ok()?;
        self.values.get(idx).copied()
    }

    /// Lag of the maximum correlation, optionally restricted to `|τ| ≤ bound`.
    ///
    /// The most negative lag wins ties. Returns 0 when the search window is empty.
    pub fn peak_lag(&self, bound: Option<usize>) -> isize {
        let (lo, hi) = match bound {
            Some(b) => {
                let b = b as isize;
                (self.min_lag.max(-b), self.max_lag().min(b))
            }
            None => (self.min_lag, self.max_lag()),
        };

        let mut best_lag = 0;
        let mut best = f64::NEG_INFINITY;
        for lag in lo..=hi {
            if let Some(v) = self.at(lag)
                && v > best
            {
                best = v;
                best_lag = lag;
            }
        }
        best_lag
    }
}

/// Full linear cross-correlation of `x` (reference) and `y` (target) via FFT.
///
/// Returns an empty correlation when either input is empty.
pub fn xcorr_full(x: &[f32], y: &[f32]) -> CrossCorrelation {
    if x.is_empty() || y.is_empty() {
        return CrossCorrelation {
            values: Vec::new(),
            min_lag: 0,
        };
    }

    let full_len = x.len() + y.len() - 1;
    let fft_size = full_len.next_power_of_two().max(2);
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(fft_size);
    let ifft = planner.plan_fft_inverse(fft_size);

    let mut buf_x: Vec<Complex<f64>> = x.iter().map(|&v| Complex::new(v as f64, 0.0)).collect();
    buf_x.resize(fft_size, Complex::new(0.0, 0.0));
    let mut buf_y: Vec<Complex<f64>> = y.iter().map(|&v| Complex::new(v as f64, 0.0)).collect();
    buf_y.resize(fft_size, Complex::new(0.0, 0.0));

    fft.process(&mut buf_x);
    fft.process(&mut buf_y);
    for (cx, cy) in buf_x.iter_mut().zip(buf_y.iter()) {
        *cx = cx.conj() * cy;
    }
    ifft.process(&mut buf_x);
    let scale = 1.0 / fft_size as f64;

    // Circular layout: lag τ ≥ 0 at index τ, lag τ < 0 at index fft_size + τ
    let min_lag = -(x.len() as isize - 1);
    let values = (min_lag..y.len() as isize)
        .map(|lag| {
            let idx = if lag >= 0 {
                lag as usize
            } else {
                (fft_size as isize + lag) as usize
            };
            buf_x[idx].re * scale
        })
        .collect();

    CrossCorrelation { values, min_lag }
}
