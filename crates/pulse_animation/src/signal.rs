//! Envelope signals
//!
//! A [`Signal`] is an immutable table of samples taken at uniform time steps.
//! Playback maps animation progress onto the table to shape how a property
//! moves over the animation's duration.
//!
//! Signals are cheap to clone (the samples live behind an `Arc`) and can be
//! read concurrently by any number of playback loops.
//!
//! ```ignore
//! use pulse_animation::Signal;
//!
//! // Rise exponentially, then fall back along the mirrored curve
//! let rise = Signal::exp(256);
//! let envelope = rise
//!     .to_builder()
//!     .append(&rise.to_builder().unit_inverse().build())
//!     .normalize_range(0.0, 1.0)
//!     .build();
//!
//! assert_eq!(envelope.sample(0.0), 0.0);
//! ```

use crate::values::Interpolate;
use std::sync::Arc;

/// Steepness of the exponential envelope produced by [`Signal::exp`]
const EXP_STEEPNESS: f32 = 5.0;

/// An immutable, shareable table of envelope samples
#[derive(Clone, Debug, PartialEq)]
pub struct Signal {
    samples: Arc<[f32]>,
}

impl Signal {
    /// Create a signal from raw samples
    pub fn new(samples: impl Into<Vec<f32>>) -> Self {
        Self {
            samples: samples.into().into(),
        }
    }

    /// `n` evenly spaced samples rising from 0 to 1
    pub fn linear(n: usize) -> Self {
        if n <= 1 {
            return Self::new(vec![1.0; n]);
        }
        let last = (n - 1) as f32;
        Self::new((0..n).map(|i| i as f32 / last).collect::<Vec<_>>())
    }

    /// `n` samples of a rising exponential curve `1 - e^(-kx)`, scaled so
    /// the first sample is 0 and the last is 1
    ///
    /// The curve moves fast early and eases into its final value.
    pub fn exp(n: usize) -> Self {
        if n <= 1 {
            return Self::new(vec![1.0; n]);
        }
        let last = (n - 1) as f32;
        let scale = 1.0 - (-EXP_STEEPNESS).exp();
        Self::new(
            (0..n)
                .map(|i| {
                    let x = i as f32 / last;
                    (1.0 - (-EXP_STEEPNESS * x).exp()) / scale
                })
                .collect::<Vec<_>>(),
        )
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<f32> {
        self.samples.first().copied()
    }

    pub fn last(&self) -> Option<f32> {
        self.samples.last().copied()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    /// Copy the samples into a builder for further shaping
    pub fn to_builder(&self) -> SignalBuilder {
        SignalBuilder::new(self.samples.to_vec())
    }

    /// Resample the signal at `progress` (0.0 to 1.0)
    ///
    /// Progress maps to the fractional index `progress * (len - 1)` and the
    /// two nearest samples are linearly interpolated, so the output is
    /// continuous even though the table is discrete. Progress 0 yields the
    /// first sample and progress 1 the last. Out-of-range progress is
    /// clamped and NaN is treated as 0. An empty signal samples as 0.
    pub fn sample(&self, progress: f32) -> f32 {
        let n = self.samples.len();
        match n {
            0 => 0.0,
            1 => self.samples[0],
            _ => {
                let pos = clamp_progress(progress) * (n - 1) as f32;
                let lo = (pos.floor() as usize).min(n - 1);
                let hi = (lo + 1).min(n - 1);
                let frac = pos - lo as f32;
                self.samples[lo].lerp(&self.samples[hi], frac)
            }
        }
    }

    /// Look up the sample at `progress` by truncating to the nearest lower
    /// index, without interpolating between samples
    ///
    /// Stepped output; [`Signal::sample`] is the smooth equivalent with the
    /// same endpoints.
    pub fn at_index(&self, progress: f32) -> f32 {
        let n = self.samples.len();
        if n == 0 {
            return 0.0;
        }
        let index = (clamp_progress(progress) * (n - 1) as f32) as usize;
        self.samples[index.min(n - 1)]
    }
}

impl From<Vec<f32>> for Signal {
    fn from(samples: Vec<f32>) -> Self {
        Self::new(samples)
    }
}

impl From<&[f32]> for Signal {
    fn from(samples: &[f32]) -> Self {
        Self::new(samples.to_vec())
    }
}

fn clamp_progress(progress: f32) -> f32 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

/// Mutable staging buffer used to shape a signal before freezing it
#[derive(Clone, Debug, Default)]
pub struct SignalBuilder {
    samples: Vec<f32>,
}

impl SignalBuilder {
    pub fn new(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    /// Replace every sample `x` with `1 - x`
    pub fn unit_inverse(mut self) -> Self {
        for x in &mut self.samples {
            *x = 1.0 - *x;
        }
        self
    }

    /// Reverse the sample order
    pub fn reverse(mut self) -> Self {
        self.samples.reverse();
        self
    }

    /// Append another signal's samples
    pub fn append(mut self, other: &Signal) -> Self {
        self.samples.extend_from_slice(other.as_slice());
        self
    }

    /// Affinely map the current min..max range onto `lo..hi`
    ///
    /// A flat signal has no range to stretch and maps entirely to `lo`.
    pub fn normalize_range(mut self, lo: f32, hi: f32) -> Self {
        if self.samples.is_empty() {
            return self;
        }

        let (min, max) = self
            .samples
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), &x| {
                (min.min(x), max.max(x))
            });

        let span = max - min;
        if span.abs() < f32::EPSILON {
            self.samples.iter_mut().for_each(|x| *x = lo);
            return self;
        }

        for x in &mut self.samples {
            *x = lo + (*x - min) / span * (hi - lo);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Freeze the samples into an immutable [`Signal`]
    pub fn build(self) -> Signal {
        Signal::new(self.samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_endpoints() {
        let sig = Signal::new(vec![0.2, 0.9, 0.4, 0.7]);
        assert_eq!(sig.sample(0.0), 0.2);
        assert_eq!(sig.sample(1.0), 0.7);
    }

    #[test]
    fn test_sample_interpolates_between_samples() {
        let sig = Signal::new(vec![0.0, 0.5, 1.0]);
        assert_eq!(sig.sample(0.5), 0.5);
        assert!((sig.sample(0.25) - 0.25).abs() < 1e-6);
        assert!((sig.sample(0.75) - 0.75).abs() < 1e-6);

        let sig = Signal::new(vec![0.0, 1.0]);
        assert!((sig.sample(0.3) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_sample_clamps_progress() {
        let sig = Signal::new(vec![0.1, 0.6]);
        assert_eq!(sig.sample(-1.0), 0.1);
        assert_eq!(sig.sample(2.5), 0.6);
        assert_eq!(sig.sample(f32::NAN), 0.1);
    }

    #[test]
    fn test_single_sample_is_constant() {
        let sig = Signal::new(vec![0.42]);
        assert_eq!(sig.sample(0.0), 0.42);
        assert_eq!(sig.sample(0.5), 0.42);
        assert_eq!(sig.sample(1.0), 0.42);
    }

    #[test]
    fn test_at_index_is_stepped() {
        let sig = Signal::new(vec![0.0, 0.5, 1.0]);
        assert_eq!(sig.at_index(0.0), 0.0);
        assert_eq!(sig.at_index(0.4), 0.0);
        assert_eq!(sig.at_index(0.6), 0.5);
        assert_eq!(sig.at_index(1.0), 1.0);
    }

    #[test]
    fn test_exp_is_monotone_with_unit_endpoints() {
        let sig = Signal::exp(64);
        assert_eq!(sig.len(), 64);
        assert!(sig.first().unwrap().abs() < 1e-6);
        assert!((sig.last().unwrap() - 1.0).abs() < 1e-6);
        assert!(sig.as_slice().windows(2).all(|w| w[0] <= w[1]));
        // Front-loaded: more than half the distance is covered by the midpoint
        assert!(sig.sample(0.5) > 0.5);
    }

    #[test]
    fn test_linear() {
        let sig = Signal::linear(5);
        assert_eq!(sig.as_slice(), &[0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(Signal::linear(1).as_slice(), &[1.0]);
        assert!(Signal::linear(0).is_empty());
    }

    #[test]
    fn test_unit_inverse_and_reverse() {
        let sig = SignalBuilder::new(vec![0.0, 0.25, 1.0]).unit_inverse().build();
        assert_eq!(sig.as_slice(), &[1.0, 0.75, 0.0]);

        let sig = SignalBuilder::new(vec![1.0, 2.0, 3.0]).reverse().build();
        assert_eq!(sig.as_slice(), &[3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_normalize_range() {
        let sig = SignalBuilder::new(vec![2.0, 4.0, 6.0])
            .normalize_range(0.0, 1.0)
            .build();
        assert_eq!(sig.as_slice(), &[0.0, 0.5, 1.0]);

        let flat = SignalBuilder::new(vec![3.0, 3.0])
            .normalize_range(0.25, 1.0)
            .build();
        assert_eq!(flat.as_slice(), &[0.25, 0.25]);
    }

    #[test]
    fn test_rise_and_fall_envelope() {
        let rise = Signal::exp(32);
        let envelope = rise
            .to_builder()
            .append(&rise.to_builder().unit_inverse().build())
            .normalize_range(0.0, 1.0)
            .build();

        assert_eq!(envelope.len(), 64);
        assert_eq!(envelope.sample(0.0), 0.0);
        assert!((envelope.sample(1.0)).abs() < 1e-6);
        let peak = envelope.as_slice().iter().cloned().fold(f32::MIN, f32::max);
        assert!((peak - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_clone_shares_samples() {
        let sig = Signal::linear(8);
        let other = sig.clone();
        assert!(std::ptr::eq(sig.as_slice(), other.as_slice()));
    }
}
