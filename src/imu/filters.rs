//! Signal smoothing filters shared by the prediction models.

use nalgebra::SVector;

/// First-order low-pass filter over an N-dimensional signal.
///
/// `y = gain * x + (1 - gain) * y_prev`; the first sample initializes the
/// state.
#[derive(Debug, Clone)]
pub struct LowPassFilter<const N: usize> {
    gain: f64,
    state: Option<SVector<f64, N>>,
}

impl<const N: usize> LowPassFilter<N> {
    pub fn new(gain: f64) -> Self {
        Self { gain, state: None }
    }

    pub fn apply(&mut self, input: &SVector<f64, N>) -> SVector<f64, N> {
        let out = match self.state {
            Some(prev) => self.gain * input + (1.0 - self.gain) * prev,
            None => *input,
        };
        self.state = Some(out);
        out
    }

    pub fn reset(&mut self) {
        self.state = None;
    }
}
