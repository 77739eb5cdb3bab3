use arrayvec::ArrayVec;

/// Number of samples kept by [`MovementTracker`].
pub const CAPACITY: usize = 3;
/// Window used when no smoothing is needed.
pub const DEFAULT_WINDOW: usize = 2;
/// Window used to decide where a released gesture goes.
pub const SMOOTHED_WINDOW: usize = 3;

/// Bounded history of a value sampled once per input event.
///
/// Velocities are in units per sample.
#[derive(Debug, Default, Clone)]
pub struct MovementTracker {
    samples: ArrayVec<f64, CAPACITY>,
}

impl MovementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a sample, evicting the oldest one when full.
    pub fn track(&mut self, sample: f64) {
        if self.samples.is_full() {
            self.samples.remove(0);
        }
        self.samples.push(sample);
    }

    /// Mean delta between consecutive samples among the last `window` ones.
    ///
    /// Fewer than three samples are not enough to tell a flick from noise, and give 0.
    pub fn calculate_velocity(&self, window: usize) -> f64 {
        let len = self.samples.len();
        if len < 3 {
            return 0.;
        }

        let count = window.min(len);
        if count < 2 {
            return 0.;
        }

        let recent = &self.samples[len - count..];
        let sum: f64 = recent.windows(2).map(|pair| pair[1] - pair[0]).sum();
        sum / (count - 1) as f64
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }
}
