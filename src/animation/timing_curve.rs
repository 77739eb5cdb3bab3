use std::fmt;

use super::spring::SpringSolution;

/// Number of points sampled from a spring unless asked otherwise.
pub const DEFAULT_STEP_COUNT: usize = 24;

/// A piecewise linear easing, in the shape of the CSS `linear()` function.
///
/// Values may leave `[0, 1]` when the source overshoots; progress is always increasing and ends
/// at exactly `(1, 1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingCurve {
    steps: Vec<CurveStep>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveStep {
    pub value: f64,
    /// Fraction of the duration, in `[0, 1]`.
    pub progress: f64,
}

impl TimingCurve {
    /// Samples a spring into a curve spanning its settle duration.
    ///
    /// `step_count` is clamped to at least 2: a start and the forced final step.
    pub fn from_spring(solution: &SpringSolution, step_count: usize) -> Self {
        let _span = tracy_client::span!("TimingCurve::from_spring");

        let step_count = step_count.max(2);
        let settle = solution.settle_duration().as_secs_f64();
        let last = (step_count - 1) as f64;

        let mut steps: Vec<_> = (0..step_count - 1)
            .map(|i| {
                let progress = i as f64 / last;
                CurveStep {
                    value: solution.evaluate(progress * settle),
                    progress,
                }
            })
            .collect();

        // The spring only comes within epsilon of the target; the curve must land on it.
        steps.push(CurveStep {
            value: 1.,
            progress: 1.,
        });

        Self { steps }
    }

    pub fn steps(&self) -> &[CurveStep] {
        &self.steps
    }

    /// Value at `progress`, interpolating linearly between steps.
    pub fn sample(&self, progress: f64) -> f64 {
        let Some(first) = self.steps.first() else {
            return progress;
        };
        if progress <= first.progress {
            return first.value;
        }

        for pair in self.steps.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if progress <= b.progress {
                let span = b.progress - a.progress;
                if span <= f64::EPSILON {
                    return b.value;
                }
                let t = (progress - a.progress) / span;
                return a.value + (b.value - a.value) * t;
            }
        }

        self.steps.last().map_or(progress, |step| step.value)
    }
}

impl fmt::Display for TimingCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("linear(")?;
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let value = round(step.value, 4);
            let percent = round(step.progress * 100., 2);
            write!(f, "{value} {percent}%")?;
        }
        f.write_str(")")
    }
}

fn round(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    let rounded = (value * scale).round() / scale;
    // Avoid printing "-0".
    if rounded == 0. {
        0.
    } else {
        rounded
    }
}
