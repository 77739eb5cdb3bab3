//! Estimating where an interrupted sheet really is.
//!
//! When a press lands on a moving sheet, the logical offset already holds the destination of the
//! motion, while the surface is still somewhere on the way. Reading the rendered position back
//! lags by about a frame during transitions, so for those the position is projected from the
//! easing instead. Free-running animations such as the overscroll bounce are read back directly.

use std::time::Duration;

use sheet_motion_config::Speculation;

use crate::animation::CubicBezier;

/// Read-back of the offset a surface currently shows.
pub trait RenderedOffset {
    /// Returns `None` when the surface cannot tell, e.g. for an unsupported transform.
    fn read_rendered_offset(&self) -> Option<f64>;
}

/// The rendered position could not be determined.
///
/// Callers keep the last committed offset instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("could not determine the rendered position")]
pub struct UnresolvedPosition;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TransitionState {
    #[default]
    Idle,
    Active,
}

/// Follows the lifecycle notifications of the host's transitions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ActiveTransitionTracker {
    state: TransitionState,
    generation: u64,
}

/// Offset motion that a transition is currently animating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionMotion {
    pub previous: f64,
    pub current: f64,
    /// Time since `current` was committed.
    pub elapsed: Duration,
    /// Duration of the transition that animates the change.
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSpeculator {
    curve: CubicBezier,
    lookahead: f64,
}

impl ActiveTransitionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles both the "run" and "start" notifications.
    ///
    /// A transition that is already active does not start a new generation.
    pub fn transition_started(&mut self) {
        if self.state == TransitionState::Idle {
            self.state = TransitionState::Active;
            self.generation += 1;
        }
    }

    pub fn transition_ended(&mut self) {
        self.state = TransitionState::Idle;
    }

    pub fn transition_cancelled(&mut self) {
        self.state = TransitionState::Idle;
    }

    pub fn state(&self) -> TransitionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == TransitionState::Active
    }

    /// Number of transitions started so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl PositionSpeculator {
    pub fn new(curve: CubicBezier, lookahead: f64) -> Self {
        Self { curve, lookahead }
    }

    pub fn from_config(config: &Speculation) -> Self {
        Self::new(CubicBezier::from(config.reference_curve), config.lookahead)
    }

    /// Where a transition is expected to be, looking slightly ahead to make up for read-back lag.
    pub fn project(&self, motion: TransitionMotion) -> f64 {
        let progress = if motion.duration.is_zero() {
            1.
        } else {
            let x = motion.elapsed.as_secs_f64() / motion.duration.as_secs_f64() + self.lookahead;
            self.curve.y(x.clamp(0., 1.))
        };
        motion.previous + (motion.current - motion.previous) * progress
    }

    /// Best estimate of the true position of the sheet.
    pub fn speculate<S: RenderedOffset + ?Sized>(
        &self,
        tracker: &ActiveTransitionTracker,
        motion: TransitionMotion,
        surface: &S,
    ) -> Result<f64, UnresolvedPosition> {
        let position = if tracker.is_active() {
            self.project(motion)
        } else {
            surface.read_rendered_offset().ok_or(UnresolvedPosition)?
        };

        if position.is_finite() {
            Ok(position)
        } else {
            Err(UnresolvedPosition)
        }
    }
}

impl Default for PositionSpeculator {
    fn default() -> Self {
        Self::from_config(&Speculation::default())
    }
}

/// Extracts the vertical translation from a computed CSS `transform` value.
///
/// Understands `none`, `matrix()`, `matrix3d()`, `translate()`, `translateY()` and
/// `translate3d()`.
pub fn translate_y_from_css(transform: &str) -> Option<f64> {
    let transform = transform.trim();
    if transform == "none" {
        return Some(0.);
    }

    let (name, rest) = transform.split_once('(')?;
    let args = rest.strip_suffix(')')?;
    let values = args
        .split(',')
        .map(parse_length)
        .collect::<Option<Vec<_>>>()?;

    let y = match (name.trim(), values.len()) {
        ("matrix", 6) => values[5],
        ("matrix3d", 16) => values[13],
        ("translate", 1) => 0.,
        ("translate", 2) | ("translate3d", 3) => values[1],
        ("translateY", 1) => values[0],
        _ => return None,
    };

    y.is_finite().then_some(y)
}

fn parse_length(value: &str) -> Option<f64> {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value);
    number.trim().parse().ok()
}
