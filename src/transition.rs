use std::fmt;
use std::time::Duration;

use sheet_motion_config::{Animation, AnimationCurve, AnimationKind, Transitions};

use crate::animation::{SpringParams, SpringSolution, TimingCurve, DEFAULT_STEP_COUNT};

/// How the host should animate the next offset change.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TransitionMode {
    /// Apply immediately, without a transition.
    Instant,
    Entering,
    #[default]
    Resting,
    Exiting,
}

/// A transition rendered as the value of the CSS `transition` property.
#[derive(Debug, Clone, PartialEq)]
pub struct CssTransition {
    pub property: &'static str,
    pub duration: Duration,
    pub timing_function: String,
}

impl TransitionMode {
    /// Configured animation for this mode, or `None` if changes apply instantly.
    pub fn animation(self, transitions: &Transitions) -> Option<Animation> {
        let animation = match self {
            TransitionMode::Instant => return None,
            TransitionMode::Entering => transitions.entering,
            TransitionMode::Resting => transitions.resting,
            TransitionMode::Exiting => transitions.exiting,
        };
        (!animation.off).then_some(animation)
    }

    pub fn duration(self, transitions: &Transitions) -> Duration {
        self.animation(transitions)
            .map_or(Duration::ZERO, animation_duration)
    }

    pub fn css(self, transitions: &Transitions) -> Option<CssTransition> {
        let animation = self.animation(transitions)?;
        Some(CssTransition {
            property: "all",
            duration: animation_duration(animation),
            timing_function: timing_function(animation),
        })
    }
}

/// Duration of an animation as the host will play it.
///
/// Springs are played as a timing curve stretched over their settle duration.
pub fn animation_duration(animation: Animation) -> Duration {
    match animation.kind {
        AnimationKind::Easing(p) => Duration::from_millis(u64::from(p.duration_ms)),
        AnimationKind::Spring(p) => SpringSolution::new(SpringParams::from(p), 0.).settle_duration(),
    }
}

/// CSS easing function equivalent to an animation.
pub fn timing_function(animation: Animation) -> String {
    match animation.kind {
        AnimationKind::Easing(p) => curve_timing_function(p.curve),
        AnimationKind::Spring(p) => {
            let solution = SpringSolution::new(SpringParams::from(p), 0.);
            TimingCurve::from_spring(&solution, DEFAULT_STEP_COUNT).to_string()
        }
    }
}

fn curve_timing_function(curve: AnimationCurve) -> String {
    // Standard cubic approximations of the polynomial ease-out curves.
    let [x1, y1, x2, y2] = match curve {
        AnimationCurve::Linear => return String::from("linear"),
        AnimationCurve::EaseOutQuad => [0.5, 1., 0.89, 1.],
        AnimationCurve::EaseOutCubic => [0.33, 1., 0.68, 1.],
        AnimationCurve::EaseOutQuint => [0.22, 1., 0.36, 1.],
        AnimationCurve::EaseOutExpo => [0.16, 1., 0.3, 1.],
        AnimationCurve::CubicBezier(x1, y1, x2, y2) => [x1, y1, x2, y2],
    };
    format!("cubic-bezier({x1}, {y1}, {x2}, {y2})")
}

impl fmt::Display for CssTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = (self.duration.as_secs_f64() * 1000.).round() / 1000.;
        write!(f, "{} {secs}s {}", self.property, self.timing_function)
    }
}

/// Formats the CSS `transition` value for a mode, `none` when instant.
pub fn css_transition(mode: TransitionMode, transitions: &Transitions) -> String {
    mode.css(transitions)
        .map_or_else(|| String::from("none"), |css| css.to_string())
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use sheet_motion_config::{EasingParams, SpringParams as SpringConfig};

    use super::*;

    #[test]
    fn default_mapping() {
        let transitions = Transitions::default();
        assert_snapshot!(
            css_transition(TransitionMode::Resting, &transitions),
            @"all 0.5s cubic-bezier(0.22, 1, 0.36, 1)"
        );
        assert_snapshot!(
            css_transition(TransitionMode::Entering, &transitions),
            @"all 0.5s cubic-bezier(0.32, 0.72, 0, 1)"
        );
        assert_snapshot!(
            css_transition(TransitionMode::Exiting, &transitions),
            @"all 0.4s cubic-bezier(0.25, 1, 0.5, 1)"
        );
        assert_snapshot!(css_transition(TransitionMode::Instant, &transitions), @"none");
    }

    #[test]
    fn durations() {
        let transitions = Transitions::default();
        assert_eq!(
            TransitionMode::Resting.duration(&transitions),
            Duration::from_millis(500)
        );
        assert_eq!(TransitionMode::Instant.duration(&transitions), Duration::ZERO);
    }

    #[test]
    fn disabled_animation_is_instant() {
        let mut transitions = Transitions::default();
        transitions.exiting.off = true;
        assert_eq!(TransitionMode::Exiting.animation(&transitions), None);
        assert_eq!(TransitionMode::Exiting.duration(&transitions), Duration::ZERO);
    }

    #[test]
    fn named_curves() {
        let easing = |curve| Animation::easing(250, curve);
        assert_snapshot!(timing_function(easing(AnimationCurve::Linear)), @"linear");
        assert_snapshot!(
            timing_function(easing(AnimationCurve::EaseOutQuad)),
            @"cubic-bezier(0.5, 1, 0.89, 1)"
        );
        assert_snapshot!(
            timing_function(easing(AnimationCurve::EaseOutExpo)),
            @"cubic-bezier(0.16, 1, 0.3, 1)"
        );
    }

    #[test]
    fn spring_transition_uses_linear_curve() {
        let spring = Animation::spring(SpringConfig::default());
        let function = timing_function(spring);
        assert!(function.starts_with("linear(0 0%, "));
        assert!(function.ends_with(", 1 100%)"));

        let duration = animation_duration(spring);
        assert!(duration > Duration::ZERO);
        assert_eq!(
            duration,
            SpringSolution::new(SpringParams::from(SpringConfig::default()), 0.).settle_duration()
        );

        let easing = Animation {
            off: false,
            kind: AnimationKind::Easing(EasingParams {
                duration_ms: 120,
                curve: AnimationCurve::Linear,
            }),
        };
        assert_snapshot!(
            TransitionMode::Resting
                .css(&Transitions {
                    resting: easing,
                    ..Transitions::default()
                })
                .unwrap(),
            @"all 0.12s linear"
        );
    }
}
