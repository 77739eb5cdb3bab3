use std::time::Duration;

use keyframe::functions::{EaseOutCubic, EaseOutQuad, EaseOutQuint};
use keyframe::EasingFunction;

mod bezier;
pub use bezier::CubicBezier;

mod spring;
pub use spring::{Spring, SpringParams, SpringSolution};

mod clock;
pub use clock::Clock;

mod timing_curve;
pub use timing_curve::{CurveStep, TimingCurve, DEFAULT_STEP_COUNT};

#[derive(Debug, Clone)]
pub struct Animation {
    from: f64,
    to: f64,
    initial_velocity: f64,
    is_off: bool,
    duration: Duration,
    start_time: Duration,
    clock: Clock,
    kind: Kind,
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Easing {
        curve: Curve,
    },
    Spring(Spring),
    Deceleration {
        initial_velocity: f64,
        deceleration_rate: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Curve {
    Linear,
    EaseOutQuad,
    EaseOutCubic,
    EaseOutQuint,
    EaseOutExpo,
    CubicBezier(CubicBezier),
}

impl Animation {
    pub fn new(
        clock: Clock,
        from: f64,
        to: f64,
        initial_velocity: f64,
        config: sheet_motion_config::Animation,
    ) -> Self {
        // Scale the velocity by rate to keep the flick speed consistent under slowdown.
        let initial_velocity = initial_velocity / clock.rate().max(0.001);

        if config.off {
            let mut rv = Self::ease(clock, from, to, initial_velocity, 0, Curve::Linear);
            rv.is_off = true;
            return rv;
        }

        match config.kind {
            sheet_motion_config::AnimationKind::Spring(p) => {
                let spring = Spring {
                    from,
                    to,
                    initial_velocity,
                    params: SpringParams::from(p),
                };
                Self::spring(clock, spring)
            }
            sheet_motion_config::AnimationKind::Easing(p) => Self::ease(
                clock,
                from,
                to,
                initial_velocity,
                u64::from(p.duration_ms),
                Curve::from(p.curve),
            ),
        }
    }

    pub fn ease(
        clock: Clock,
        from: f64,
        to: f64,
        initial_velocity: f64,
        duration_ms: u64,
        curve: Curve,
    ) -> Self {
        Self {
            from,
            to,
            initial_velocity,
            is_off: false,
            duration: Duration::from_millis(duration_ms),
            start_time: clock.now(),
            clock,
            kind: Kind::Easing { curve },
        }
    }

    pub fn spring(clock: Clock, spring: Spring) -> Self {
        let _span = tracy_client::span!("Animation::spring");

        let duration = spring.duration();
        Self {
            from: spring.from,
            to: spring.to,
            initial_velocity: spring.initial_velocity,
            is_off: false,
            duration,
            start_time: clock.now(),
            clock,
            kind: Kind::Spring(spring),
        }
    }

    /// Exponentially decaying motion, as used for scroll momentum.
    ///
    /// `initial_velocity` is in units per second and `deceleration_rate` is the fraction of the
    /// velocity kept every millisecond. The animation ends once less than `threshold` units of
    /// travel remain.
    pub fn decelerate(
        clock: Clock,
        from: f64,
        initial_velocity: f64,
        deceleration_rate: f64,
        threshold: f64,
    ) -> Self {
        let deceleration_rate = deceleration_rate.clamp(f64::EPSILON, 1. - f64::EPSILON);
        let coeff = 1000. * deceleration_rate.ln();

        let duration_s = if initial_velocity == 0. {
            0.
        } else {
            (-coeff * threshold / initial_velocity.abs()).ln() / coeff
        };

        // Too slow to travel past the threshold at all.
        let (duration, to) = if duration_s.is_finite() && duration_s > 0. {
            (
                Duration::from_secs_f64(duration_s),
                from - initial_velocity / coeff,
            )
        } else {
            (Duration::ZERO, from)
        };

        Self {
            from,
            to,
            initial_velocity,
            is_off: false,
            duration,
            start_time: clock.now(),
            clock,
            kind: Kind::Deceleration {
                initial_velocity,
                deceleration_rate,
            },
        }
    }

    pub fn is_done(&self) -> bool {
        if self.clock.should_complete_instantly() {
            return true;
        }

        self.clock.now() >= self.end_time()
    }

    pub fn value_at(&self, at: Duration) -> f64 {
        if self.end_time() <= at {
            return self.to;
        } else if at <= self.start_time {
            return self.from;
        }

        if self.clock.should_complete_instantly() {
            return self.to;
        }

        let passed = at.saturating_sub(self.start_time);

        match self.kind {
            Kind::Easing { curve } => {
                let passed = passed.as_secs_f64();
                let total = self.duration.as_secs_f64();
                let x = (passed / total).clamp(0., 1.);
                curve.y(x) * (self.to - self.from) + self.from
            }
            Kind::Spring(spring) => {
                let value = spring.value_at(passed);

                // Protect against numerical instability.
                let range = (self.to - self.from) * 10.;
                let a = self.from - range;
                let b = self.to + range;
                if self.from <= self.to {
                    value.clamp(a, b)
                } else {
                    value.clamp(b, a)
                }
            }
            Kind::Deceleration {
                initial_velocity,
                deceleration_rate,
            } => {
                let passed = passed.as_secs_f64();
                let coeff = 1000. * deceleration_rate.ln();
                self.from + (deceleration_rate.powf(1000. * passed) - 1.) / coeff * initial_velocity
            }
        }
    }

    pub fn value(&self) -> f64 {
        self.value_at(self.clock.now())
    }

    pub fn is_off(&self) -> bool {
        self.is_off
    }

    pub fn to(&self) -> f64 {
        self.to
    }

    pub fn from(&self) -> f64 {
        self.from
    }

    pub fn initial_velocity(&self) -> f64 {
        self.initial_velocity
    }

    pub fn start_time(&self) -> Duration {
        self.start_time
    }

    pub fn end_time(&self) -> Duration {
        self.start_time.saturating_add(self.duration)
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Curve {
    pub fn y(self, x: f64) -> f64 {
        match self {
            Curve::Linear => x,
            Curve::EaseOutQuad => EaseOutQuad.y(x),
            Curve::EaseOutCubic => EaseOutCubic.y(x),
            Curve::EaseOutQuint => EaseOutQuint.y(x),
            Curve::EaseOutExpo => 1. - 2f64.powf(-10. * x),
            Curve::CubicBezier(bezier) => bezier.y(x),
        }
    }
}

impl From<sheet_motion_config::AnimationCurve> for Curve {
    fn from(value: sheet_motion_config::AnimationCurve) -> Self {
        use sheet_motion_config::AnimationCurve as C;

        match value {
            C::Linear => Curve::Linear,
            C::EaseOutQuad => Curve::EaseOutQuad,
            C::EaseOutCubic => Curve::EaseOutCubic,
            C::EaseOutQuint => Curve::EaseOutQuint,
            C::EaseOutExpo => Curve::EaseOutExpo,
            C::CubicBezier(x1, y1, x2, y2) => Curve::CubicBezier(CubicBezier::new(x1, y1, x2, y2)),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use sheet_motion_config::AnimationCurve;

    use super::*;

    #[test]
    fn easing_progresses_with_clock() {
        let mut clock = Clock::with_time(Duration::ZERO);
        let config = sheet_motion_config::Animation::easing(100, AnimationCurve::Linear);
        let anim = Animation::new(clock.clone(), 0., 100., 0., config);

        assert_eq!(anim.value(), 0.);
        clock.set_unadjusted(Duration::from_millis(25));
        assert_abs_diff_eq!(anim.value(), 25.);
        assert!(!anim.is_done());

        clock.set_unadjusted(Duration::from_millis(100));
        assert_eq!(anim.value(), 100.);
        assert!(anim.is_done());
    }

    #[test]
    fn off_animation_is_instant() {
        let clock = Clock::with_time(Duration::ZERO);
        let mut config = sheet_motion_config::Animation::easing(500, AnimationCurve::EaseOutQuad);
        config.off = true;
        let anim = Animation::new(clock, 10., 20., 0., config);
        assert!(anim.is_off());
        assert!(anim.is_done());
        assert_eq!(anim.value(), 20.);
    }

    #[test]
    fn spring_settles_at_target() {
        let mut clock = Clock::with_time(Duration::ZERO);
        let config = sheet_motion_config::Animation::spring(Default::default());
        let anim = Animation::new(clock.clone(), 0., 300., 0., config);
        assert!(anim.duration() > Duration::ZERO);

        clock.set_unadjusted(anim.end_time());
        assert_eq!(anim.value(), 300.);
    }

    #[test]
    fn deceleration_travels_toward_velocity() {
        let mut clock = Clock::with_time(Duration::ZERO);
        let anim = Animation::decelerate(clock.clone(), 0., 1000., 0.997, 0.1);
        assert!(anim.to() > 0.);

        clock.set_unadjusted(Duration::from_millis(50));
        let early = anim.value();
        assert!(early > 0. && early < anim.to());

        clock.set_unadjusted(anim.end_time());
        assert_abs_diff_eq!(anim.value(), anim.to());
    }

    #[test]
    fn slow_deceleration_is_done_immediately() {
        let clock = Clock::with_time(Duration::ZERO);
        let anim = Animation::decelerate(clock, 50., 0.01, 0.997, 0.1);
        assert!(anim.is_done());
        assert_eq!(anim.to(), 50.);

        let anim = Animation::decelerate(Clock::with_time(Duration::ZERO), 50., 0., 0.997, 0.1);
        assert!(anim.is_done());
    }

    #[test]
    fn never_settling_spring_runs_for_the_settle_limit() {
        let clock = Clock::with_time(Duration::from_secs(5));
        let spring = Spring {
            from: 0.,
            to: 1.,
            initial_velocity: 0.,
            params: SpringParams::new(1., 100., 0., 0.1),
        };
        let anim = Animation::spring(clock, spring);
        assert_eq!(anim.end_time(), Duration::from_secs(65));
        assert!(!anim.is_done());
    }

    #[test]
    fn curves_hit_endpoints() {
        let curves = [
            Curve::Linear,
            Curve::EaseOutQuad,
            Curve::EaseOutCubic,
            Curve::EaseOutQuint,
            Curve::CubicBezier(CubicBezier::new(0.22, 1., 0.36, 1.)),
        ];
        for curve in curves {
            assert_abs_diff_eq!(curve.y(0.), 0.);
            assert_abs_diff_eq!(curve.y(1.), 1.);
        }
    }
}
