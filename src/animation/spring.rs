use std::time::Duration;

/// Step of the coarse scan for the settle time, in seconds.
const SETTLE_STEP: f64 = 1. / 6.;
/// Number of consecutive resting samples needed to confirm that the spring has settled.
///
/// Oscillating springs cross the resting band briefly on every swing; a single sample inside it
/// says nothing.
const SETTLE_CONFIRMATION: u32 = 16;
/// Springs that have not settled by then are reported as settled at this point.
const SETTLE_LIMIT: f64 = 60.;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringParams {
    pub mass: f64,
    pub stiffness: f64,
    pub damping: f64,
    /// Resting band, relative to the travelled distance.
    pub epsilon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spring {
    pub from: f64,
    pub to: f64,
    pub initial_velocity: f64,
    pub params: SpringParams,
}

/// A spring travelling from 0 to 1, with its settle time solved once.
///
/// This is the form consumed by timing curves: `evaluate` returns the normalized displacement,
/// which may overshoot 1 on the way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringSolution {
    spring: Spring,
    settle_duration: Duration,
}

impl SpringParams {
    pub fn new(mass: f64, stiffness: f64, damping: f64, epsilon: f64) -> Self {
        Self {
            mass: mass.max(f64::EPSILON),
            stiffness: stiffness.max(f64::EPSILON),
            damping: damping.max(0.),
            epsilon: epsilon.max(0.),
        }
    }

    /// Creates unit-mass parameters from a damping ratio (1 is critically damped).
    pub fn with_damping_ratio(damping_ratio: f64, stiffness: f64, epsilon: f64) -> Self {
        let mass = 1.;
        let stiffness = stiffness.max(f64::EPSILON);
        let critical_damping = 2. * (mass * stiffness).sqrt();
        Self::new(mass, stiffness, damping_ratio.max(0.) * critical_damping, epsilon)
    }

    /// Undamped angular frequency, `ω0 = sqrt(k / m)`.
    pub fn natural_frequency(&self) -> f64 {
        (self.stiffness / self.mass).sqrt()
    }

    /// `ζ = c / (2 sqrt(k m))`; below 1 the spring oscillates.
    pub fn damping_ratio(&self) -> f64 {
        self.damping / (2. * (self.stiffness * self.mass).sqrt())
    }
}

impl From<sheet_motion_config::SpringParams> for SpringParams {
    fn from(p: sheet_motion_config::SpringParams) -> Self {
        Self::new(p.mass, p.stiffness, p.damping, p.epsilon)
    }
}

impl Spring {
    pub fn value_at(&self, t: Duration) -> f64 {
        self.oscillate(t.as_secs_f64())
    }

    /// Time after which the spring stays within its resting band.
    ///
    /// The spring is sampled every sixth of a second; the first sample of a run of 16 resting
    /// samples is the settle time.
    pub fn duration(&self) -> Duration {
        let distance = (self.to - self.from).abs();
        if distance <= f64::EPSILON {
            return Duration::ZERO;
        }

        let beta = self.params.damping / (2. * self.params.mass);
        if beta <= f64::EPSILON {
            warn!("spring {:?} is undamped and never settles", self.params);
            return Duration::from_secs_f64(SETTLE_LIMIT);
        }

        let threshold = self.params.epsilon * distance;
        let mut run_start = None;
        let mut run = 0;
        let mut step = 0u32;
        loop {
            let t = f64::from(step) * SETTLE_STEP;
            if t > SETTLE_LIMIT {
                warn!("spring {:?} did not settle within {SETTLE_LIMIT}s", self.params);
                return Duration::from_secs_f64(SETTLE_LIMIT);
            }

            if (self.to - self.oscillate(t)).abs() < threshold {
                let start = *run_start.get_or_insert(t);
                run += 1;
                if run == SETTLE_CONFIRMATION {
                    return Duration::from_secs_f64(start);
                }
            } else {
                run_start = None;
                run = 0;
            }

            step += 1;
        }
    }

    /// Position of the spring `t` seconds after the start.
    fn oscillate(&self, t: f64) -> f64 {
        let b = self.params.damping;
        let m = self.params.mass;
        let k = self.params.stiffness;
        let v0 = self.initial_velocity;

        let beta = b / (2. * m);
        let omega0 = (k / m).sqrt();

        let x0 = self.from - self.to;
        let envelope = (-beta * t).exp();

        // Critically damped, under-damped and over-damped solutions of m x'' + b x' + k x = 0.
        if (beta - omega0).abs() <= f64::from(f32::EPSILON) {
            self.to + envelope * (x0 + (beta * x0 + v0) * t)
        } else if beta < omega0 {
            let omega1 = ((omega0 * omega0) - (beta * beta)).sqrt();
            self.to
                + envelope
                    * (x0 * (omega1 * t).cos() + ((beta * x0 + v0) / omega1) * (omega1 * t).sin())
        } else {
            let omega2 = ((beta * beta) - (omega0 * omega0)).sqrt();
            self.to
                + envelope
                    * (x0 * (omega2 * t).cosh() + ((beta * x0 + v0) / omega2) * (omega2 * t).sinh())
        }
    }
}

impl SpringSolution {
    /// Solves a spring travelling from 0 to 1 with the given initial velocity.
    ///
    /// The velocity is in normalized units per second; positive values point toward 1.
    pub fn new(params: SpringParams, initial_velocity: f64) -> Self {
        let _span = tracy_client::span!("SpringSolution::new");

        let spring = Spring {
            from: 0.,
            to: 1.,
            initial_velocity,
            params,
        };
        let settle_duration = spring.duration();
        trace!(
            "solved spring ζ={:.3} ω0={:.3}: settles after {settle_duration:?}",
            params.damping_ratio(),
            params.natural_frequency(),
        );

        Self {
            spring,
            settle_duration,
        }
    }

    pub fn params(&self) -> SpringParams {
        self.spring.params
    }

    pub fn initial_velocity(&self) -> f64 {
        self.spring.initial_velocity
    }

    pub fn settle_duration(&self) -> Duration {
        self.settle_duration
    }

    /// Normalized displacement `t` seconds after the start.
    pub fn evaluate(&self, t: f64) -> f64 {
        self.spring.oscillate(t)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    use super::*;

    fn params(mass: f64, stiffness: f64, damping: f64) -> SpringParams {
        SpringParams::new(mass, stiffness, damping, 0.1)
    }

    #[test]
    fn overdamped_spring_equal_from_to_nan() {
        let spring = Spring {
            from: 0.,
            to: 0.,
            initial_velocity: 0.,
            params: SpringParams::with_damping_ratio(1.15, 850., 0.0001),
        };
        assert_eq!(spring.duration(), Duration::ZERO);
        assert!(spring.value_at(Duration::ZERO).is_finite());
    }

    #[test]
    fn undamped_spring_reports_the_settle_limit() {
        let spring = Spring {
            from: 0.,
            to: 1.,
            initial_velocity: 0.,
            params: params(1., 170., 0.),
        };
        assert_eq!(spring.duration(), Duration::from_secs(60));

        let solution = SpringSolution::new(params(1., 170., 0.), 0.);
        assert_eq!(solution.settle_duration(), Duration::from_secs(60));
    }

    #[test]
    fn damping_ratio_and_frequency() {
        let p = params(1., 169., 26.);
        assert_abs_diff_eq!(p.natural_frequency(), 13.);
        assert_abs_diff_eq!(p.damping_ratio(), 1.);

        let p = SpringParams::with_damping_ratio(0.5, 400., 0.1);
        assert_abs_diff_eq!(p.damping_ratio(), 0.5);
        assert_abs_diff_eq!(p.damping, 20.);
    }

    #[test]
    fn settle_time_is_on_the_coarse_grid() {
        let solution = SpringSolution::new(params(1., 170., 26.), 0.);
        let settle = solution.settle_duration().as_secs_f64();
        assert!(settle > 0.);
        let steps = settle / SETTLE_STEP;
        assert_abs_diff_eq!(steps, steps.round(), epsilon = 1e-9);
    }

    #[test]
    fn underdamped_overshoots() {
        let solution = SpringSolution::new(params(1., 300., 8.), 0.);
        let peak = (1..200)
            .map(|i| solution.evaluate(f64::from(i) / 100.))
            .fold(f64::MIN, f64::max);
        assert!(peak > 1.);
    }

    #[test]
    fn initial_velocity_drives_first_motion() {
        let solution = SpringSolution::new(params(1., 130., 26.), -40.);
        assert!(solution.evaluate(0.01) < 0.);
        assert_eq!(solution.initial_velocity(), -40.);
    }

    proptest! {
        #[test]
        fn underdamped_starts_at_zero_and_settles(
            mass in 0.5f64..3.,
            stiffness in 50f64..500.,
            ratio in 0.1f64..0.95,
        ) {
            let damping = ratio * 2. * (stiffness * mass).sqrt();
            let p = params(mass, stiffness, damping);
            prop_assume!(p.damping_ratio() < 1.);

            let solution = SpringSolution::new(p, 0.);
            prop_assert!(solution.evaluate(0.).abs() < 1e-9);

            let settle = solution.settle_duration().as_secs_f64();
            prop_assert!(settle < SETTLE_LIMIT);
            prop_assert!((1. - solution.evaluate(settle)).abs() < p.epsilon);
        }

        #[test]
        fn non_oscillating_is_monotonic(
            mass in 0.5f64..3.,
            stiffness in 50f64..500.,
            ratio in 1f64..4.,
        ) {
            let damping = ratio * 2. * (stiffness * mass).sqrt();
            let solution = SpringSolution::new(params(mass, stiffness, damping), 0.);

            let mut previous = solution.evaluate(0.);
            for i in 1..400 {
                let value = solution.evaluate(f64::from(i) / 100.);
                prop_assert!(value >= previous - 1e-9);
                previous = value;
            }
        }
    }
}
