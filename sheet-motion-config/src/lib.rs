//! Configuration for the sheet motion engine.
//!
//! The config is a JSON document where every section is optional; missing fields fall back to
//! the defaults that the engine was tuned with.

#[macro_use]
extern crate tracing;

use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context as _;
use serde::Deserialize;

mod animation;
mod snap_point;

pub use animation::{Animation, AnimationCurve, AnimationKind, EasingParams, SpringParams};
pub use snap_point::SnapPoint;

/// Errors in user supplied configuration.
///
/// These are not recoverable: they are surfaced as soon as the offending value is parsed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("cannot recognize the unit of snap point {0:?}, use a raw fraction, `px` or `%`")]
    UnknownUnit(String),
    #[error("snap point {0:?} does not contain a valid number")]
    InvalidNumber(String),
    #[error("at least one snap point is required")]
    NoSnapPoints,
    #[error("initial index {index} is out of bounds for {len} snap points")]
    InitialIndexOutOfBounds { index: usize, len: usize },
    #[error("{name} must be a finite non-negative number, got {value}")]
    InvalidCoefficient { name: &'static str, value: f64 },
    #[error("{name} spring must have a positive {field}, got {value}")]
    InvalidSpring {
        name: &'static str,
        field: &'static str,
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Config {
    pub sheet: Sheet,
    pub transitions: Transitions,
    /// Spring used for the overscroll bounce when content scroll hits the top edge.
    pub bounce: SpringParams,
    pub scroll: Scroll,
    pub speculation: Speculation,
    /// Slows down all animations by this factor, for debugging.
    pub slowdown: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Sheet {
    /// Fraction of the drag distance taken away past the resistance edge.
    pub resistance: f64,
    pub resistance_policy: ResistancePolicy,
    pub snap_points: Vec<SnapPoint>,
    pub initial_index: usize,
    /// Velocity (in units per sample) below which a release counts as stationary.
    pub flick_threshold: f64,
}

/// Where the elastic drag resistance applies.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResistancePolicy {
    /// Only when resting at the most closed snap point and dragging further closed.
    #[default]
    ClosedEdge,
    /// Also when resting at the most open snap point and dragging further open.
    BothEdges,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Transitions {
    pub resting: Animation,
    pub entering: Animation,
    pub exiting: Animation,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Scroll {
    /// Quiet period after the last scroll event before scroll and offset are reconciled.
    pub compensation_debounce_ms: u32,
    /// Per-millisecond velocity decay of the scroll momentum.
    pub deceleration_rate: f64,
    /// Velocity below which the momentum stops.
    pub stop_threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Speculation {
    /// Progress added on top of the elapsed time to compensate for lagging read-back.
    pub lookahead: f64,
    /// Bézier control points approximating the resting transition.
    pub reference_curve: [f64; 4],
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sheet: Sheet::default(),
            transitions: Transitions::default(),
            bounce: SpringParams {
                stiffness: 130.,
                ..SpringParams::default()
            },
            scroll: Scroll::default(),
            speculation: Speculation::default(),
            slowdown: 1.,
        }
    }
}

impl Default for Sheet {
    fn default() -> Self {
        Self {
            resistance: 0.6,
            resistance_policy: ResistancePolicy::default(),
            snap_points: vec![SnapPoint::Fraction(1.)],
            initial_index: 0,
            flick_threshold: 2.,
        }
    }
}

impl Default for Transitions {
    fn default() -> Self {
        Self {
            // Ease-out-quint is the closest cubic to the spring the sheet was designed with.
            resting: Animation::easing(500, AnimationCurve::CubicBezier(0.22, 1., 0.36, 1.)),
            entering: Animation::easing(500, AnimationCurve::CubicBezier(0.32, 0.72, 0., 1.)),
            exiting: Animation::easing(400, AnimationCurve::CubicBezier(0.25, 1., 0.5, 1.)),
        }
    }
}

impl Default for Scroll {
    fn default() -> Self {
        Self {
            compensation_debounce_ms: 100,
            deceleration_rate: 0.997,
            stop_threshold: 0.1,
        }
    }
}

impl Default for Speculation {
    fn default() -> Self {
        Self {
            lookahead: 0.18,
            reference_curve: [0.35, 0.79, 0.23, 1.],
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("error reading {}", path.display()))?;

        let config = contents
            .parse::<Self>()
            .with_context(|| format!("error parsing {}", path.display()))?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let sheet = &self.sheet;
        if sheet.snap_points.is_empty() {
            return Err(ConfigurationError::NoSnapPoints);
        }
        if sheet.initial_index >= sheet.snap_points.len() {
            return Err(ConfigurationError::InitialIndexOutOfBounds {
                index: sheet.initial_index,
                len: sheet.snap_points.len(),
            });
        }

        let coefficients = [
            ("resistance", sheet.resistance),
            ("flick-threshold", sheet.flick_threshold),
            ("lookahead", self.speculation.lookahead),
            ("stop-threshold", self.scroll.stop_threshold),
            ("slowdown", self.slowdown),
        ];
        for (name, value) in coefficients {
            if !value.is_finite() || value < 0. {
                return Err(ConfigurationError::InvalidCoefficient { name, value });
            }
        }

        let transitions = &self.transitions;
        let springs = [
            ("bounce", Some(self.bounce)),
            ("resting", transitions.resting.spring_params()),
            ("entering", transitions.entering.spring_params()),
            ("exiting", transitions.exiting.spring_params()),
        ];
        for (name, params) in springs {
            if let Some(params) = params {
                params.validate(name)?;
            }
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
}
