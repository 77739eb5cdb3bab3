use serde::Deserialize;

use crate::ConfigurationError;

/// A transition as the host should apply it.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Animation {
    #[serde(default)]
    pub off: bool,
    #[serde(flatten)]
    pub kind: AnimationKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnimationKind {
    Easing(EasingParams),
    Spring(SpringParams),
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct EasingParams {
    pub duration_ms: u32,
    pub curve: AnimationCurve,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnimationCurve {
    Linear,
    EaseOutQuad,
    EaseOutCubic,
    EaseOutQuint,
    EaseOutExpo,
    CubicBezier(f64, f64, f64, f64),
}

/// Physical parameters of a damped spring.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct SpringParams {
    pub mass: f64,
    pub stiffness: f64,
    pub damping: f64,
    /// Distance from the target, relative to the travelled distance, at which the spring
    /// counts as settled.
    pub epsilon: f64,
}

impl Default for SpringParams {
    fn default() -> Self {
        Self {
            mass: 1.,
            stiffness: 170.,
            damping: 26.,
            epsilon: 0.1,
        }
    }
}

impl Animation {
    pub const fn easing(duration_ms: u32, curve: AnimationCurve) -> Self {
        Self {
            off: false,
            kind: AnimationKind::Easing(EasingParams { duration_ms, curve }),
        }
    }

    pub const fn spring(params: SpringParams) -> Self {
        Self {
            off: false,
            kind: AnimationKind::Spring(params),
        }
    }

    /// Fixed duration of an easing animation.
    ///
    /// Springs have no configured duration; it follows from their parameters.
    pub fn duration_ms(&self) -> Option<u32> {
        match self.kind {
            AnimationKind::Easing(p) => Some(p.duration_ms),
            AnimationKind::Spring(_) => None,
        }
    }

    pub fn spring_params(&self) -> Option<SpringParams> {
        match self.kind {
            AnimationKind::Easing(_) => None,
            AnimationKind::Spring(p) => Some(p),
        }
    }
}

impl SpringParams {
    /// Checks that the spring comes to rest; `name` identifies it in the error.
    pub fn validate(&self, name: &'static str) -> Result<(), ConfigurationError> {
        let fields = [
            ("mass", self.mass),
            ("stiffness", self.stiffness),
            ("damping", self.damping),
            ("epsilon", self.epsilon),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value <= 0. {
                return Err(ConfigurationError::InvalidSpring { name, field, value });
            }
        }
        Ok(())
    }
}
