use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::ConfigurationError;

/// A resting position of the sheet, measured as visible extent from the closed edge.
///
/// Points are kept in the unit they were written in and converted to pixels against the
/// container extent every time they are resolved, since the extent can change between gestures.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "RawSnapPoint")]
pub enum SnapPoint {
    /// Fraction of the container extent, written as a raw number.
    Fraction(f64),
    /// Absolute pixels, written as `"120px"`.
    Pixels(f64),
    /// Percentage of the container extent, written as `"40%"`.
    Percent(f64),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSnapPoint {
    Number(f64),
    Text(String),
}

impl SnapPoint {
    pub fn to_pixels(self, extent: f64) -> f64 {
        match self {
            SnapPoint::Fraction(fraction) => fraction * extent,
            SnapPoint::Pixels(px) => px,
            SnapPoint::Percent(percent) => percent * extent / 100.,
        }
    }
}

impl From<f64> for SnapPoint {
    fn from(fraction: f64) -> Self {
        SnapPoint::Fraction(fraction)
    }
}

impl FromStr for SnapPoint {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        let (number, make): (_, fn(f64) -> Self) = if let Some(number) = trimmed.strip_suffix("px")
        {
            (number, SnapPoint::Pixels)
        } else if let Some(number) = trimmed.strip_suffix('%') {
            (number, SnapPoint::Percent)
        } else {
            return Err(ConfigurationError::UnknownUnit(s.to_owned()));
        };

        match number.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(make(value)),
            _ => Err(ConfigurationError::InvalidNumber(s.to_owned())),
        }
    }
}

impl TryFrom<RawSnapPoint> for SnapPoint {
    type Error = ConfigurationError;

    fn try_from(raw: RawSnapPoint) -> Result<Self, Self::Error> {
        match raw {
            RawSnapPoint::Number(fraction) if fraction.is_finite() => Ok(Self::Fraction(fraction)),
            RawSnapPoint::Number(fraction) => {
                Err(ConfigurationError::InvalidNumber(fraction.to_string()))
            }
            RawSnapPoint::Text(text) => text.parse(),
        }
    }
}

impl fmt::Display for SnapPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapPoint::Fraction(fraction) => write!(f, "{fraction}"),
            SnapPoint::Pixels(px) => write!(f, "{px}px"),
            SnapPoint::Percent(percent) => write!(f, "{percent}%"),
        }
    }
}
