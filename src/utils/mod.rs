use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Returns the time since the first call, on a monotonic clock.
pub fn get_monotonic_time() -> Duration {
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed()
}

pub fn version() -> String {
    if let Some(v) = option_env!("SHEET_MOTION_BUILD_VERSION_STRING") {
        return String::from(v);
    }

    const MAJOR: &str = env!("CARGO_PKG_VERSION_MAJOR");
    const MINOR: &str = env!("CARGO_PKG_VERSION_MINOR");
    const PATCH: &str = env!("CARGO_PKG_VERSION_PATCH");

    if PATCH == "0" {
        format!("{MAJOR}.{MINOR:0>2}")
    } else {
        format!("{MAJOR}.{MINOR:0>2}.{PATCH}")
    }
}

/// Whether two floats are equal within rounding noise of pixel arithmetic.
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}
