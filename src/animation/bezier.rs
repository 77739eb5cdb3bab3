/// CSS-style cubic Bézier easing through `(0, 0)`, `(x1, y1)`, `(x2, y2)` and `(1, 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
}

impl CubicBezier {
    /// Creates the curve; the x coordinates are clamped to `[0, 1]` so that the curve stays a
    /// function of time.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x1: x1.clamp(0., 1.),
            y1,
            x2: x2.clamp(0., 1.),
            y2,
        }
    }

    pub fn control_points(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    /// Eased progress at time fraction `x`.
    pub fn y(&self, x: f64) -> f64 {
        if x <= 0. {
            return 0.;
        }
        if x >= 1. {
            return 1.;
        }

        let (ax, bx, cx) = coefficients(self.x1, self.x2);
        let (ay, by, cy) = coefficients(self.y1, self.y2);
        let t = solve_t(ax, bx, cx, x);
        sample(ay, by, cy, t)
    }
}

impl From<[f64; 4]> for CubicBezier {
    fn from([x1, y1, x2, y2]: [f64; 4]) -> Self {
        Self::new(x1, y1, x2, y2)
    }
}

fn coefficients(p1: f64, p2: f64) -> (f64, f64, f64) {
    let c = 3. * p1;
    let b = 3. * (p2 - p1) - c;
    let a = 1. - c - b;
    (a, b, c)
}

fn sample(a: f64, b: f64, c: f64, t: f64) -> f64 {
    ((a * t + b) * t + c) * t
}

fn derivative(a: f64, b: f64, c: f64, t: f64) -> f64 {
    (3. * a * t + 2. * b) * t + c
}

/// Finds the curve parameter whose x coordinate is `x`.
fn solve_t(a: f64, b: f64, c: f64, x: f64) -> f64 {
    // Newton's method converges in a few steps for most curves.
    let mut t = x;
    for _ in 0..8 {
        let error = sample(a, b, c, t) - x;
        if error.abs() < 1e-7 {
            return t;
        }
        let slope = derivative(a, b, c, t);
        if slope.abs() < 1e-7 {
            break;
        }
        t = (t - error / slope).clamp(0., 1.);
    }

    // Flat regions stall it; bisect instead.
    let (mut lo, mut hi) = (0., 1.);
    t = x;
    for _ in 0..64 {
        let value = sample(a, b, c, t);
        if (value - x).abs() < 1e-7 {
            break;
        }
        if value < x {
            lo = t;
        } else {
            hi = t;
        }
        t = (lo + hi) / 2.;
    }
    t
}
