//! Shared priority scale and the smoothstep decay used by strategies.

use std::cmp::Ordering;
use std::fmt;

/// Rank of a candidate on the closed scale `[-1, 1]`; higher wins.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Priority(f64);

impl Priority {
    /// Upper bound of the scale.
    pub const MAX: Self = Self(1.0);
    /// Most urgent regular work.
    pub const HIGHEST: Self = Self(0.9);
    /// Fresh work.
    pub const HIGH: Self = Self(0.5);
    /// Neutral priority.
    pub const NORMAL: Self = Self(0.0);
    /// Work that can wait.
    pub const LOW: Self = Self(-0.5);
    /// Work to pick up only when nothing else is available.
    pub const IDLE: Self = Self(-0.9);
    /// Lower bound of the scale.
    pub const MIN: Self = Self(-1.0);

    /// Creates a priority, clamping `value` into `[-1, 1]`.
    ///
    /// A `NaN` input maps to [`Priority::MIN`].
    #[must_use]
    pub const fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::MIN;
        }
        Self(value.clamp(Self::MIN.0, Self::MAX.0))
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Total ordering over priorities.
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

/// Cubic ease `t²(3 - 2t)` with `t` clamped to `[0, 1]`.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "smoothstep is a floating-point interpolation"
)]
pub const fn smoothstep01(t: f64) -> f64 {
    let clamped = t.clamp(0.0, 1.0);
    clamped * clamped * (3.0 - 2.0 * clamped)
}

/// Smooth monotonic mapping from `[x0, x1]` onto `[y0, y1]`.
///
/// Inputs outside the domain clamp to the nearest endpoint.
///
/// ```
/// use benchplane::scheduler::Smoothstep;
///
/// let curve = Smoothstep::new(0.0, 10.0, 1.0, -1.0);
/// assert_eq!(curve.eval(-5.0), 1.0);
/// assert_eq!(curve.eval(5.0), 0.0);
/// assert_eq!(curve.eval(15.0), -1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Smoothstep {
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
}

impl Smoothstep {
    /// Creates a mapping taking `x0` to `y0` and `x1` to `y1`.
    #[must_use]
    pub const fn new(x0: f64, x1: f64, y0: f64, y1: f64) -> Self {
        Self { x0, x1, y0, y1 }
    }

    /// Creates a mapping between two priorities.
    #[must_use]
    pub const fn between(x0: f64, x1: f64, from: Priority, to: Priority) -> Self {
        Self::new(x0, x1, from.value(), to.value())
    }

    /// Evaluates the mapping at `x`.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        reason = "smoothstep is a floating-point interpolation"
    )]
    pub const fn eval(&self, x: f64) -> f64 {
        let span = self.x1 - self.x0;
        if span <= 0.0 {
            return if x < self.x1 { self.y0 } else { self.y1 };
        }
        let t = (x - self.x0) / span;
        if t <= 0.0 {
            return self.y0;
        }
        if t >= 1.0 {
            return self.y1;
        }
        self.y0 + (self.y1 - self.y0) * smoothstep01(t)
    }

    /// Evaluates the mapping at `x` as a [`Priority`].
    #[must_use]
    pub const fn priority(&self, x: f64) -> Priority {
        Priority::new(self.eval(x))
    }
}
