//! Points and the minimum-jerk motion profile
//!
//! A reaching movement that minimizes jerk (the third derivative of
//! position) follows the quintic `10s³ - 15s⁴ + 6s⁵` in normalized time
//! (Flash & Hogan, 1985). Velocity and acceleration are zero at both ends,
//! which gives the slow-fast-slow speed profile of real pointer motion.

use serde::{Deserialize, Serialize};

/// A 2D point with f64 coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Creates a new point
    ///
    /// ```rust
    /// use ki_browser_evasion::input::Point;
    ///
    /// let p = Point::new(10.0, 20.0);
    /// assert_eq!(p.x, 10.0);
    /// assert_eq!(p.y, 20.0);
    /// ```
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Linear interpolation (0.0 = this point, 1.0 = `other`)
    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        Point {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    pub fn magnitude(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Unit vector in the same direction; zero stays zero
    pub fn normalized(&self) -> Point {
        let mag = self.magnitude();
        if mag > 0.0 {
            Point {
                x: self.x / mag,
                y: self.y / mag,
            }
        } else {
            *self
        }
    }

    /// Vector rotated by 90 degrees counter-clockwise
    pub fn perpendicular(&self) -> Point {
        Point {
            x: -self.y,
            y: self.x,
        }
    }
}

impl std::ops::Add for Point {
    type Output = Point;

    fn add(self, other: Point) -> Point {
        Point {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl std::ops::Sub for Point {
    type Output = Point;

    fn sub(self, other: Point) -> Point {
        Point {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

impl std::ops::Mul<f64> for Point {
    type Output = Point;

    fn mul(self, scalar: f64) -> Point {
        Point {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }
}

/// Minimum-jerk position fraction for normalized time `s` (clamped to [0, 1])
pub fn minimum_jerk(s: f64) -> f64 {
    let s = s.clamp(0.0, 1.0);
    let s3 = s * s * s;
    s3 * (10.0 - 15.0 * s + 6.0 * s * s)
}

/// Position on the minimum-jerk path from `start` to `end` at time `s`
pub fn minimum_jerk_point(start: Point, end: Point, s: f64) -> Point {
    start.lerp(&end, minimum_jerk(s))
}
