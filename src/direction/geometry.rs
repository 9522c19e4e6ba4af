//! Array geometry and compass arithmetic.
//!
//! Compass convention: 0° is north (the array's forward axis) and angles grow
//! clockwise, so east is 90°.  A microphone at `angle θ`, `radius r` sits at
//! `(x, y) = (r·sin θ, r·cos θ)` with x pointing east and y pointing north.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// MicPosition
// ---------------------------------------------------------------------------

/// Placement of one microphone around the array centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MicPosition {
    /// Compass bearing of the microphone from the array centre.
    pub angle_degrees: f32,
    /// Distance from the array centre in metres.
    pub radius_m: f32,
}

impl MicPosition {
    pub fn new(angle_degrees: f32, radius_m: f32) -> Self {
        Self {
            angle_degrees,
            radius_m,
        }
    }

    /// Unit vector `(east, north)` pointing at the microphone.
    pub fn unit(&self) -> (f64, f64) {
        let theta = (self.angle_degrees as f64).to_radians();
        (theta.sin(), theta.cos())
    }

    /// Cartesian position `(east, north)` in metres.
    pub fn position(&self) -> (f64, f64) {
        let (x, y) = self.unit();
        let r = self.radius_m as f64;
        (r * x, r * y)
    }
}

// ---------------------------------------------------------------------------
// Angle helpers
// ---------------------------------------------------------------------------

/// Wrap any finite angle into `[0, 360)`.
///
/// ```
/// use sound_compass::direction::normalize_degrees;
///
/// assert_eq!(normalize_degrees(-90.0), 270.0);
/// assert_eq!(normalize_degrees(720.0), 0.0);
/// assert_eq!(normalize_degrees(-1e-14), 0.0);
/// ```
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid of a tiny negative number rounds up to exactly 360.0
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Compass bearing of the vector `(east, north)`.
pub fn bearing(east: f64, north: f64) -> f64 {
    normalize_degrees(east.atan2(north).to_degrees())
}

// ---------------------------------------------------------------------------
// CompassPoint
// ---------------------------------------------------------------------------

/// Eight-point compass rose used in human-readable alert descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompassPoint {
    North,
    Northeast,
    East,
    Southeast,
    South,
    Southwest,
    West,
    Northwest,
}

impl CompassPoint {
    const ALL: [CompassPoint; 8] = [
        CompassPoint::North,
        CompassPoint::Northeast,
        CompassPoint::East,
        CompassPoint::Southeast,
        CompassPoint::South,
        CompassPoint::Southwest,
        CompassPoint::West,
        CompassPoint::Northwest,
    ];

    /// Nearest compass point; each covers a 45° sector centred on it.
    ///
    /// ```
    /// use sound_compass::direction::CompassPoint;
    ///
    /// assert_eq!(CompassPoint::from_degrees(350.0), CompassPoint::North);
    /// assert_eq!(CompassPoint::from_degrees(100.0), CompassPoint::East);
    /// ```
    pub fn from_degrees(angle: f64) -> Self {
        let sector = ((normalize_degrees(angle) + 22.5) / 45.0).floor() as usize % 8;
        Self::ALL[sector]
    }

    pub fn label(&self) -> &'static str {
        match self {
            CompassPoint::North => "north",
            CompassPoint::Northeast => "northeast",
            CompassPoint::East => "east",
            CompassPoint::Southeast => "southeast",
            CompassPoint::South => "south",
            CompassPoint::Southwest => "southwest",
            CompassPoint::West => "west",
            CompassPoint::Northwest => "northwest",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn east_mic_points_east() {
        let (x, y) = MicPosition::new(90.0, 0.1).position();
        assert!((x - 0.1).abs() < 1e-9);
        assert!(y.abs() < 1e-9);
    }

    #[test]
    fn bearing_quadrants() {
        assert!((bearing(0.0, 1.0) - 0.0).abs() < 1e-9);
        assert!((bearing(1.0, 0.0) - 90.0).abs() < 1e-9);
        assert!((bearing(0.0, -1.0) - 180.0).abs() < 1e-9);
        assert!((bearing(-1.0, 0.0) - 270.0).abs() < 1e-9);
        assert!((bearing(1.0, 1.0) - 45.0).abs() < 1e-9);
    }

    #[test]
    fn normalize_stays_in_range() {
        for a in [-721.5, -360.0, -0.0, 0.0, 359.999, 360.0, 1e6] {
            let n = normalize_degrees(a);
            assert!((0.0..360.0).contains(&n), "{a} → {n}");
        }
    }

    #[test]
    fn compass_sectors() {
        assert_eq!(CompassPoint::from_degrees(0.0), CompassPoint::North);
        assert_eq!(CompassPoint::from_degrees(22.4), CompassPoint::North);
        assert_eq!(CompassPoint::from_degrees(22.5), CompassPoint::Northeast);
        assert_eq!(CompassPoint::from_degrees(225.0), CompassPoint::Southwest);
        assert_eq!(CompassPoint::from_degrees(337.6), CompassPoint::North);
        assert_eq!(CompassPoint::from_degrees(-45.0), CompassPoint::Northwest);
        assert_eq!(CompassPoint::Southeast.label(), "southeast");
    }
}
