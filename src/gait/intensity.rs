// Intensity (1..=10) -> controller speed, acceleration and swing arc
//
// Levels are grouped in five tiers of two. Each tier divides the controller
// maximum by its own divisor before scaling by level/10, which gives coarse
// steps at the low end and fine ones near full speed.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::config::{MAX_ACCELERATION, MAX_VELOCITY, RobotGeometry};
use crate::servo::JointCalibration;

/// Gait intensity, always within 1..=10
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Intensity(u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Intensity {0} is outside 1..=10")]
pub struct IntensityError(pub u8);

impl Intensity {
    pub const MIN: Intensity = Intensity(1);
    pub const MAX: Intensity = Intensity(10);

    pub fn new(level: u8) -> Result<Self, IntensityError> {
        if (1..=10).contains(&level) {
            Ok(Self(level))
        } else {
            Err(IntensityError(level))
        }
    }

    pub fn level(self) -> u8 {
        self.0
    }

    /// Tier divisor applied to the controller maximums
    fn divisor(self) -> f64 {
        match self.0 {
            1 | 2 => 5.0,
            3 | 4 => 4.0,
            5 | 6 => 3.0,
            7 | 8 => 2.0,
            _ => 1.0,
        }
    }

    /// `((max / divisor) / 10) * level`, evaluated in this exact order
    fn scale(self, max: f64) -> f64 {
        ((max / self.divisor()) / 10.0) * self.0 as f64
    }
}

impl TryFrom<u8> for Intensity {
    type Error = IntensityError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl From<Intensity> for u8 {
    fn from(intensity: Intensity) -> Self {
        intensity.0
    }
}

impl Display for Intensity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Speed, acceleration and arc-length for one joint at one intensity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointMotion {
    pub arc: f64,
    pub speed: u16,
    pub acceleration: u16,
}

/// Map an intensity to controller `(speed, acceleration)`
pub fn interpret_intensity(intensity: Intensity) -> (u16, u16) {
    interpret_intensity_with_limits(intensity, MAX_VELOCITY, MAX_ACCELERATION)
}

/// Map an intensity with custom controller ceilings
pub fn interpret_intensity_with_limits(
    intensity: Intensity,
    max_velocity: u16,
    max_acceleration: u16,
) -> (u16, u16) {
    // `as` truncates toward zero
    let speed = intensity.scale(max_velocity as f64) as u16;
    let acceleration = intensity.scale(max_acceleration as f64) as u16;
    (speed, acceleration)
}

/// Swing arc (us) for a joint whose extremes are `travel` apart
pub fn arc_length(intensity: Intensity, travel: f64) -> f64 {
    intensity.scale(travel.abs())
}

/// Arc, speed and acceleration for one joint's own calibration, capped by
/// the robot's configured ceilings
pub fn joint_motion(
    intensity: Intensity,
    joint: &JointCalibration,
    geometry: &RobotGeometry,
) -> JointMotion {
    let (speed, acceleration) = interpret_intensity_with_limits(
        intensity,
        geometry.max_velocity,
        geometry.max_acceleration,
    );
    JointMotion {
        arc: arc_length(intensity, joint.travel()),
        speed,
        acceleration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(level: u8) -> (u16, u16) {
        interpret_intensity(Intensity::new(level).unwrap())
    }

    #[test]
    fn test_exact_speed_and_acceleration() {
        let expected = [
            (1, (327, 5)),
            (2, (655, 10)),
            (3, (1228, 19)),
            (4, (1638, 25)),
            (5, (2730, 42)),
            (6, (3276, 51)),
            (7, (5734, 89)),
            (8, (6553, 102)),
            (9, (14744, 229)),
            (10, (16383, 255)),
        ];
        for (level, values) in expected {
            assert_eq!(at(level), values, "intensity {}", level);
        }
    }

    #[test]
    fn test_tiers_are_not_linear() {
        // same tier doubles, crossing a tier does not
        let (s1, _) = at(1);
        let (s2, _) = at(2);
        let (s3, _) = at(3);
        assert_ne!(s2, 2 * s1);
        assert_ne!(s3, 3 * s1);
        assert!(s3 > s2);
    }

    #[test]
    fn test_arc_length_uses_tier_divisor() {
        let travel = 655.5; // FL upper of the reference rig
        let arc = arc_length(Intensity::new(4).unwrap(), travel);
        assert!((arc - 655.5 / 4.0 / 10.0 * 4.0).abs() < 1e-9);

        let full = arc_length(Intensity::MAX, -travel);
        assert!((full - travel).abs() < 1e-9);
    }

    #[test]
    fn test_custom_ceilings() {
        let level = Intensity::new(8).unwrap();
        // (1000 / 2 / 10) * 8, (10 / 2 / 10) * 8
        assert_eq!(interpret_intensity_with_limits(level, 1000, 10), (400, 4));
        assert_eq!(interpret_intensity_with_limits(Intensity::MAX, 1000, 10), (1000, 10));
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert_eq!(Intensity::new(0), Err(IntensityError(0)));
        assert_eq!(Intensity::new(11), Err(IntensityError(11)));
        assert!(serde_json::from_str::<Intensity>("12").is_err());
        assert_eq!(serde_json::from_str::<Intensity>("7").unwrap().level(), 7);
    }
}
