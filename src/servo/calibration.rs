// Per-joint calibration table for the four legs
//
// Static measurements (channel, extremes, neutral) plus the two fields that
// change while walking: the last commanded position and the swing phase.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use crate::config::{CHANNEL_COUNT, ConfigError, JointSpec, LegSpec, LegTable};

/// The four legs, named as on the robot frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Leg {
    #[serde(rename = "FL")]
    FrontLeft = 0,
    #[serde(rename = "FR")]
    FrontRight = 1,
    #[serde(rename = "BL")]
    BackLeft = 2,
    #[serde(rename = "BR")]
    BackRight = 3,
}

impl Leg {
    pub const ALL: [Leg; 4] = [Leg::FrontLeft, Leg::FrontRight, Leg::BackLeft, Leg::BackRight];

    /// Short name used in configs, logs and the CLI
    pub fn name(self) -> &'static str {
        match self {
            Leg::FrontLeft => "FL",
            Leg::FrontRight => "FR",
            Leg::BackLeft => "BL",
            Leg::BackRight => "BR",
        }
    }
}

impl Display for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Raised when a caller names a leg that does not exist
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown leg: {0:?} (expected FL, FR, BL or BR)")]
pub struct UnknownLegError(pub String);

impl FromStr for Leg {
    type Err = UnknownLegError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FL" => Ok(Leg::FrontLeft),
            "FR" => Ok(Leg::FrontRight),
            "BL" => Ok(Leg::BackLeft),
            "BR" => Ok(Leg::BackRight),
            _ => Err(UnknownLegError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointRole {
    Hip = 0,
    Upper = 1,
    Lower = 2,
}

impl JointRole {
    pub const ALL: [JointRole; 3] = [JointRole::Hip, JointRole::Upper, JointRole::Lower];
}

impl Display for JointRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JointRole::Hip => f.write_str("hip"),
            JointRole::Upper => f.write_str("upper"),
            JointRole::Lower => f.write_str("lower"),
        }
    }
}

/// Which way the joint swings on its next step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwingPhase {
    #[default]
    Uninitialized,
    Forward,
    Backward,
}

impl SwingPhase {
    /// Forward becomes Backward; anything else becomes Forward
    pub fn toggled(self) -> Self {
        match self {
            SwingPhase::Forward => SwingPhase::Backward,
            _ => SwingPhase::Forward,
        }
    }
}

/// One physical joint's servo
#[derive(Debug, Clone, PartialEq)]
pub struct JointCalibration {
    channel: u8,
    full_back: f64,
    full_front: f64,
    neutral: f64,
    polarity: f64,
    current_position: f64,
    phase: SwingPhase,
}

impl JointCalibration {
    fn from_spec(spec: &JointSpec) -> Self {
        let polarity = if spec.full_front > spec.full_back {
            1.0
        } else {
            -1.0
        };
        Self {
            channel: spec.channel,
            full_back: spec.full_back,
            full_front: spec.full_front,
            neutral: spec.neutral,
            polarity,
            current_position: spec.neutral,
            phase: SwingPhase::Uninitialized,
        }
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn full_back(&self) -> f64 {
        self.full_back
    }

    pub fn full_front(&self) -> f64 {
        self.full_front
    }

    pub fn neutral(&self) -> f64 {
        self.neutral
    }

    /// +1 when increasing units move the joint toward front, -1 otherwise
    pub fn polarity(&self) -> f64 {
        self.polarity
    }

    /// Absolute distance between the two measured extremes
    pub fn travel(&self) -> f64 {
        (self.full_back - self.full_front).abs()
    }

    /// Last commanded position (us)
    pub fn current_position(&self) -> f64 {
        self.current_position
    }

    pub fn phase(&self) -> SwingPhase {
        self.phase
    }

    pub(crate) fn commit_position(&mut self, position: f64) {
        self.current_position = position;
    }

    pub(crate) fn toggle_phase(&mut self) {
        self.phase = self.phase.toggled();
    }

    pub(crate) fn reset_phase(&mut self) {
        self.phase = SwingPhase::Uninitialized;
    }
}

/// The three joints of one leg
#[derive(Debug, Clone, PartialEq)]
pub struct LegConfiguration {
    pub hip: JointCalibration,
    pub upper: JointCalibration,
    pub lower: JointCalibration,
}

impl LegConfiguration {
    fn from_spec(spec: &LegSpec) -> Self {
        Self {
            hip: JointCalibration::from_spec(&spec.hip),
            upper: JointCalibration::from_spec(&spec.upper),
            lower: JointCalibration::from_spec(&spec.lower),
        }
    }
}

impl Index<JointRole> for LegConfiguration {
    type Output = JointCalibration;

    fn index(&self, role: JointRole) -> &Self::Output {
        match role {
            JointRole::Hip => &self.hip,
            JointRole::Upper => &self.upper,
            JointRole::Lower => &self.lower,
        }
    }
}

impl IndexMut<JointRole> for LegConfiguration {
    fn index_mut(&mut self, role: JointRole) -> &mut Self::Output {
        match role {
            JointRole::Hip => &mut self.hip,
            JointRole::Upper => &mut self.upper,
            JointRole::Lower => &mut self.lower,
        }
    }
}

/// Calibration for the whole robot, indexed by [`Leg`]
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    legs: [LegConfiguration; 4],
}

impl CalibrationTable {
    /// Build the table, rejecting duplicate channels and zero-travel joints
    pub fn new(table: &LegTable) -> Result<Self, ConfigError> {
        let specs = [
            (Leg::FrontLeft, &table.fl),
            (Leg::FrontRight, &table.fr),
            (Leg::BackLeft, &table.bl),
            (Leg::BackRight, &table.br),
        ];

        let mut owners: [Option<String>; CHANNEL_COUNT as usize] = Default::default();
        for (leg, spec) in specs {
            for role in JointRole::ALL {
                let joint = match role {
                    JointRole::Hip => &spec.hip,
                    JointRole::Upper => &spec.upper,
                    JointRole::Lower => &spec.lower,
                };
                let name = format!("{}-{}", leg, role);

                if joint.channel >= CHANNEL_COUNT {
                    return Err(ConfigError::ChannelOutOfRange {
                        joint: name,
                        channel: joint.channel,
                    });
                }
                if joint.full_back == joint.full_front {
                    return Err(ConfigError::ZeroTravel {
                        joint: name,
                        position: joint.full_back,
                    });
                }

                let slot = &mut owners[joint.channel as usize];
                if let Some(first) = slot.take() {
                    return Err(ConfigError::DuplicateChannel {
                        channel: joint.channel,
                        first,
                        second: name,
                    });
                }
                *slot = Some(name);
            }
        }

        Ok(Self {
            legs: specs.map(|(_, spec)| LegConfiguration::from_spec(spec)),
        })
    }

    pub fn leg(&self, leg: Leg) -> &LegConfiguration {
        &self[leg]
    }

    pub fn joint(&self, leg: Leg, role: JointRole) -> &JointCalibration {
        &self[leg][role]
    }

    pub(crate) fn joint_mut(&mut self, leg: Leg, role: JointRole) -> &mut JointCalibration {
        &mut self[leg][role]
    }

    /// Find which joint is wired to `channel`
    pub fn locate(&self, channel: u8) -> Option<(Leg, JointRole)> {
        self.joints()
            .find(|(_, _, joint)| joint.channel == channel)
            .map(|(leg, role, _)| (leg, role))
    }

    /// All twelve joints, leg by leg (hip, upper, lower)
    pub fn joints(&self) -> impl Iterator<Item = (Leg, JointRole, &JointCalibration)> + '_ {
        Leg::ALL.into_iter().flat_map(move |leg| {
            JointRole::ALL
                .into_iter()
                .map(move |role| (leg, role, &self[leg][role]))
        })
    }
}

impl Index<Leg> for CalibrationTable {
    type Output = LegConfiguration;

    fn index(&self, leg: Leg) -> &Self::Output {
        &self.legs[leg as usize]
    }
}

impl IndexMut<Leg> for CalibrationTable {
    fn index_mut(&mut self, leg: Leg) -> &mut Self::Output {
        &mut self.legs[leg as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_LEG_TABLE;

    #[test]
    fn test_default_table_is_valid() {
        let table = CalibrationTable::new(&DEFAULT_LEG_TABLE).unwrap();
        assert_eq!(table.joints().count(), 12);

        let fl_upper = table.joint(Leg::FrontLeft, JointRole::Upper);
        assert_eq!(fl_upper.channel(), 5);
        assert_eq!(fl_upper.current_position(), fl_upper.neutral());
        assert_eq!(fl_upper.phase(), SwingPhase::Uninitialized);
    }

    #[test]
    fn test_polarity_follows_measured_extremes() {
        let table = CalibrationTable::new(&DEFAULT_LEG_TABLE).unwrap();
        // FL upper: full_front (1266) < full_back (1921.5)
        assert_eq!(table.joint(Leg::FrontLeft, JointRole::Upper).polarity(), -1.0);
        // FR upper: full_front (1921.5) > full_back (1310)
        assert_eq!(table.joint(Leg::FrontRight, JointRole::Upper).polarity(), 1.0);
        assert_eq!(table.joint(Leg::FrontRight, JointRole::Upper).travel(), 611.5);
    }

    #[test]
    fn test_duplicate_channel_rejected() {
        let mut legs = DEFAULT_LEG_TABLE;
        legs.br.hip.channel = legs.fl.hip.channel;

        let err = CalibrationTable::new(&legs).unwrap_err();
        match err {
            ConfigError::DuplicateChannel {
                channel,
                first,
                second,
            } => {
                assert_eq!(channel, 3);
                assert_eq!(first, "FL-hip");
                assert_eq!(second, "BR-hip");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_travel_rejected() {
        let mut legs = DEFAULT_LEG_TABLE;
        legs.bl.lower.full_front = legs.bl.lower.full_back;

        let err = CalibrationTable::new(&legs).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroTravel { ref joint, .. } if joint == "BL-lower"));
    }

    #[test]
    fn test_channel_out_of_range_rejected() {
        let mut legs = DEFAULT_LEG_TABLE;
        legs.fr.upper.channel = 12;

        let err = CalibrationTable::new(&legs).unwrap_err();
        assert!(matches!(err, ConfigError::ChannelOutOfRange { channel: 12, .. }));
    }

    #[test]
    fn test_locate_channel() {
        let table = CalibrationTable::new(&DEFAULT_LEG_TABLE).unwrap();
        assert_eq!(table.locate(10), Some((Leg::BackRight, JointRole::Upper)));
        assert_eq!(table.locate(0), Some((Leg::FrontRight, JointRole::Lower)));
        assert_eq!(table.locate(12), None);
    }

    #[test]
    fn test_leg_names() {
        assert_eq!("fl".parse::<Leg>(), Ok(Leg::FrontLeft));
        assert_eq!("BR".parse::<Leg>(), Ok(Leg::BackRight));
        assert_eq!(
            "XX".parse::<Leg>(),
            Err(UnknownLegError("XX".to_string()))
        );
        assert_eq!(Leg::BackLeft.to_string(), "BL");
    }

    #[test]
    fn test_phase_toggle() {
        assert_eq!(SwingPhase::Uninitialized.toggled(), SwingPhase::Forward);
        assert_eq!(SwingPhase::Forward.toggled(), SwingPhase::Backward);
        assert_eq!(SwingPhase::Backward.toggled(), SwingPhase::Forward);
    }
}
