// Timeouts, topics, servo controller and rig calibration
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

// Runtime loop frequency (one gait tick per period)
pub const LOOP_HZ: u64 = 2;

// Command timeout for watchdog
pub const CMD_TIMEOUT: Duration = Duration::from_millis(1500);

// Zenoh topics
pub const TOPIC_CMD_GAIT: &str = "quadruped/cmd/gait"; // commands
pub const TOPIC_GAIT_STATE: &str = "quadruped/state/gait"; // per-leg telemetry
pub const TOPIC_HEALTH: &str = "quadruped/state/health"; // health status

// Serial port for the Maestro servo controller (command port)
pub const MAESTRO_PORT: &str = "/dev/ttyACM0";
pub const MAESTRO_BAUDRATE: u32 = 9600;

// Servo controller ceilings
pub const MAX_VELOCITY: u16 = 16383;
pub const MAX_ACCELERATION: u16 = 255;
pub const MAX_YAW_RATE: f64 = 9.52; // rad/s

// Number of channels on the controller
pub const CHANNEL_COUNT: u8 = 12;

/// Error raised while loading or validating the robot configuration.
///
/// Always fatal: nothing may be commanded from a table that failed here.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Channel {channel} is assigned to both {first} and {second}")]
    DuplicateChannel {
        channel: u8,
        first: String,
        second: String,
    },

    #[error("Joint {joint} has zero travel (full_back == full_front == {position})")]
    ZeroTravel { joint: String, position: f64 },

    #[error("Joint {joint} uses channel {channel}, controller channels are 0-11")]
    ChannelOutOfRange { joint: String, channel: u8 },
}

/// Leg and body dimensions (same length unit as IK targets)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotGeometry {
    pub hip_offset: f64,  // hip axis to body center
    pub femur: f64,       // upper link
    pub tibia: f64,       // lower link
    pub body_width: f64,  // hip axis to hip axis
    pub body_length: f64, // shoulder axis to shoulder axis
    pub body_height: f64, // ground to shoulder axis
    pub max_velocity: u16,     // caps gait and stand speed
    pub max_acceleration: u16, // caps gait and stand acceleration
    pub max_yaw_rate: f64,     // no turning gait reads this yet
}

impl Default for RobotGeometry {
    fn default() -> Self {
        Self {
            hip_offset: 5.0,
            femur: 11.0,
            tibia: 12.25,
            body_width: 10.0,
            body_length: 20.0,
            body_height: 18.0,
            max_velocity: MAX_VELOCITY,
            max_acceleration: MAX_ACCELERATION,
            max_yaw_rate: MAX_YAW_RATE,
        }
    }
}

/// IK angle (degrees) at which each joint role sits at its neutral position.
///
/// These depend on how the horns were mounted on one particular rig and must
/// be re-measured when servos are swapped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceAngles {
    pub upper: f64,
    pub lower: f64,
}

impl Default for ReferenceAngles {
    fn default() -> Self {
        Self {
            upper: 144.79,
            lower: 99.96,
        }
    }
}

/// Blocking waits that stand in for servo travel time (open loop).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaitTiming {
    #[serde(with = "millis")]
    pub settle: Duration,
    #[serde(with = "millis")]
    pub lift: Duration,
    #[serde(with = "millis")]
    pub swing: Duration,
    #[serde(with = "millis")]
    pub plant: Duration,
    #[serde(with = "millis")]
    pub dwell: Duration,
}

impl GaitTiming {
    /// No waits at all. Useful for dry runs and tests.
    pub fn immediate() -> Self {
        Self {
            settle: Duration::ZERO,
            lift: Duration::ZERO,
            swing: Duration::ZERO,
            plant: Duration::ZERO,
            dwell: Duration::ZERO,
        }
    }
}

impl Default for GaitTiming {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(100),
            lift: Duration::from_millis(100),
            swing: Duration::from_millis(50),
            plant: Duration::from_millis(50),
            dwell: Duration::from_secs(1),
        }
    }
}

/// Block the control thread for `duration` (skipped when zero)
pub fn pause(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Measured data for one servo, positions in microseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointSpec {
    pub channel: u8,
    pub full_back: f64,
    pub full_front: f64,
    pub neutral: f64,
}

impl JointSpec {
    pub const fn new(channel: u8, full_back: f64, full_front: f64, neutral: f64) -> Self {
        Self {
            channel,
            full_back,
            full_front,
            neutral,
        }
    }
}

/// The three servos of one leg
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegSpec {
    pub hip: JointSpec,
    pub upper: JointSpec,
    pub lower: JointSpec,
}

/// Calibration of all four legs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct LegTable {
    pub fl: LegSpec,
    pub fr: LegSpec,
    pub bl: LegSpec,
    pub br: LegSpec,
}

/// Measurements of the reference rig
pub const DEFAULT_LEG_TABLE: LegTable = LegTable {
    fl: LegSpec {
        hip: JointSpec::new(3, 1236.50, 1892.25, 1564.375),
        upper: JointSpec::new(5, 1921.50, 1266.00, 1593.75),
        lower: JointSpec::new(4, 1872.75, 1148.50, 1510.625),
    },
    fr: LegSpec {
        hip: JointSpec::new(2, 1613.25, 992.00, 1302.625),
        upper: JointSpec::new(1, 1310.00, 1921.50, 1615.75),
        lower: JointSpec::new(0, 1231.75, 2000.00, 1615.875),
    },
    bl: LegSpec {
        hip: JointSpec::new(8, 1623.00, 1036.00, 1329.5),
        upper: JointSpec::new(7, 2000.00, 1354.00, 1777.0),
        lower: JointSpec::new(6, 2000.00, 1138.75, 1669.375),
    },
    br: LegSpec {
        hip: JointSpec::new(11, 1261.00, 1848.25, 1554.625),
        upper: JointSpec::new(10, 1065.25, 1701.50, 1283.375),
        lower: JointSpec::new(9, 1221.75, 2000.00, 1510.875),
    },
};

impl Default for LegTable {
    fn default() -> Self {
        DEFAULT_LEG_TABLE
    }
}

/// Everything the runtime needs to know about the robot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub port: String,
    pub baudrate: u32,
    pub geometry: RobotGeometry,
    pub reference_angles: ReferenceAngles,
    pub timing: GaitTiming,
    pub legs: LegTable,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            port: MAESTRO_PORT.to_string(),
            baudrate: MAESTRO_BAUDRATE,
            geometry: RobotGeometry::default(),
            reference_angles: ReferenceAngles::default(),
            timing: GaitTiming::default(),
            legs: LegTable::default(),
        }
    }
}

impl RobotConfig {
    /// Load a JSON robot file. Omitted sections keep the reference rig values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config = serde_json::from_reader(BufReader::new(file))?;
        Ok(config)
    }
}
