// Servo side of the quadruped
//
// Provides:
// - Per-joint calibration table (channels, travel, polarity)
// - Pololu Maestro compact protocol encoder and transports
// - Leg driver that turns IK targets into servo commands

pub mod calibration;
mod driver;
pub mod maestro;

pub use calibration::{
    CalibrationTable, JointCalibration, JointRole, Leg, LegConfiguration, SwingPhase,
    UnknownLegError,
};
pub use driver::{DisableReport, LegDriver};
pub use maestro::{
    LoggingTransport, MaestroBus, MaestroError, MotionCommand, SerialTransport, ServoTarget,
    Transport,
};
