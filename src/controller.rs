// High-level quadruped controller
//
// Owns the leg driver (calibration table + servo bus) and the trot state
// machines. Every call runs to completion on the calling thread.

use tracing::info;

use crate::config::{ConfigError, RobotConfig, pause};
use crate::gait::{Direction, GaitPhase, Intensity, TrotGait, interpret_intensity_with_limits};
use crate::messages::{GaitTelemetry, LegTelemetry};
use crate::servo::{
    CalibrationTable, DisableReport, JointRole, Leg, LegDriver, LoggingTransport, MaestroBus,
    MaestroError, SerialTransport, Transport,
};

/// Foot waypoints (x, y) of the single-leg stepping loop
pub const FOOT_PATH: [(f64, f64); 4] = [(7.0, 13.0), (0.0, 18.0), (-5.0, 23.0), (0.0, 18.0)];

/// Error raised while bringing up the controller
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Maestro(#[from] MaestroError),
}

pub struct Quadruped<T: Transport> {
    driver: LegDriver<T>,
    gait: TrotGait,
}

impl Quadruped<SerialTransport> {
    /// Validate the calibration, then open the serial port to the controller
    pub fn connect(config: &RobotConfig) -> Result<Self, StartupError> {
        let table = CalibrationTable::new(&config.legs)?;
        info!("Opening Maestro on {} at {} baud", config.port, config.baudrate);
        let bus = MaestroBus::open(&config.port, config.baudrate)?;
        Ok(Self::with_table(bus, table, config))
    }
}

impl Quadruped<LoggingTransport> {
    /// Controller that only logs the frames it would send
    pub fn dry_run(config: &RobotConfig) -> Result<Self, ConfigError> {
        info!("Dry run: frames are logged, not sent");
        Self::new(MaestroBus::new(LoggingTransport), config)
    }
}

impl<T: Transport> Quadruped<T> {
    pub fn new(bus: MaestroBus<T>, config: &RobotConfig) -> Result<Self, ConfigError> {
        let table = CalibrationTable::new(&config.legs)?;
        Ok(Self::with_table(bus, table, config))
    }

    fn with_table(bus: MaestroBus<T>, table: CalibrationTable, config: &RobotConfig) -> Self {
        Self {
            driver: LegDriver::new(
                bus,
                table,
                config.geometry,
                config.reference_angles,
                config.timing,
            ),
            gait: TrotGait::new(),
        }
    }

    pub fn driver(&self) -> &LegDriver<T> {
        &self.driver
    }

    pub fn gait_phase(&self, leg: Leg) -> GaitPhase {
        self.gait.phase(leg)
    }

    /// All joints to neutral; gait and swing phases start over
    pub fn neutral_standing_position(&mut self) {
        self.driver.neutral_standing_position();
        self.gait.reset();
    }

    pub fn walk_forward(&mut self, intensity: Intensity) {
        self.walk(Direction::Forward, intensity);
    }

    pub fn walk_backward(&mut self, intensity: Intensity) {
        self.walk(Direction::Backward, intensity);
    }

    /// One trot tick in the given direction
    pub fn walk(&mut self, direction: Direction, intensity: Intensity) {
        self.gait.tick(&mut self.driver, intensity, direction);
    }

    pub fn disable_all_servos(&mut self) -> DisableReport {
        self.driver.disable_all_servos()
    }

    /// Move one leg through [`FOOT_PATH`] using the IK solver
    pub fn trace_foot_path(&mut self, leg: Leg, intensity: Intensity) {
        let geometry = self.driver.geometry();
        let (speed, acceleration) = interpret_intensity_with_limits(
            intensity,
            geometry.max_velocity,
            geometry.max_acceleration,
        );
        let dwell = self.driver.timing().dwell;

        info!("Tracing foot path with {} leg", leg);
        for (x, y) in FOOT_PATH {
            self.driver.move_leg(leg, x, y, speed, acceleration);
            pause(dwell);
        }
    }

    /// Snapshot of every leg's gait phase and commanded positions
    pub fn telemetry(&self) -> GaitTelemetry {
        let table = self.driver.table();
        GaitTelemetry {
            legs: Leg::ALL
                .iter()
                .map(|&leg| {
                    let upper = table.joint(leg, JointRole::Upper);
                    LegTelemetry {
                        leg,
                        phase: self.gait.phase(leg),
                        swing: upper.phase(),
                        upper: upper.current_position(),
                        lower: table.joint(leg, JointRole::Lower).current_position(),
                    }
                })
                .collect(),
        }
    }
}
