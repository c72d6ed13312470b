// Leg actuator for the quadruped
//
// Combines the IK solver, the calibration table and the Maestro encoder to
// move a leg's joints. This is the only place joint positions are recorded.

use tracing::{debug, error, info};

use super::calibration::{CalibrationTable, JointRole, Leg, SwingPhase, UnknownLegError};
use super::maestro::{MaestroBus, ServoTarget, Transport};
use crate::config::{
    GaitTiming, MAX_ACCELERATION, MAX_VELOCITY, ReferenceAngles, RobotGeometry, pause,
};
use crate::gait::kinematics::inverse_kinematics_with_links;

/// Outcome of [`LegDriver::disable_all_servos`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisableReport {
    pub disabled: Vec<u8>,
    pub failed: Vec<u8>,
}

impl DisableReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives the legs of one robot over one Maestro bus
pub struct LegDriver<T: Transport> {
    bus: MaestroBus<T>,
    table: CalibrationTable,
    geometry: RobotGeometry,
    reference: ReferenceAngles,
    timing: GaitTiming,
}

impl<T: Transport> LegDriver<T> {
    pub fn new(
        bus: MaestroBus<T>,
        table: CalibrationTable,
        geometry: RobotGeometry,
        reference: ReferenceAngles,
        timing: GaitTiming,
    ) -> Self {
        Self {
            bus,
            table,
            geometry,
            reference,
            timing,
        }
    }

    pub fn table(&self) -> &CalibrationTable {
        &self.table
    }

    pub fn timing(&self) -> &GaitTiming {
        &self.timing
    }

    pub fn geometry(&self) -> &RobotGeometry {
        &self.geometry
    }

    pub fn bus(&self) -> &MaestroBus<T> {
        &self.bus
    }

    /// Servo position (us) for an IK angle on one joint
    pub fn angle_to_position(&self, leg: Leg, role: JointRole, theta: f64) -> f64 {
        let joint = self.table.joint(leg, role);
        let reference = match role {
            JointRole::Upper => self.reference.upper,
            _ => self.reference.lower,
        };
        joint.neutral()
            + joint.polarity()
                * ((theta - reference) * (joint.full_front() - joint.full_back()) / 90.0)
    }

    /// Move a leg's foot to `(target_x, target_y)` in its sagittal plane
    ///
    /// Commands upper then lower joint, waits for the settle time and flips
    /// the upper joint's swing phase.
    pub fn move_leg(
        &mut self,
        leg: Leg,
        target_x: f64,
        target_y: f64,
        speed: u16,
        acceleration: u16,
    ) {
        let (theta1, theta2) = inverse_kinematics_with_links(
            target_x,
            target_y,
            self.geometry.femur,
            self.geometry.tibia,
        );
        let upper = self.angle_to_position(leg, JointRole::Upper, theta1);
        let lower = self.angle_to_position(leg, JointRole::Lower, theta2);

        info!(
            "Moving {} leg to ({}, {}) -> upper: {:.2}°, lower: {:.2}°",
            leg, target_x, target_y, theta1, theta2
        );

        self.drive_joint(leg, JointRole::Upper, upper, speed, acceleration);
        self.drive_joint(leg, JointRole::Lower, lower, speed, acceleration);

        debug!("{} upper -> {:.3}us, lower -> {:.3}us", leg, upper, lower);

        pause(self.timing.settle);

        self.table.joint_mut(leg, JointRole::Upper).toggle_phase();
    }

    /// [`Self::move_leg`] for a leg given by name; unknown names send nothing
    pub fn move_leg_named(
        &mut self,
        leg_name: &str,
        target_x: f64,
        target_y: f64,
        speed: u16,
        acceleration: u16,
    ) -> Result<(), UnknownLegError> {
        let leg = leg_name.parse::<Leg>().inspect_err(|e| error!("{}", e))?;
        self.move_leg(leg, target_x, target_y, speed, acceleration);
        Ok(())
    }

    /// Record a joint's new position, then command it
    pub fn drive_joint(
        &mut self,
        leg: Leg,
        role: JointRole,
        target: f64,
        speed: u16,
        acceleration: u16,
    ) {
        let joint = self.table.joint_mut(leg, role);
        joint.commit_position(target);
        let channel = joint.channel();

        self.bus
            .set_target(channel, ServoTarget::Position(target), speed, acceleration);
    }

    /// Flip the swing phase of one joint after a completed step
    pub(crate) fn complete_step(&mut self, leg: Leg, role: JointRole) -> SwingPhase {
        let joint = self.table.joint_mut(leg, role);
        joint.toggle_phase();
        joint.phase()
    }

    /// Send every joint to neutral at the configured ceilings and clear all
    /// swing phases
    pub fn neutral_standing_position(&mut self) {
        debug!("Moving to neutral standing position");

        let (speed, acceleration) = (self.geometry.max_velocity, self.geometry.max_acceleration);

        let targets: Vec<(Leg, JointRole, f64)> = self
            .table
            .joints()
            .map(|(leg, role, joint)| (leg, role, joint.neutral()))
            .collect();

        for (leg, role, neutral) in targets {
            self.drive_joint(leg, role, neutral, speed, acceleration);
            self.table.joint_mut(leg, role).reset_phase();
        }

        pause(self.timing.settle);

        info!("Moved to neutral standing position");
    }

    /// Make every servo go limp. Keeps going past failed channels.
    pub fn disable_all_servos(&mut self) -> DisableReport {
        debug!("Attempting to disable all servos");

        let joints: Vec<(Leg, JointRole, u8)> = self
            .table
            .joints()
            .map(|(leg, role, joint)| (leg, role, joint.channel()))
            .collect();

        let mut report = DisableReport::default();
        for (leg, role, channel) in joints {
            match self
                .bus
                .try_set_target(channel, ServoTarget::Disable, MAX_VELOCITY, MAX_ACCELERATION)
            {
                Ok(()) => {
                    debug!("Disabled servo {} ({} - {})", channel, leg, role);
                    report.disabled.push(channel);
                }
                Err(e) => {
                    error!("Failed to disable servo {} ({} - {}): {}", channel, leg, role, e);
                    report.failed.push(channel);
                }
            }
        }

        if report.is_complete() {
            info!("Disabled all {} servos", report.disabled.len());
        } else {
            error!(
                "Disabled {} servos, failed on channels {:?}",
                report.disabled.len(),
                report.failed
            );
        }
        report
    }
}
