// Trot orchestration: one synchronized plan, four legs in diagonal order

use tracing::{debug, info};

use super::cycle::{GaitPhase, LegCycle, StepPlan};
use super::intensity::{Intensity, joint_motion};
use crate::config::RobotGeometry;
use crate::servo::{CalibrationTable, JointRole, Leg, LegDriver, Transport};

/// Order legs are stepped in each tick: diagonal pair first, then the other
pub const TROT_ORDER: [Leg; 4] = [Leg::FrontLeft, Leg::BackRight, Leg::FrontRight, Leg::BackLeft];

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
}

/// Smallest arc, speed and acceleration over the four upper joints, so no
/// joint is pushed past what its slowest peer can follow
pub fn synchronized_plan(
    table: &CalibrationTable,
    geometry: &RobotGeometry,
    intensity: Intensity,
) -> StepPlan {
    Leg::ALL
        .iter()
        .map(|&leg| joint_motion(intensity, table.joint(leg, JointRole::Upper), geometry))
        .fold(
            StepPlan {
                arc: f64::INFINITY,
                speed: u16::MAX,
                acceleration: u16::MAX,
            },
            |plan, motion| StepPlan {
                arc: plan.arc.min(motion.arc),
                speed: plan.speed.min(motion.speed),
                acceleration: plan.acceleration.min(motion.acceleration),
            },
        )
}

/// The four leg state machines
#[derive(Debug, Clone, PartialEq)]
pub struct TrotGait {
    cycles: [LegCycle; 4],
}

impl Default for TrotGait {
    fn default() -> Self {
        Self::new()
    }
}

impl TrotGait {
    pub fn new() -> Self {
        Self {
            cycles: Leg::ALL.map(LegCycle::new),
        }
    }

    pub fn phase(&self, leg: Leg) -> GaitPhase {
        self.cycles[leg as usize].phase()
    }

    pub fn reset(&mut self) {
        for cycle in &mut self.cycles {
            cycle.reset();
        }
    }

    /// Run one gait tick: every leg performs one transition in trot order
    pub fn tick<T: Transport>(
        &mut self,
        driver: &mut LegDriver<T>,
        intensity: Intensity,
        direction: Direction,
    ) {
        let plan = synchronized_plan(driver.table(), driver.geometry(), intensity);
        let plan = match direction {
            Direction::Forward => plan,
            Direction::Backward => plan.reversed(),
        };

        info!(
            "Walking {:?} at intensity {} (arc={:.2}, speed={}, accel={})",
            direction, intensity, plan.arc, plan.speed, plan.acceleration
        );

        for leg in TROT_ORDER {
            debug!("Stepping {} leg", leg);
            self.cycles[leg as usize].step(driver, &plan);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_LEG_TABLE;
    use crate::gait::intensity::{arc_length, interpret_intensity, interpret_intensity_with_limits};
    use crate::test_support::test_driver;

    #[test]
    fn test_plan_takes_minimum_over_legs() {
        let table = CalibrationTable::new(&DEFAULT_LEG_TABLE).unwrap();
        let intensity = Intensity::new(6).unwrap();
        let plan = synchronized_plan(&table, &RobotGeometry::default(), intensity);

        // FR upper has the shortest travel: |1310 - 1921.5| = 611.5
        assert_eq!(plan.arc, arc_length(intensity, 611.5));
        assert_eq!((plan.speed, plan.acceleration), interpret_intensity(intensity));
    }

    #[test]
    fn test_plan_follows_weakest_joint() {
        let mut legs = DEFAULT_LEG_TABLE;
        legs.bl.upper.full_front = legs.bl.upper.full_back - 200.0;
        let table = CalibrationTable::new(&legs).unwrap();

        let plan = synchronized_plan(&table, &RobotGeometry::default(), Intensity::MAX);
        assert_eq!(plan.arc, arc_length(Intensity::MAX, 200.0));
    }

    #[test]
    fn test_plan_respects_geometry_ceilings() {
        let table = CalibrationTable::new(&DEFAULT_LEG_TABLE).unwrap();
        let geometry = RobotGeometry {
            max_velocity: 2000,
            max_acceleration: 40,
            ..RobotGeometry::default()
        };
        let intensity = Intensity::new(5).unwrap();

        let plan = synchronized_plan(&table, &geometry, intensity);
        assert_eq!(
            (plan.speed, plan.acceleration),
            interpret_intensity_with_limits(intensity, 2000, 40)
        );
        assert_eq!((plan.speed, plan.acceleration), (333, 6));
    }

    #[test]
    fn test_tick_steps_legs_in_trot_order() {
        let mut driver = test_driver();
        let mut gait = TrotGait::new();
        gait.tick(&mut driver, Intensity::new(3).unwrap(), Direction::Forward);

        let table = driver.table().clone();
        let mut order: Vec<Leg> = driver
            .bus()
            .transport()
            .targets()
            .iter()
            .filter_map(|(ch, _)| table.locate(*ch).map(|(leg, _)| leg))
            .collect();
        order.dedup();

        assert_eq!(order, vec![Leg::FrontLeft, Leg::BackRight, Leg::FrontRight, Leg::BackLeft]);
    }

    #[test]
    fn test_tick_advances_every_leg() {
        let mut driver = test_driver();
        let mut gait = TrotGait::new();
        gait.tick(&mut driver, Intensity::MIN, Direction::Backward);

        assert_eq!(gait.phase(Leg::FrontLeft), GaitPhase::BackwardStance);
        assert_eq!(gait.phase(Leg::BackRight), GaitPhase::BackwardStance);
        assert_eq!(gait.phase(Leg::FrontRight), GaitPhase::ForwardSwing);
        assert_eq!(gait.phase(Leg::BackLeft), GaitPhase::ForwardSwing);

        gait.reset();
        assert_eq!(gait.phase(Leg::FrontLeft), GaitPhase::ForwardSwing);
    }
}
