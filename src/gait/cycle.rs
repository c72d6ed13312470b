// Per-leg gait state machine
//
// Each leg alternates between a forward swing (lift, swing, put down) and a
// backward stance (plant, push). One call to `step` performs one transition.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::pause;
use crate::servo::{JointRole, Leg, LegDriver, Transport};

/// Gait-level state of one leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GaitPhase {
    ForwardSwing,
    BackwardStance,
}

impl GaitPhase {
    /// Starting state: FL and BR swing first, FR and BL push first
    pub fn initial(leg: Leg) -> Self {
        match leg {
            Leg::FrontLeft | Leg::BackRight => GaitPhase::ForwardSwing,
            Leg::FrontRight | Leg::BackLeft => GaitPhase::BackwardStance,
        }
    }

    pub fn next(self) -> Self {
        match self {
            GaitPhase::ForwardSwing => GaitPhase::BackwardStance,
            GaitPhase::BackwardStance => GaitPhase::ForwardSwing,
        }
    }
}

/// Synchronized limits for one gait tick, shared by all four legs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepPlan {
    /// Swing arc in microseconds; negative walks backward
    pub arc: f64,
    pub speed: u16,
    pub acceleration: u16,
}

impl StepPlan {
    /// Same limits, sweeping the other way
    pub fn reversed(self) -> Self {
        Self {
            arc: -self.arc,
            ..self
        }
    }
}

/// State machine driving one leg's upper and lower joints
#[derive(Debug, Clone, PartialEq)]
pub struct LegCycle {
    leg: Leg,
    phase: GaitPhase,
}

impl LegCycle {
    pub fn new(leg: Leg) -> Self {
        Self {
            leg,
            phase: GaitPhase::initial(leg),
        }
    }

    pub fn leg(&self) -> Leg {
        self.leg
    }

    pub fn phase(&self) -> GaitPhase {
        self.phase
    }

    /// Back to the starting bias
    pub fn reset(&mut self) {
        self.phase = GaitPhase::initial(self.leg);
    }

    /// Perform one transition and advance to the next state
    pub fn step<T: Transport>(&mut self, driver: &mut LegDriver<T>, plan: &StepPlan) {
        let leg = self.leg;
        let timing = *driver.timing();

        // Normalize the arc to each joint's own back/front ordering
        let (upper_neutral, upper_half) = {
            let joint = driver.table().joint(leg, JointRole::Upper);
            (joint.neutral(), plan.arc * joint.polarity() / 2.0)
        };
        let (lower_neutral, lower_half) = {
            let joint = driver.table().joint(leg, JointRole::Lower);
            (joint.neutral(), plan.arc * joint.polarity() / 2.0)
        };

        debug!("{} leg: {:?} (arc {:.2})", leg, self.phase, plan.arc);

        let mut drive = |role, target| {
            driver.drive_joint(leg, role, target, plan.speed, plan.acceleration);
        };

        match self.phase {
            GaitPhase::ForwardSwing => {
                // lift
                drive(JointRole::Lower, lower_neutral - lower_half);
                pause(timing.lift);
                // swing
                drive(JointRole::Upper, upper_neutral + upper_half);
                pause(timing.swing);
                // put down
                drive(JointRole::Lower, lower_neutral);
                pause(timing.plant);
            }
            GaitPhase::BackwardStance => {
                // plant
                drive(JointRole::Lower, lower_neutral + lower_half);
                pause(timing.lift);
                // push
                drive(JointRole::Upper, upper_neutral - upper_half);
                pause(timing.swing);
            }
        }

        driver.complete_step(leg, JointRole::Upper);
        self.phase = self.phase.next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::servo::SwingPhase;
    use crate::test_support::test_driver;

    const PLAN: StepPlan = StepPlan {
        arc: 100.0,
        speed: 655,
        acceleration: 10,
    };

    #[test]
    fn test_initial_phase_is_diagonal() {
        assert_eq!(LegCycle::new(Leg::FrontLeft).phase(), GaitPhase::ForwardSwing);
        assert_eq!(LegCycle::new(Leg::BackRight).phase(), GaitPhase::ForwardSwing);
        assert_eq!(LegCycle::new(Leg::FrontRight).phase(), GaitPhase::BackwardStance);
        assert_eq!(LegCycle::new(Leg::BackLeft).phase(), GaitPhase::BackwardStance);
    }

    #[test]
    fn test_forward_swing_sequence() {
        let mut driver = test_driver();
        let mut cycle = LegCycle::new(Leg::FrontLeft);
        cycle.step(&mut driver, &PLAN);

        // FL lower: channel 4, polarity -1, neutral 1510.625
        // FL upper: channel 5, polarity -1, neutral 1593.75
        let targets = driver.bus().transport().targets();
        let expected: [(u8, f64); 3] = [
            (4, 1510.625 + 50.0),
            (5, 1593.75 - 50.0),
            (4, 1510.625),
        ];
        assert_eq!(targets.len(), expected.len());
        for ((ch, raw), (exp_ch, exp_us)) in targets.iter().zip(expected) {
            assert_eq!(*ch, exp_ch);
            assert_eq!(*raw, (exp_us * 4.0).round_ties_even() as u16);
        }

        assert_eq!(cycle.phase(), GaitPhase::BackwardStance);
        let upper = driver.table().joint(Leg::FrontLeft, JointRole::Upper);
        assert_eq!(upper.current_position(), 1593.75 - 50.0);
    }

    #[test]
    fn test_backward_stance_sequence() {
        let mut driver = test_driver();
        let mut cycle = LegCycle::new(Leg::FrontRight);
        cycle.step(&mut driver, &PLAN);

        // FR lower channel 0 (polarity +1), upper channel 1 (polarity +1)
        let targets = driver.bus().transport().targets();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0], (0, ((1615.875 + 50.0) * 4.0_f64).round_ties_even() as u16));
        assert_eq!(targets[1], (1, ((1615.75 - 50.0) * 4.0_f64).round_ties_even() as u16));
        assert_eq!(cycle.phase(), GaitPhase::ForwardSwing);
    }

    #[test]
    fn test_full_cycle_is_periodic() {
        let mut driver = test_driver();
        let mut cycle = LegCycle::new(Leg::FrontLeft);
        let upper = |d: &LegDriver<_>| {
            let joint = d.table().joint(Leg::FrontLeft, JointRole::Upper);
            (joint.current_position(), joint.phase())
        };

        // settle into the cycle once
        cycle.step(&mut driver, &PLAN);
        cycle.step(&mut driver, &PLAN);
        let (start_pos, start_phase) = upper(&driver);
        assert_eq!(cycle.phase(), GaitPhase::ForwardSwing);

        cycle.step(&mut driver, &PLAN);
        let (_, mid_phase) = upper(&driver);
        assert_ne!(mid_phase, start_phase);

        cycle.step(&mut driver, &PLAN);
        let (end_pos, end_phase) = upper(&driver);
        assert_eq!(end_pos, start_pos);
        assert_eq!(end_phase, start_phase);
        assert_eq!(cycle.phase(), GaitPhase::ForwardSwing);
    }

    #[test]
    fn test_phase_toggles_once_per_step() {
        let mut driver = test_driver();
        let mut cycle = LegCycle::new(Leg::BackRight);
        let phase = |d: &LegDriver<_>| d.table().joint(Leg::BackRight, JointRole::Upper).phase();

        assert_eq!(phase(&driver), SwingPhase::Uninitialized);
        cycle.step(&mut driver, &PLAN);
        assert_eq!(phase(&driver), SwingPhase::Forward);
        cycle.step(&mut driver, &PLAN);
        assert_eq!(phase(&driver), SwingPhase::Backward);
    }

    #[test]
    fn test_reversed_plan_swings_other_way() {
        let mut forward = test_driver();
        let mut backward = test_driver();
        LegCycle::new(Leg::BackRight).step(&mut forward, &PLAN);
        LegCycle::new(Leg::BackRight).step(&mut backward, &PLAN.reversed());

        let neutral = forward.table().joint(Leg::BackRight, JointRole::Upper).neutral();
        let f = forward.table().joint(Leg::BackRight, JointRole::Upper).current_position();
        let b = backward.table().joint(Leg::BackRight, JointRole::Upper).current_position();
        assert_eq!(f - neutral, neutral - b);
        assert!(f > neutral);
    }

    #[test]
    fn test_reset_restores_bias() {
        let mut driver = test_driver();
        let mut cycle = LegCycle::new(Leg::BackLeft);
        cycle.step(&mut driver, &PLAN);
        assert_eq!(cycle.phase(), GaitPhase::ForwardSwing);
        cycle.reset();
        assert_eq!(cycle.phase(), GaitPhase::BackwardStance);
    }
}
