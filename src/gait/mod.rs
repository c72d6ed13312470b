// Gait generation
//
// Provides:
// - Two-link leg inverse kinematics
// - Intensity -> speed/acceleration/arc mapping
// - Per-leg swing/stance state machine
// - Trot orchestration across the four legs

pub mod cycle;
pub mod intensity;
pub mod kinematics;
pub mod trot;

pub use cycle::{GaitPhase, LegCycle, StepPlan};
pub use intensity::{
    Intensity, IntensityError, interpret_intensity, interpret_intensity_with_limits,
};
pub use kinematics::inverse_kinematics;
pub use trot::{Direction, TROT_ORDER, TrotGait, synchronized_plan};
