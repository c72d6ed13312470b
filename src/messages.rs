// Message types exchanged with teleop/scripts over zenoh

use serde::{Deserialize, Serialize};

use crate::gait::{GaitPhase, Intensity};
use crate::servo::{Leg, SwingPhase};

/// What the robot should do on the next gait tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GaitAction {
    WalkForward,
    WalkBackward,
    Stand,
    Disable,
}

// Command from teleop/scripts -> runtime
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaitCommand {
    pub action: GaitAction,
    #[serde(default = "default_intensity")]
    pub intensity: Intensity,
}

fn default_intensity() -> Intensity {
    Intensity::MIN
}

impl GaitCommand {
    pub fn new(action: GaitAction, intensity: Intensity) -> Self {
        Self { action, intensity }
    }
}

/// Per-leg state published after every tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegTelemetry {
    pub leg: Leg,
    pub phase: GaitPhase,
    pub swing: SwingPhase,
    pub upper: f64,
    pub lower: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaitTelemetry {
    pub legs: Vec<LegTelemetry>,
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
}
