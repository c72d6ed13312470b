// Gait loop with watchdog
// Note: if teleop stops sending commands the robot must not keep walking, so
// a stale command brings it back to the neutral stance once.

use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::{info, warn};

use crate::config::{CMD_TIMEOUT, LOOP_HZ, TOPIC_CMD_GAIT, TOPIC_GAIT_STATE, TOPIC_HEALTH};
use crate::controller::Quadruped;
use crate::gait::Intensity;
use crate::messages::{GaitAction, GaitCommand, RuntimeHealth};
use crate::servo::Transport;

/// What the next tick should do to the robot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    Walk(GaitAction, Intensity),
    Stand,
    Disable,
    Idle,
}

pub struct Runtime {
    latest_cmd: Option<GaitCommand>,
    cmd_received_at: Instant,
    cmd_timeout: Duration,
    health: RuntimeHealth,
    // last pose-changing action that was applied
    settled: Option<TickAction>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(CMD_TIMEOUT)
    }
}

impl Runtime {
    pub fn new(cmd_timeout: Duration) -> Self {
        Self {
            latest_cmd: None,
            cmd_received_at: Instant::now(),
            cmd_timeout,
            health: RuntimeHealth::CmdStale, // Start stale until first cmd
            settled: None,
        }
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    /// Process incoming command
    pub fn on_command(&mut self, cmd: GaitCommand) {
        info!("Received command: {:?}", &cmd);
        self.latest_cmd = Some(cmd);
        self.cmd_received_at = Instant::now();
    }

    /// Decide the next action based on watchdog state
    ///
    /// Walking repeats every tick; standing and disabling are applied once
    /// and then the runtime idles until something changes.
    pub fn next_action(&mut self) -> TickAction {
        let cmd_age = self.cmd_received_at.elapsed();

        let wanted = match self.latest_cmd {
            Some(cmd) if cmd_age <= self.cmd_timeout => {
                self.health = RuntimeHealth::Ok;
                match cmd.action {
                    GaitAction::WalkForward | GaitAction::WalkBackward => {
                        TickAction::Walk(cmd.action, cmd.intensity)
                    }
                    GaitAction::Stand => TickAction::Stand,
                    GaitAction::Disable => TickAction::Disable,
                }
            }
            _ => {
                // Watchdog triggered (or nothing received yet) - stop walking
                if self.health != RuntimeHealth::CmdStale {
                    warn!("Command stale ({:?} old), standing still", cmd_age);
                }
                self.health = RuntimeHealth::CmdStale;
                // a limp robot stays limp
                if self.settled == Some(TickAction::Disable) {
                    TickAction::Disable
                } else {
                    TickAction::Stand
                }
            }
        };

        match wanted {
            TickAction::Walk(..) => {
                self.settled = None;
                wanted
            }
            _ if self.settled == Some(wanted) => TickAction::Idle,
            _ => {
                self.settled = Some(wanted);
                wanted
            }
        }
    }
}

/// Apply one tick to the robot (blocking)
pub fn apply<T: Transport>(robot: &mut Quadruped<T>, action: TickAction) {
    match action {
        TickAction::Walk(GaitAction::WalkBackward, intensity) => robot.walk_backward(intensity),
        TickAction::Walk(_, intensity) => robot.walk_forward(intensity),
        TickAction::Stand => robot.neutral_standing_position(),
        TickAction::Disable => {
            robot.disable_all_servos();
        }
        TickAction::Idle => {}
    }
}

/// Wait for the next tick; false once `shutdown` has completed, even if it
/// completed while nobody was waiting
async fn wait_tick<F: Future + Unpin>(tick: &mut Interval, shutdown: &mut F) -> bool {
    tokio::select! {
        biased;
        _ = shutdown => false,
        _ = tick.tick() => true,
    }
}

pub async fn run<T: Transport>(
    mut robot: Quadruped<T>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let subscriber = session.declare_subscriber(TOPIC_CMD_GAIT).await?;
    let pub_state = session.declare_publisher(TOPIC_GAIT_STATE).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let mut runtime = Runtime::default();
    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));
    // a gait tick can outlast the period; never burst to catch up
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        "Runtime started: {}Hz loop, {}ms watchdog timeout",
        LOOP_HZ,
        CMD_TIMEOUT.as_millis()
    );
    info!("Subscribed to: {}", TOPIC_CMD_GAIT);
    info!("Publishing to: {}, {}", TOPIC_GAIT_STATE, TOPIC_HEALTH);

    // one listener for the whole loop so a signal during a blocking tick is kept
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        if !wait_tick(&mut tick, &mut ctrl_c).await {
            info!("Shutting down, disabling servos");
            robot.disable_all_servos();
            return Ok(());
        }

        // 1. Drain all pending commands (non-blocking), keep latest
        while let Ok(Some(sample)) = subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<GaitCommand>(&payload) {
                Ok(cmd) => {
                    runtime.on_command(cmd);
                }
                Err(e) => {
                    warn!("Failed to parse command: {}", e);
                }
            }
        }

        // 2. Decide and apply (servo waits block this thread)
        let action = runtime.next_action();
        tokio::task::block_in_place(|| apply(&mut robot, action));

        // 3. Publish gait state
        let state_json = serde_json::to_string(&robot.telemetry())?;
        pub_state.put(state_json).await?;

        // 4. Publish health
        let health_json = serde_json::to_string(&runtime.health())?;
        pub_health.put(health_json).await?;
    }
}
