// Keyboard teleop: W/S walk forward/backward, SPACE stand, X go limp,
// R/F intensity up/down, Q quit
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use quadruped_gait_runtime::config::TOPIC_CMD_GAIT;
use quadruped_gait_runtime::gait::Intensity;
use quadruped_gait_runtime::messages::{GaitAction, GaitCommand};
use std::time::{Duration, Instant};
use tracing::info;

const INPUT_TIMEOUT_MS: u64 = 300; // Fall back to standing after this much time with no input
const PUBLISH_PERIOD_MS: u64 = 100;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD_GAIT).await?;

    info!("Controls: W/S=walk, SPACE=stand, X=limp, R/F=intensity, Q=quit");
    info!("Intensity: {}", Intensity::MIN);

    enable_raw_mode()?;
    let result = run_teleop(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut level: u8 = 1;
    let mut action = GaitAction::Stand;
    let mut last_walk_input = Instant::now();

    loop {
        if event::poll(Duration::from_millis(PUBLISH_PERIOD_MS))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;

                match code {
                    KeyCode::Char('w') if pressed => {
                        action = GaitAction::WalkForward;
                        last_walk_input = Instant::now();
                    }
                    KeyCode::Char('s') if pressed => {
                        action = GaitAction::WalkBackward;
                        last_walk_input = Instant::now();
                    }
                    KeyCode::Char(' ') if pressed => action = GaitAction::Stand,
                    KeyCode::Char('x') if pressed => action = GaitAction::Disable,

                    // Intensity control
                    KeyCode::Char('r') if pressed => {
                        level = (level + 1).min(10);
                        info!("Intensity: {}", level);
                    }
                    KeyCode::Char('f') if pressed => {
                        level = level.saturating_sub(1).max(1);
                        info!("Intensity: {}", level);
                    }

                    // Quit
                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => {}
                }
            }
        }

        // Stop walking if no walk key for INPUT_TIMEOUT_MS
        let walking = matches!(action, GaitAction::WalkForward | GaitAction::WalkBackward);
        if walking && last_walk_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            action = GaitAction::Stand;
        }

        let cmd = GaitCommand::new(action, Intensity::new(level)?);
        publisher.put(serde_json::to_string(&cmd)?).await?;
    }

    Ok(())
}
