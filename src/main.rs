use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use quadruped_gait_runtime::Quadruped;
use quadruped_gait_runtime::config::RobotConfig;
use quadruped_gait_runtime::gait::{Direction, Intensity};
use quadruped_gait_runtime::runtime;
use quadruped_gait_runtime::servo::{Leg, Transport};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Parser)]
#[command(version, about = "Quadruped gait runtime for a Maestro servo controller")]
struct Cli {
    /// JSON robot file (calibration, geometry, timing); defaults to the reference rig
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Serial port of the controller, overrides the config file
    #[arg(long, global = true)]
    port: Option<String>,

    /// Log frames instead of opening the serial port
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Move every joint to its neutral position
    Stand,
    /// Trot for a number of gait ticks, then stand
    Walk {
        #[arg(value_enum, default_value_t = WalkDirection::Forward)]
        direction: WalkDirection,
        #[arg(short, long, default_value_t = Intensity::MIN, value_parser = parse_intensity)]
        intensity: Intensity,
        #[arg(short, long, default_value_t = 4)]
        ticks: u32,
    },
    /// Step one leg through the IK foot path
    Trace {
        #[arg(value_parser = parse_leg)]
        leg: Leg,
        #[arg(short, long, default_value_t = Intensity::MIN, value_parser = parse_intensity)]
        intensity: Intensity,
    },
    /// Make every servo go limp
    Disable,
    /// Follow gait commands from zenoh
    Run,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WalkDirection {
    Forward,
    Backward,
}

fn parse_intensity(s: &str) -> Result<Intensity, String> {
    let level: u8 = s.parse().map_err(|e| format!("{}", e))?;
    Intensity::new(level).map_err(|e| e.to_string())
}

fn parse_leg(s: &str) -> Result<Leg, String> {
    s.parse::<Leg>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    if let Err(e) = start(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn start(cli: Cli) -> Result<(), BoxError> {
    let mut config = match &cli.config {
        Some(path) => RobotConfig::load(path)?,
        None => RobotConfig::default(),
    };
    if let Some(port) = cli.port {
        config.port = port;
    }

    // Calibration is validated before anything is sent
    if cli.dry_run {
        execute(Quadruped::dry_run(&config)?, cli.command).await
    } else {
        execute(Quadruped::connect(&config)?, cli.command).await
    }
}

async fn execute<T: Transport>(mut robot: Quadruped<T>, command: Command) -> Result<(), BoxError> {
    match command {
        Command::Stand => robot.neutral_standing_position(),
        Command::Walk {
            direction,
            intensity,
            ticks,
        } => {
            let direction = match direction {
                WalkDirection::Forward => Direction::Forward,
                WalkDirection::Backward => Direction::Backward,
            };
            robot.neutral_standing_position();
            for tick in 0..ticks {
                info!("Gait tick {}/{}", tick + 1, ticks);
                robot.walk(direction, intensity);
            }
            robot.neutral_standing_position();
        }
        Command::Trace { leg, intensity } => {
            robot.neutral_standing_position();
            robot.trace_foot_path(leg, intensity);
        }
        Command::Disable => {
            let report = robot.disable_all_servos();
            if !report.is_complete() {
                return Err(format!("failed to disable channels {:?}", report.failed).into());
            }
        }
        Command::Run => runtime::run(robot).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_intensity_is_parsed_once() {
        let cli = Cli::try_parse_from(["quadruped", "walk", "backward", "-i", "7"]).unwrap();
        match cli.command {
            Command::Walk { intensity, .. } => assert_eq!(intensity, Intensity::new(7).unwrap()),
            other => panic!("unexpected command {:?}", other),
        }

        assert!(Cli::try_parse_from(["quadruped", "walk", "-i", "11"]).is_err());
        assert!(Cli::try_parse_from(["quadruped", "trace", "FL", "-i", "0"]).is_err());
    }

    #[test]
    fn test_intensity_defaults_to_minimum() {
        let cli = Cli::try_parse_from(["quadruped", "trace", "br"]).unwrap();
        match cli.command {
            Command::Trace { leg, intensity } => {
                assert_eq!(leg, Leg::BackRight);
                assert_eq!(intensity, Intensity::MIN);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
