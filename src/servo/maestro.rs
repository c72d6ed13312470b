// Pololu Maestro compact serial protocol
//
// Every command is a fixed 4-byte frame:
// [opcode, channel, value & 0x7F, (value >> 7) & 0x7F]
// Positions are in quarter-microseconds.

use serialport::{self, SerialPort};
use std::io::Write;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::config::{MAX_ACCELERATION, MAX_VELOCITY};

/// Default serial configuration for the Maestro command port
pub const DEFAULT_BAUDRATE: u32 = 9600;
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

/// Raw target value that makes a servo stop holding torque
pub const DISABLE_SENTINEL: u16 = 0xFFFF;

/// Largest value two 7-bit fields can carry
const MAX_FRAME_VALUE: u16 = 0x3FFF;

pub type Frame = [u8; 4];

/// Command opcodes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    SetTarget = 0x84,
    SetSpeed = 0x87,
    SetAcceleration = 0x89,
}

/// Error types for Maestro communication
#[derive(Debug, thiserror::Error)]
pub enum MaestroError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("Write to channel {channel} failed: {source}")]
    Io {
        channel: u8,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, MaestroError>;

/// Byte sink the frames are written to
pub trait Transport {
    fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<()>;
}

/// Serial connection to the controller
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open a new connection to the controller
    pub fn open(port_name: &str) -> Result<Self> {
        Self::open_with_baudrate(port_name, DEFAULT_BAUDRATE)
    }

    /// Open with custom baudrate
    pub fn open_with_baudrate(port_name: &str, baudrate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .open()?;

        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<()> {
        self.port.write_all(frame)?;
        self.port.flush()
    }
}

/// Dry-run sink: frames only go to the log
#[derive(Debug, Default)]
pub struct LoggingTransport;

impl Transport for LoggingTransport {
    fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<()> {
        debug!("Dry run frame: {:02X?}", frame);
        Ok(())
    }
}

/// Where a servo should go
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ServoTarget {
    /// Pulse width in microseconds
    Position(f64),
    /// Go limp
    Disable,
}

impl ServoTarget {
    /// Value carried by the target frame (quarter-microseconds or the sentinel)
    pub fn to_raw(self) -> u16 {
        match self {
            ServoTarget::Disable => DISABLE_SENTINEL,
            ServoTarget::Position(us) => {
                let quarters = (us * 4.0).round_ties_even();
                if !(0.0..=MAX_FRAME_VALUE as f64).contains(&quarters) {
                    warn!(
                        "Target {}us is outside the controller range, clamping",
                        us
                    );
                }
                quarters.clamp(0.0, MAX_FRAME_VALUE as f64) as u16
            }
        }
    }
}

/// One fully-resolved servo command
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionCommand {
    pub channel: u8,
    pub target: ServoTarget,
    pub speed: u16,
    pub acceleration: u16,
}

impl MotionCommand {
    /// Build a command, clamping speed and acceleration to the controller limits
    pub fn new(channel: u8, target: ServoTarget, speed: u16, acceleration: u16) -> Self {
        Self {
            channel,
            target,
            speed: speed.min(MAX_VELOCITY),
            acceleration: acceleration.min(MAX_ACCELERATION),
        }
    }

    /// Speed, acceleration and target frames, in send order
    pub fn frames(&self) -> [Frame; 3] {
        [
            encode_frame(Opcode::SetSpeed, self.channel, self.speed),
            encode_frame(Opcode::SetAcceleration, self.channel, self.acceleration),
            encode_frame(Opcode::SetTarget, self.channel, self.target.to_raw()),
        ]
    }
}

/// Pack a value into the low/high 7-bit fields of a frame
pub fn encode_frame(opcode: Opcode, channel: u8, value: u16) -> Frame {
    [
        opcode as u8,
        channel,
        (value & 0x7F) as u8,
        ((value >> 7) & 0x7F) as u8,
    ]
}

/// Inverse of the 7-bit packing
pub fn decode_value(low: u8, high: u8) -> u16 {
    (low as u16 & 0x7F) | ((high as u16 & 0x7F) << 7)
}

/// Maestro controller - encodes commands and writes them to a transport
pub struct MaestroBus<T: Transport> {
    transport: T,
}

impl MaestroBus<SerialTransport> {
    /// Open a serial connection to the controller
    pub fn open(port_name: &str, baudrate: u32) -> Result<Self> {
        Ok(Self::new(SerialTransport::open_with_baudrate(
            port_name, baudrate,
        )?))
    }
}

impl<T: Transport> MaestroBus<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send a command, stopping at the first frame that fails to write
    pub fn send(&mut self, command: &MotionCommand) -> Result<()> {
        debug!(
            "Channel {}: target={:?}, speed={}, accel={}",
            command.channel, command.target, command.speed, command.acceleration
        );
        for frame in command.frames() {
            self.transport
                .write_frame(&frame)
                .map_err(|source| MaestroError::Io {
                    channel: command.channel,
                    source,
                })?;
        }
        Ok(())
    }

    /// Set speed, acceleration and target of one channel, reporting failures
    pub fn try_set_target(
        &mut self,
        channel: u8,
        target: ServoTarget,
        speed: u16,
        acceleration: u16,
    ) -> Result<()> {
        self.send(&MotionCommand::new(channel, target, speed, acceleration))
    }

    /// Fire-and-forget variant: a failed write is logged and the call returns
    /// normally so one unreachable joint cannot stall the gait.
    pub fn set_target(&mut self, channel: u8, target: ServoTarget, speed: u16, acceleration: u16) {
        if let Err(e) = self.try_set_target(channel, target, speed, acceleration) {
            error!("Failed to move servo: {}", e);
        }
    }
}
