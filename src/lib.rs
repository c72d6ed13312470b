pub mod config;
pub mod controller;
pub mod gait;
pub mod messages;
pub mod runtime;
pub mod servo;

pub use controller::Quadruped;
