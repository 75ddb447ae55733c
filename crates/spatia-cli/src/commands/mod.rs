//! CLI command implementations.

pub mod common;
pub mod config;
pub mod devices;
pub mod preview;
pub mod process;
pub mod yaw;
