//! berth-core — wire format and configuration shared by all berth crates.

pub mod config;
pub mod wire;

pub use config::BerthConfig;
pub use wire::{AssignedTask, DecodeError, EncodeError};
