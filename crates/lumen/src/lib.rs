//! Membership, dues and ceremony management for a religious brotherhood.

pub mod brotherhood;
pub mod config;
pub mod error;
pub mod telemetry;
