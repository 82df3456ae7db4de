//! Operator-facing CLI commands.

pub mod status;
pub mod workflows;
