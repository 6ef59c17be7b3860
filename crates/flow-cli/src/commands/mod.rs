//! Subcommand implementations

pub mod alerts;
pub mod maintenance;
pub mod network;
pub mod predict;
