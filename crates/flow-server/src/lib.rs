//! HTTP service for the pipeline network monitor

pub mod api;
pub mod config;
pub mod error;
