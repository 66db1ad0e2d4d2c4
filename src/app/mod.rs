//! Application layer: configuration and CLI commands.

pub mod commands;
pub mod config;
