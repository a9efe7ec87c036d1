//! # hostkit
//!
//! Application layer: CLI, configuration and the host adapters that give
//! `hostkit-core` its effects.

pub mod cli;
pub mod config;
pub mod system;
