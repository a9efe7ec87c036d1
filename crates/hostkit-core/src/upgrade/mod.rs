//! # Upgrade Module
//!
//! The resumable, multi-phase OS upgrade:
//! - `plan`: the phase chain and next-step decision
//! - `state`: the persisted completion marker
//! - `preflight`: gates run before any mutation
//! - `sequencer`: drives one phase per invocation

mod plan;
mod preflight;
mod sequencer;
mod state;

pub use plan::*;
pub use preflight::*;
pub use sequencer::*;
pub use state::*;
