//! # Emberfall Sandbox
//!
//! Headless harness for the combat core:
//! - TOML scenario files (player, spawns, scripted actions)
//! - A runner that ticks a `CombatSimulation` and collects stamped events

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod runner;
pub mod scenario;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::runner::*;
    pub use crate::scenario::*;
}

pub use prelude::*;
