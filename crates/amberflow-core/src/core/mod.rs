//! # Core Module
//!
//! Validated, side-effect-light building blocks of a simulation run.
//!
//! - **Configuration** ([`config`]) - Raw caller parameters and the immutable
//!   `SimulationConfig` they resolve into
//! - **Stages** ([`stage`]) - The fixed stage sequence, its policy constants and
//!   per-stage results
//! - **Layout** ([`layout`]) - Deterministic file naming inside a run directory
//! - **Environment Sources** ([`env_source`]) - Parser for `export KEY=VALUE` files
//! - **Input Decks** ([`deck`]) - Template-based generation of engine input files

pub mod config;
pub mod deck;
pub mod env_source;
pub mod layout;
pub mod stage;
