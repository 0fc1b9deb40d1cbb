//! # amberflow Core Library
//!
//! Orchestration of multi-stage molecular-dynamics runs driven through the Amber
//! tool suite: system preparation, two minimizations, heating, equilibration and
//! production, each executed by an external engine binary.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless, validated data: the immutable
//!   `SimulationConfig`, the fixed `Stage` sequence, the on-disk `RunLayout`, the
//!   environment-source parser and the input-deck generator. Nothing here spawns a
//!   process.
//!
//! - **[`engine`]: The Logic Core.** Engine discovery, environment assembly, the
//!   per-stage state machine and subprocess execution, including cancellation and
//!   progress reporting.
//!
//! - **[`workflows`]: The Public API.** End-to-end procedures (`simulate`,
//!   `prepare`, `generate`) that tie the layers together and fold every failure
//!   into a typed `RunStatus`.

pub mod core;
pub mod engine;
pub mod workflows;
