//! # Engine Module
//!
//! Runs the fixed stage sequence as external processes.
//!
//! ## Overview
//!
//! The engine finds the preparation tool and the best available MD engine,
//! assembles the environment they run under, and drives each stage through its
//! `Pending → Running → Succeeded | Failed` lifecycle. Stages run strictly in
//! order and the first failure halts the pipeline; everything a stage wrote
//! stays on disk.
//!
//! ## Architecture
//!
//! - **Errors** ([`error`]) - The run-level error taxonomy
//! - **Discovery** ([`discovery`]) - Engine preference and executable lookup
//! - **Environment** ([`environment`]) - Subprocess environment assembly
//! - **State Tracking** ([`state`]) - Per-stage lifecycle records
//! - **Execution** ([`executor`]) - Command lines and supervised subprocesses
//! - **Pipeline** ([`pipeline`]) - The ordered stage loop
//! - **Progress Monitoring** ([`progress`]) - Callbacks for front ends
//! - **Cancellation** ([`cancel`]) - Cooperative stop requests

pub mod cancel;
pub mod discovery;
pub mod environment;
pub mod error;
pub mod executor;
pub mod pipeline;
pub mod progress;
pub mod state;
