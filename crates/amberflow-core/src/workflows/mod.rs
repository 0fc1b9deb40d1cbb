//! # Workflows Module
//!
//! Public entry points. Each workflow takes unvalidated [`RawParams`] plus
//! [`RunOptions`] and never returns a bare error: every outcome, including
//! invalid input, is folded into a [`RunReport`] whose [`RunStatus`] tells the
//! caller what happened.
//!
//! - [`simulate`] - the full six-stage pipeline
//! - [`prepare`] - the preparation stage only
//! - [`generate`] - a dry run that writes every input deck without executing anything
//!
//! [`RawParams`]: crate::core::config::RawParams

pub mod generate;
pub mod options;
pub mod prepare;
pub mod report;
pub mod simulate;

#[cfg(all(test, unix))]
mod testing;

pub use options::RunOptions;
pub use report::{RunReport, RunStatus};
