pub mod generate;
pub mod prepare;
pub mod run;
mod summary;

use crate::error::{CliError, Result};
use amberflow::workflows::RunReport;

/// Prints `report` (as JSON or a human summary) and maps a failed status to an error.
fn finish(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", summary::render(report));
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::RunFailed(report.status.to_string()))
    }
}
