use super::options::RunOptions;
use super::report::RunReport;
use super::simulate::run_stages;
use crate::core::config::RawParams;
use crate::core::stage::Stage;
use crate::engine::cancel::CancelToken;
use crate::engine::progress::ProgressReporter;
use tracing::instrument;

/// Runs only the preparation stage: solvation, neutralization and topology.
///
/// No MD engine is needed. On success the report carries the topology, the
/// starting coordinates and the solvated structure with its atom count.
#[instrument(skip_all, name = "prepare_workflow", fields(structure = %params.structure_path.display()))]
pub async fn run(
    params: &RawParams,
    options: &RunOptions,
    reporter: &ProgressReporter<'_>,
    cancel: &CancelToken,
) -> RunReport {
    run_stages(params, options, reporter, cancel, Stage::Prep).await
}
