use crate::cli::SimulationArgs;
use crate::config::builder::build_request;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use amberflow::engine::cancel::CancelToken;
use amberflow::engine::progress::ProgressReporter;
use amberflow::workflows;
use tracing::info;

pub async fn run(args: SimulationArgs, cancel: CancelToken) -> Result<()> {
    let request = build_request(&args)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!(
        "Preparing solvated system for {}",
        request.params.structure_path.display()
    );
    let report =
        workflows::prepare::run(&request.params, &request.options, &reporter, &cancel).await;

    super::finish(&report, request.json)
}
