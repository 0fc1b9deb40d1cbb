use crate::cli::SimulationArgs;
use crate::config::builder::build_request;
use crate::error::Result;
use amberflow::workflows;
use tracing::info;

pub fn run(args: SimulationArgs) -> Result<()> {
    let request = build_request(&args)?;

    info!("Writing input decks without executing any stage.");
    let report = workflows::generate::run(&request.params, &request.options);

    super::finish(&report, request.json)
}
