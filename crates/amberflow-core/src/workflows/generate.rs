use super::options::RunOptions;
use super::report::{RunReport, RunStatus};
use crate::core::config::{RawParams, SimulationConfig};
use crate::core::deck;
use crate::core::layout::RunLayout;
use crate::core::stage::Stage;
use crate::engine::error::PipelineError;
use tracing::{info, instrument, warn};

/// Dry run: validates `params`, creates the run directory and writes every
/// stage deck, chaining each on the expected outputs of the stage before it.
///
/// Nothing is discovered or executed, so neither the preparation tool nor an
/// engine needs to be installed.
#[instrument(skip_all, name = "generate_workflow", fields(structure = %params.structure_path.display()))]
pub fn run(params: &RawParams, options: &RunOptions) -> RunReport {
    let config = match SimulationConfig::build(params, &options.results_root) {
        Ok(config) => config,
        Err(e) => {
            let err = PipelineError::from(e);
            warn!("Run rejected: {}", err);
            return RunReport::from_error(&err);
        }
    };

    let layout = RunLayout::new(config.output_dir());
    match deck::generate_through(&config, &layout, Stage::ProdNpt) {
        Ok(decks) => {
            info!("Wrote {} input decks to {:?}", decks.len(), layout.root());
            let mut report = RunReport::new(RunStatus::Success).with_config(config);
            report.decks = decks;
            report
        }
        Err(e) => {
            let err = PipelineError::from(e);
            warn!("Deck generation failed: {}", err);
            RunReport::from_error(&err).with_config(config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn writes_all_six_decks_without_running_anything() {
        let dir = tempdir().unwrap();
        let structure = dir.path().join("1l2y.pdb");
        fs::write(&structure, "ATOM      1  N   ASN A   1\nEND\n").unwrap();
        let mut params = RawParams::new(&structure, 10.0);
        params.job_name = Some("trpcage".to_string());

        let report = run(&params, &RunOptions::new(dir.path().join("results")));

        assert_eq!(report.status, RunStatus::Success);
        let out_dir = report.output_dir.clone().unwrap();
        assert!(out_dir.file_name().unwrap().to_string_lossy().starts_with("md_trpcage_"));
        let names: Vec<_> = report
            .decks
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            [
                "prep.in",
                "min_restrained.in",
                "min_free.in",
                "heat_nvt.in",
                "equil_npt.in",
                "prod_npt.in"
            ]
        );
        let prod = fs::read_to_string(out_dir.join("prod_npt.in")).unwrap();
        assert!(prod.contains("nstlim=5000000,"));
        assert!(report.stages.is_empty());
        assert!(report.summary_path.is_none());
        assert_eq!(fs::read_dir(&out_dir).unwrap().count(), 6);
    }

    #[test]
    fn invalid_parameters_produce_no_directory() {
        let dir = tempdir().unwrap();
        let results = dir.path().join("results");
        let report = run(
            &RawParams::new(dir.path().join("absent.pdb"), 1.0),
            &RunOptions::new(&results),
        );
        assert!(matches!(report.status, RunStatus::ValidationFailed { .. }));
        assert!(!results.exists());
    }
}
