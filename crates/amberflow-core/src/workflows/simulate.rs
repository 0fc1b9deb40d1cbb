use super::options::RunOptions;
use super::report::RunReport;
use crate::core::config::{RawParams, SimulationConfig};
use crate::core::stage::Stage;
use crate::engine::cancel::CancelToken;
use crate::engine::discovery::discover_toolchain;
use crate::engine::environment::EngineEnvironment;
use crate::engine::error::PipelineError;
use crate::engine::pipeline::Pipeline;
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::{info, instrument, warn};

/// Runs the full pipeline, `prep` through `prod_npt`.
#[instrument(skip_all, name = "simulate_workflow", fields(structure = %params.structure_path.display()))]
pub async fn run(
    params: &RawParams,
    options: &RunOptions,
    reporter: &ProgressReporter<'_>,
    cancel: &CancelToken,
) -> RunReport {
    run_stages(params, options, reporter, cancel, Stage::ProdNpt).await
}

pub(crate) async fn run_stages(
    params: &RawParams,
    options: &RunOptions,
    reporter: &ProgressReporter<'_>,
    cancel: &CancelToken,
    last: Stage,
) -> RunReport {
    // === Phase 1: Validate parameters and create the run directory ===
    let config = match SimulationConfig::build(params, &options.results_root) {
        Ok(config) => config,
        Err(e) => {
            let err = PipelineError::from(e);
            warn!("Run rejected: {}", err);
            return RunReport::from_error(&err);
        }
    };
    reporter.report(Progress::Message(format!(
        "Run directory: {}",
        config.output_dir().display()
    )));

    // === Phase 2: Assemble the environment and find the executables ===
    let environment = match EngineEnvironment::assemble(
        &options.base_environment,
        options.environment_source.as_deref(),
        config.output_dir(),
        config.gpu_device(),
    ) {
        Ok(environment) => environment,
        Err(e) => {
            let err = PipelineError::from(e);
            warn!("Environment assembly failed: {}", err);
            return RunReport::from_error(&err).with_config(config);
        }
    };

    let toolchain = match discover_toolchain(&environment, config.gpu_device().is_some(), last) {
        Ok(toolchain) => toolchain,
        Err(err) => {
            warn!("Discovery failed: {}", err);
            return RunReport::from_error(&err).with_config(config);
        }
    };
    if let Some(selected) = &toolchain.engine {
        reporter.report(Progress::Message(format!("Using {}", selected.engine)));
    }

    // === Phase 3: Execute the stages ===
    let outcome = Pipeline::new(&config, &toolchain, &environment, reporter)
        .run_through(last, cancel)
        .await;

    // === Phase 4: Report ===
    let mut report = RunReport::from_outcome(config, toolchain.engine, outcome);
    if let Err(e) = report.write_summary() {
        warn!("Could not write run summary: {}", e);
        if report.is_success() {
            report.status = (&PipelineError::Filesystem(e)).into();
        }
    }
    info!(status = %report.status, "Workflow finished.");
    report
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::engine::cancel::cancel_pair;
    use crate::engine::discovery::Engine;
    use crate::engine::error::StageFailure;
    use crate::engine::state::StageState;
    use crate::workflows::report::RunStatus;
    use crate::workflows::testing::FakeSuite;
    use std::fs;

    const ALL_STAGE_NAMES: [&str; 6] = [
        "prep",
        "min_restrained",
        "min_free",
        "heat_nvt",
        "equil_npt",
        "prod_npt",
    ];

    fn expected_calls(engine: &str) -> Vec<String> {
        ALL_STAGE_NAMES
            .iter()
            .map(|stage| {
                let tool = if *stage == "prep" { "tleap" } else { engine };
                format!("{} {}", tool, stage)
            })
            .collect()
    }

    async fn simulate(suite: &FakeSuite, params: &RawParams) -> RunReport {
        run(
            params,
            &suite.options(),
            &ProgressReporter::new(),
            &CancelToken::never(),
        )
        .await
    }

    #[tokio::test]
    async fn cpu_run_produces_six_stage_outputs_in_order() {
        let suite = FakeSuite::with_full_install();
        let mut params = suite.params(1.0);
        params.water_model = Some("opc".to_string());

        let report = simulate(&suite, &params).await;

        assert_eq!(report.status, RunStatus::Success);
        assert_eq!(suite.calls(), expected_calls("pmemd"));
        assert_eq!(report.engine.as_ref().map(|e| e.engine), Some(Engine::Pmemd));
        assert_eq!(report.stages.len(), 6);
        assert!(report.stages.iter().all(|r| r.state == StageState::Succeeded));
        for record in &report.stages {
            let result = record.result.as_ref().unwrap();
            assert!(result.succeeded());
            assert!(result.coordinates.as_ref().unwrap().is_file());
        }

        let trajectory = report.final_trajectory_path.clone().unwrap();
        assert!(trajectory.ends_with("prod_npt.nc"));
        assert!(fs::metadata(&trajectory).unwrap().len() > 0);
        assert!(report.final_coordinates_path.as_ref().unwrap().ends_with("prod_npt.rst7"));
        assert_eq!(report.solvated_atoms, Some(3));
        assert_eq!(report.decks.len(), 6);

        let summary = report.summary_path.clone().unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(summary).unwrap()).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["engine"]["engine"], "pmemd");
        assert_eq!(json["stages"][5]["state"], "succeeded");
    }

    #[tokio::test]
    async fn gpu_engine_is_preferred_and_sees_only_its_device() {
        let suite = FakeSuite::with_full_install();
        let mut params = suite.params(0.5);
        params.gpu_device = Some("cuda:1".to_string());

        let report = simulate(&suite, &params).await;

        assert!(report.is_success(), "{}", report.status);
        assert_eq!(suite.calls(), expected_calls("pmemd.cuda"));
        let out_dir = report.output_dir.unwrap();
        let stdout = fs::read_to_string(out_dir.join("prod_npt.out")).unwrap();
        assert!(stdout.contains("CUDA_VISIBLE_DEVICES=1"), "{}", stdout);
    }

    #[tokio::test]
    async fn without_a_gpu_the_cpu_engine_runs_unpinned() {
        let suite = FakeSuite::with_full_install();
        let report = simulate(&suite, &suite.params(1.0)).await;

        let out_dir = report.output_dir.unwrap();
        let stdout = fs::read_to_string(out_dir.join("min_free.out")).unwrap();
        assert!(stdout.contains("CUDA_VISIBLE_DEVICES=unset"), "{}", stdout);
    }

    #[tokio::test]
    async fn sander_is_the_last_resort() {
        let suite = FakeSuite::new();
        suite.install_tleap();
        suite.install_engine("sander");

        let report = simulate(&suite, &suite.params(1.0)).await;

        assert!(report.is_success(), "{}", report.status);
        assert_eq!(suite.calls(), expected_calls("sander"));
    }

    #[tokio::test]
    async fn failing_stage_halts_the_run_and_keeps_earlier_artifacts() {
        let suite = FakeSuite::with_full_install().fail_at("heat_nvt");
        let report = simulate(&suite, &suite.params(1.0)).await;

        match &report.status {
            RunStatus::StageFailed {
                stage,
                exit_code,
                reason,
                log_excerpt,
            } => {
                assert_eq!(*stage, Stage::HeatNvt);
                assert_eq!(*exit_code, Some(7));
                assert_eq!(*reason, StageFailure::NonZeroExit { code: Some(7) });
                assert!(log_excerpt.contains("boom in heat_nvt.in"), "{}", log_excerpt);
            }
            other => panic!("unexpected status {:?}", other),
        }
        assert_eq!(suite.calls(), expected_calls("pmemd")[..4].to_vec());

        let states: Vec<_> = report.stages.iter().map(|r| r.state).collect();
        assert_eq!(
            states,
            [
                StageState::Succeeded,
                StageState::Succeeded,
                StageState::Succeeded,
                StageState::Failed,
                StageState::Pending,
                StageState::Pending,
            ]
        );

        let out_dir = report.output_dir.clone().unwrap();
        assert!(out_dir.join("min_free.rst7").is_file());
        assert!(out_dir.join("heat_nvt.err").is_file());
        assert!(!out_dir.join("equil_npt.in").exists());
        assert!(report.final_trajectory_path.is_none());
        assert!(out_dir.join("run_summary.json").is_file());
    }

    #[tokio::test]
    async fn clean_exit_without_outputs_is_a_stage_failure() {
        let suite = FakeSuite::with_full_install().skip_outputs_at("min_free");
        let report = simulate(&suite, &suite.params(1.0)).await;

        match &report.status {
            RunStatus::StageFailed {
                stage,
                exit_code,
                reason,
                ..
            } => {
                assert_eq!(*stage, Stage::MinFree);
                assert_eq!(*exit_code, Some(0));
                assert!(matches!(reason, StageFailure::MissingOutputs { missing } if missing.len() == 1));
            }
            other => panic!("unexpected status {:?}", other),
        }
        assert_eq!(suite.calls().len(), 3);
        let failed = &report.stages[Stage::MinFree.index()];
        assert_eq!(failed.state, StageState::Failed);
        assert!(!failed.result.as_ref().unwrap().succeeded());
    }

    #[tokio::test]
    async fn missing_engine_aborts_before_any_stage() {
        let suite = FakeSuite::new();
        suite.install_tleap();

        let report = simulate(&suite, &suite.params(1.0)).await;

        assert!(matches!(report.status, RunStatus::EngineNotFound { .. }));
        assert!(suite.calls().is_empty());
        assert!(report.stages.is_empty());
        let out_dir = report.output_dir.unwrap();
        assert!(fs::read_dir(out_dir).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn invalid_parameters_are_reported_without_side_effects() {
        let suite = FakeSuite::with_full_install();
        let mut params = suite.params(1.0);
        params.gpu_device = Some("gpu:0".to_string());

        let report = simulate(&suite, &params).await;

        assert!(matches!(report.status, RunStatus::ValidationFailed { .. }));
        assert!(report.output_dir.is_none());
        assert!(!suite.results.exists());
        assert!(suite.calls().is_empty());
    }

    #[tokio::test]
    async fn environment_source_puts_the_suite_on_the_path() {
        let suite = FakeSuite::with_full_install();
        let source = suite.root().join("amber.sh");
        fs::write(
            &source,
            format!(
                "export AMBERHOME=\"{}\"\nexport PATH=\"$AMBERHOME:$PATH\"\n",
                suite.bin.display()
            ),
        )
        .unwrap();
        let options = suite
            .options_with_path("/usr/bin:/bin")
            .with_environment_source(&source);

        let report = run(
            &suite.params(1.0),
            &options,
            &ProgressReporter::new(),
            &CancelToken::never(),
        )
        .await;

        assert!(report.is_success(), "{}", report.status);
        assert_eq!(suite.calls().len(), 6);
    }

    #[tokio::test]
    async fn cancellation_kills_the_running_stage_and_stops_the_run() {
        let suite = FakeSuite::with_full_install().hang_at("equil_npt");
        let (handle, token) = cancel_pair();
        let reporter = ProgressReporter::with_callback(Box::new(move |event| {
            if let Progress::StageStart {
                stage: Stage::EquilNpt,
                ..
            } = event
            {
                handle.cancel();
            }
        }));

        let report = tokio::time::timeout(
            std::time::Duration::from_secs(20),
            run(&suite.params(1.0), &suite.options(), &reporter, &token),
        )
        .await
        .unwrap();

        assert_eq!(
            report.status,
            RunStatus::Cancelled {
                stage: Stage::EquilNpt
            }
        );
        let states: Vec<_> = report.stages.iter().map(|r| r.state).collect();
        assert_eq!(states[3], StageState::Succeeded);
        assert_eq!(states[4], StageState::Failed);
        assert_eq!(states[5], StageState::Pending);
        assert_eq!(
            report.stages[4].failure,
            Some(StageFailure::Cancelled)
        );
        let out_dir = report.output_dir.unwrap();
        assert!(out_dir.join("heat_nvt.nc").is_file());
        assert!(!out_dir.join("prod_npt.in").exists());
    }
}
