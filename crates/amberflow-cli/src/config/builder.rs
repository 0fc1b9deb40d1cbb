use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::RunRequest;
use crate::cli::SimulationArgs;
use crate::error::{CliError, Result};
use amberflow::core::config::RawParams;
use amberflow::engine::environment::BaseEnvironment;
use amberflow::workflows::RunOptions;
use std::path::PathBuf;
use std::str::FromStr;

/// Merges built-in defaults, the optional config file, `--set` overrides and
/// explicit flags, in increasing order of precedence.
pub fn build_request(args: &SimulationArgs) -> Result<RunRequest> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &args.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };

    let mut file_config = apply_set_values(file_config, &args.set_values)?;
    let sim_file = file_config.simulation.take().unwrap_or_default();
    let env_file = file_config.environment.take().unwrap_or_default();

    let sim_time_ns = args
        .sim_time_ns
        .or(sim_file.sim_time_ns)
        .unwrap_or(defaults.sim_time_ns);

    let params = RawParams {
        structure_path: args.structure.clone(),
        sim_time_ns,
        gpu_device: args.gpu_device.clone().or(sim_file.gpu_device),
        force_field: args.force_field.clone().or(sim_file.force_field),
        water_model: args.water_model.clone().or(sim_file.water_model),
        output_dir: args.output_dir.clone(),
        job_name: args.job_name.clone().or(sim_file.job_name),
        temperature_k: args.temperature_k.or(sim_file.temperature_k),
        box_buffer_angstrom: args.box_buffer_angstrom.or(sim_file.box_buffer_angstrom),
    };

    let results_root = args
        .results_root
        .clone()
        .or(env_file.results_root)
        .unwrap_or_else(|| PathBuf::from(&defaults.results_root));

    let base_environment = if env_file.inherit.unwrap_or(defaults.inherit_environment) {
        BaseEnvironment::Process
    } else {
        BaseEnvironment::Empty
    };

    let mut options = RunOptions::new(results_root).with_base_environment(base_environment);
    if let Some(source) = args.env_file.clone().or(env_file.source) {
        options = options.with_environment_source(source);
    }

    Ok(RunRequest {
        params,
        options,
        json: args.json,
    })
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value))
    })
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        match key {
            "simulation.sim-time-ns" => {
                config
                    .simulation
                    .get_or_insert_with(Default::default)
                    .sim_time_ns = Some(parse_value(key, value_str, "float")?);
            }
            "simulation.temperature-k" => {
                config
                    .simulation
                    .get_or_insert_with(Default::default)
                    .temperature_k = Some(parse_value(key, value_str, "float")?);
            }
            "simulation.box-buffer-angstrom" => {
                config
                    .simulation
                    .get_or_insert_with(Default::default)
                    .box_buffer_angstrom = Some(parse_value(key, value_str, "float")?);
            }
            "simulation.force-field" => {
                config
                    .simulation
                    .get_or_insert_with(Default::default)
                    .force_field = Some(value_str.to_string());
            }
            "simulation.water-model" => {
                config
                    .simulation
                    .get_or_insert_with(Default::default)
                    .water_model = Some(value_str.to_string());
            }
            "simulation.gpu-device" => {
                config
                    .simulation
                    .get_or_insert_with(Default::default)
                    .gpu_device = Some(value_str.to_string());
            }
            "simulation.job-name" => {
                config
                    .simulation
                    .get_or_insert_with(Default::default)
                    .job_name = Some(value_str.to_string());
            }
            "environment.source" => {
                config
                    .environment
                    .get_or_insert_with(Default::default)
                    .source = Some(PathBuf::from(value_str));
            }
            "environment.results-root" => {
                config
                    .environment
                    .get_or_insert_with(Default::default)
                    .results_root = Some(PathBuf::from(value_str));
            }
            "environment.inherit" => {
                config
                    .environment
                    .get_or_insert_with(Default::default)
                    .inherit = Some(parse_value(key, value_str, "boolean")?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
