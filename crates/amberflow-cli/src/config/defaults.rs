use amberflow::workflows::options::DEFAULT_RESULTS_ROOT;

/// Values used when neither the config file nor the command line supplies one.
///
/// Force field, water model, temperature and box buffer defaults live in the
/// core configuration model; only what the core requires from its caller is here.
pub struct DefaultsConfig {
    pub sim_time_ns: f64,
    pub results_root: String,
    pub inherit_environment: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            sim_time_ns: 10.0,
            results_root: DEFAULT_RESULTS_ROOT.to_string(),
            inherit_environment: true,
        }
    }
}
