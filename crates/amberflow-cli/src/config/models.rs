use amberflow::core::config::RawParams;
use amberflow::workflows::RunOptions;

/// Everything a subcommand needs after all configuration layers are merged.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub params: RawParams,
    pub options: RunOptions,
    pub json: bool,
}
