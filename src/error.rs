use thiserror::Error;

/// Failure kinds the engine distinguishes. Asset and capacity errors on
/// required resources are fatal; everything else degrades or no-ops at
/// the site of the failure.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("asset error: {0}")]
    Asset(String),
    #[error("capacity exceeded: {0}")]
    Capacity(&'static str),
}

/// Reports a fatal error and terminates. No partial frame output is
/// presented on this path.
pub fn fatal(error: EngineError) -> ! {
    log::error!("{error}");
    std::process::exit(1);
}
