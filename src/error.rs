use thiserror::Error;

/// Failure reported by the trace data source.
///
/// The diagram core never retries; these propagate to the host.
#[derive(Error, Debug)]
pub enum DataFetchError {
    #[error("Data source unavailable: {0}")]
    Unavailable(String),
    #[error("Run not found: {0}")]
    RunNotFound(String),
    #[error("Malformed data: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Invalid diagram configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
