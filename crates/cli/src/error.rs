//! Structured errors for the reqcache command line.

use reqcache_core::Error;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Invalid command-line input.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Cache(#[from] Error),

    #[error("OUTPUT_FAILED: {0}")]
    Output(#[from] std::io::Error),

    #[error("OUTPUT_FAILED: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_error_passes_through() {
        let err: CliError = Error::InvalidUrl("x".into()).into();
        assert_eq!(err.to_string(), "INVALID_URL: x");
    }
}
