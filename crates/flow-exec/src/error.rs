use std::time::Duration;

use thiserror::Error;

/// Every way the outbound extraction call can fail. Each one is reported as
/// a single failure; nothing is retried.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to start {provider} CLI: {source}")]
    Spawn {
        provider: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{provider} CLI exited with {status}: {stderr}")]
    Exit {
        provider: &'static str,
        status: String,
        stderr: String,
    },

    #[error("{provider} CLI did not answer within {}s", .after.as_secs())]
    Timeout {
        provider: &'static str,
        after: Duration,
    },

    #[error("response is not a task list: {0}")]
    Parse(String),

    #[error("{provider} CLI returned an empty response")]
    EmptyResponse { provider: &'static str },
}
