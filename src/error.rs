use thiserror::Error;

/// Errors returned by the tokenizing, similarity and clustering services.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: String,
    },

    /// Requested cluster count is incompatible with the configuration.
    #[error("invalid cluster count: requested {requested}, but at least {minimum} are required")]
    InvalidClusterCount {
        /// Requested number of clusters.
        requested: i64,
        /// Smallest accepted number of clusters.
        minimum: i64,
    },

    /// A result set would exceed the configured maximum.
    #[error("too many results: {count} would be produced, the maximum is {max}")]
    TooManyResults {
        /// Number of results the run would produce.
        count: usize,
        /// Configured maximum.
        max: usize,
    },

    /// A worker thread failed or panicked; the whole run is discarded.
    #[error("worker failed during {phase}: {message}")]
    WorkerFailed {
        /// Phase the worker was running.
        phase: &'static str,
        /// Failure description.
        message: String,
    },

    /// The run was cancelled at a phase boundary.
    #[error("cancelled after {phase}")]
    Cancelled {
        /// Last phase completed before the cancellation was observed.
        phase: &'static str,
    },

    /// Configuration record could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
