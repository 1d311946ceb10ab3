use tapdrag_core::DetectorConfigError;
use tapdrag_web::input_parser::InputParseError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReplayError>;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid detector configuration: {0}")]
    Config(#[from] DetectorConfigError),

    #[error("script line {line}: {source}")]
    Input {
        line: usize,
        #[source]
        source: InputParseError,
    },

    #[error("script line {line}: {message}")]
    Step { line: usize, message: String },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
}

impl ReplayError {
    /// Process exit code: `2` for bad input, `1` otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Input { .. }
            | Self::Step { .. }
            | Self::InvalidArgument { .. }
            | Self::Config(_) => 2,
            Self::Io(_) | Self::Json(_) => 1,
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}
