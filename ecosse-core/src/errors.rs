use std::path::PathBuf;
use thiserror::Error;

/// Error type for invalid operations.
///
/// Expected absence of data (a coordinate outside a dataset, no soil map units)
/// is not an error; resolvers report it through [`crate::resolution::Resolution`].
#[derive(Error, Debug)]
pub enum EcosseError {
    #[error("{0}")]
    Error(String),
    #[error("File {} does not exist", .0.display())]
    MissingFile(PathBuf),
    #[error("{source_name}: {message}")]
    FormatError {
        source_name: String,
        message: String,
    },
    #[error("Invalid time series: {0}")]
    InvalidSeries(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EcosseError {
    /// A required sheet, column or variable is absent from an otherwise readable source.
    pub fn format(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        EcosseError::FormatError {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

/// Convenience type for `Result<T, EcosseError>`.
pub type EcosseResult<T> = Result<T, EcosseError>;
