//! Error types for declmap.

use std::path::PathBuf;

use crate::config::ConfigError;
use crate::logging::LoggingError;
use crate::output::OutputError;
use crate::parser::ParseError;
use crate::walker::WalkError;

/// Top-level error type for declmap operations.
#[derive(Debug, thiserror::Error)]
pub enum DeclmapError {
    #[error("source not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("python parser unavailable: {0}")]
    ParseUnavailable(String),

    #[error("no python files found in {0}")]
    NoFilesFound(PathBuf),

    #[error("walk error: {0}")]
    Walk(#[from] WalkError),

    #[error("parse error: {0}")]
    Parse(ParseError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("output error: {0}")]
    Output(#[from] OutputError),

    #[error("logging error: {0}")]
    Logging(#[from] LoggingError),
}

impl From<ParseError> for DeclmapError {
    fn from(error: ParseError) -> Self {
        match error {
            ParseError::SourceNotFound { path } => DeclmapError::SourceNotFound(path),
            ParseError::ParseUnavailable { reason } => DeclmapError::ParseUnavailable(reason),
            other => DeclmapError::Parse(other),
        }
    }
}

/// Map an error to its exit code.
pub fn exit_code(error: &DeclmapError) -> i32 {
    match error {
        DeclmapError::SourceNotFound(_) => 3,
        DeclmapError::NoFilesFound(_) => 5,
        DeclmapError::ParseUnavailable(_) => 6,
        DeclmapError::Walk(_) => 2,
        DeclmapError::Parse(_) => 1,
        DeclmapError::Config(_) => 1,
        DeclmapError::Output(_) => 1,
        DeclmapError::Logging(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_errors_keep_their_category() {
        let err: DeclmapError = ParseError::SourceNotFound {
            path: PathBuf::from("a.py"),
        }
        .into();
        assert!(matches!(err, DeclmapError::SourceNotFound(_)));
        assert_eq!(exit_code(&err), 3);

        let err: DeclmapError = ParseError::ParseUnavailable {
            reason: "grammar".into(),
        }
        .into();
        assert_eq!(exit_code(&err), 6);

        let err: DeclmapError = ParseError::Read {
            path: PathBuf::from("a.py"),
            source: std::io::Error::other("denied"),
        }
        .into();
        assert!(matches!(err, DeclmapError::Parse(_)));
        assert_eq!(exit_code(&err), 1);
    }
}
