//! Error model for invocation-level failures
//!
//! Style findings are never errors. These variants cover what stops a file or a
//! whole run from being checked.

use std::path::{Path, PathBuf};

/// Errors raised while loading configuration or reading input
#[derive(Debug, thiserror::Error)]
pub enum NettError {
    /// Configuration file could not be loaded, parsed or validated
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// A malformed literal or comment, fatal only when failing fast
    #[error("Lexical error in {file} at line {line}: {message}")]
    Lex {
        file: String,
        line: u32,
        message: String,
    },

    /// A file could not be analyzed
    #[error("Analysis error in {file}: {message}")]
    Analysis { file: String, message: String },

    /// An input path named on the command line does not exist or cannot be read
    #[error("Unable to access file {}", path.display())]
    InputNotFound { path: PathBuf },

    /// Nothing to check
    #[error("No input files specified")]
    NoInput,

    /// Output could not be produced
    #[error("Report error: {message}")]
    Report { message: String },
}

impl NettError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn lex(file: impl Into<String>, line: u32, message: impl Into<String>) -> Self {
        Self::Lex {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    pub fn analysis(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Analysis {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn input_not_found(path: impl AsRef<Path>) -> Self {
        Self::InputNotFound {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn report(message: impl Into<String>) -> Self {
        Self::Report {
            message: message.into(),
        }
    }
}

/// Result type for checker operations
pub type NettResult<T> = Result<T, NettError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            NettError::input_not_found("missing.c").to_string(),
            "Unable to access file missing.c"
        );
        assert_eq!(NettError::NoInput.to_string(), "No input files specified");
        assert_eq!(
            NettError::lex("a.c", 3, "Unterminated comment").to_string(),
            "Lexical error in a.c at line 3: Unterminated comment"
        );
    }
}
