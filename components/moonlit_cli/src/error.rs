//! Error types for the CLI

use core_types::BridgeError;
use thiserror::Error;

/// CLI-specific errors
#[derive(Debug, Error)]
pub enum CliError {
    /// Compile, runtime or configuration error reported by the bridge
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// File I/O error
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),

    /// REPL error
    #[error("REPL error: {0}")]
    Repl(String),
}

impl CliError {
    /// Label printed in front of the message on stderr.
    pub fn label(&self) -> &'static str {
        match self {
            CliError::Bridge(BridgeError::Compile { .. }) => "Syntax Error",
            CliError::Bridge(BridgeError::Runtime { .. }) => "Lua Error",
            CliError::Bridge(BridgeError::Config(_)) => "Configuration Error",
            _ => "Error",
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
