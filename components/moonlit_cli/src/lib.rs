//! Moonlit command line host
//!
//! Provides the Runtime struct and supporting modules for the `moonlit`
//! binary.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod error;
pub mod repl;
pub mod runtime;

pub use cli::{Cli, SyntaxArg};
pub use error::{CliError, CliResult};
pub use runtime::{Output, Runtime};
