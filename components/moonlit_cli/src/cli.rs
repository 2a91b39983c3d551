//! Command line arguments

use clap::{ArgAction, Parser, ValueEnum};
use core_types::Syntax;
use std::path::PathBuf;

/// Script dialect selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SyntaxArg {
    /// Plain Lua
    Lua,
    /// Extended dialect, compiled by the configured compiler module
    Extended,
}

impl From<SyntaxArg> for Syntax {
    fn from(arg: SyntaxArg) -> Self {
        match arg {
            SyntaxArg::Lua => Syntax::Base,
            SyntaxArg::Extended => Syntax::Extended,
        }
    }
}

/// Moonlit scripting host
#[derive(Debug, Parser)]
#[command(name = "moonlit", version, about = "Run Lua scripts against the Moonlit bridge")]
pub struct Cli {
    /// Script file to execute
    #[arg(short, long, conflicts_with = "eval")]
    pub file: Option<PathBuf>,

    /// Inline source to evaluate
    #[arg(short, long)]
    pub eval: Option<String>,

    /// Start the interactive REPL
    #[arg(short, long)]
    pub repl: bool,

    /// Extra script search path (repeatable)
    #[arg(short = 'p', long = "path", value_name = "DIR")]
    pub search_paths: Vec<PathBuf>,

    /// JSON bridge configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Dialect of the executed source; files default to their extension
    #[arg(short, long, value_enum)]
    pub syntax: Option<SyntaxArg>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Arguments that run a single file.
    pub fn with_file(file: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(file.into()),
            eval: None,
            repl: false,
            search_paths: Vec::new(),
            config: None,
            syntax: None,
            verbose: 0,
        }
    }

    /// Log filter implied by `--verbose`, used when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
