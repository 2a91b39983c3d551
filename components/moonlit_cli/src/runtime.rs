//! Script execution for the `moonlit` binary
//!
//! A [`Runtime`] owns one execution context for its whole lifetime, so
//! globals defined by one evaluation are visible to the next.

use crate::cli::Cli;
use crate::error::{CliError, CliResult};
use bridge::{BridgeConfig, ExecutionContext, HostValue, ResultCount};
use core_types::{BridgeError, Syntax};
use log::{debug, info};
use std::fmt;
use std::path::Path;
use std::rc::Rc;

/// Chunk name of inline source.
pub const EVAL_CHUNK_NAME: &str = "=(eval)";

/// One value returned by a script.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// A value the bridge can represent on the host side
    Value(HostValue),
    /// An interpreter value with no host representation, e.g. a function
    Unrepresentable(&'static str),
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Value(value) => match value.to_json().and_then(|json| {
                serde_json::to_string(&json).map_err(|e| BridgeError::Config(e.to_string()))
            }) {
                Ok(text) => f.write_str(&text),
                Err(_) => write!(f, "{:?}", value),
            },
            Output::Unrepresentable(type_name) => write!(f, "<{}>", type_name),
        }
    }
}

/// Runs scripts in a single execution context
pub struct Runtime {
    context: Rc<ExecutionContext>,
    syntax: Option<Syntax>,
}

impl Runtime {
    /// Creates a runtime with its own context.
    ///
    /// # Example
    /// ```
    /// use moonlit_cli::Runtime;
    ///
    /// let mut runtime = Runtime::new(&bridge::BridgeConfig::default()).unwrap();
    /// let results = runtime.execute_string("return 6 * 7").unwrap();
    /// assert_eq!(results[0].to_string(), "42");
    /// ```
    pub fn new(config: &BridgeConfig) -> CliResult<Self> {
        let context = ExecutionContext::with_config(config)?;
        Ok(Self {
            context,
            syntax: None,
        })
    }

    /// Builds the configuration named by the command line and a runtime
    /// using it: the `--config` file (or defaults), `MOONLIT_PATH`, then
    /// every `--path`.
    pub fn from_cli(cli: &Cli) -> CliResult<Self> {
        let mut config = match &cli.config {
            Some(path) => BridgeConfig::from_file(path)?,
            None => BridgeConfig::default(),
        }
        .with_env();
        for path in &cli.search_paths {
            config = config.with_search_path(path);
        }
        info!("search paths: {:?}", config.search_paths);
        Ok(Self::new(&config)?.with_syntax(cli.syntax.map(Syntax::from)))
    }

    /// Forces a dialect for every evaluation; `None` restores the default.
    pub fn with_syntax(mut self, syntax: Option<Syntax>) -> Self {
        self.syntax = syntax;
        self
    }

    /// The dialect forced by [`with_syntax`](Self::with_syntax), if any.
    pub fn syntax(&self) -> Option<Syntax> {
        self.syntax
    }

    /// The underlying execution context.
    pub fn context(&self) -> &Rc<ExecutionContext> {
        &self.context
    }

    /// Executes a script file. The dialect follows the file extension unless
    /// one was forced.
    pub fn execute_file(&mut self, path: &Path) -> CliResult<Vec<Output>> {
        let depth = self.context.depth();
        match self.syntax {
            Some(syntax) => {
                let source = std::fs::read_to_string(path)?;
                let chunk_name = format!("@{}", path.display());
                self.context
                    .load_script_with_syntax(&source, syntax, &chunk_name)?;
            }
            None => self.context.load_script_at(path)?,
        }
        self.run_loaded(depth)
    }

    /// Executes inline source and returns everything it returned.
    pub fn execute_string(&mut self, source: &str) -> CliResult<Vec<Output>> {
        let depth = self.context.depth();
        self.context.load_script_with_syntax(
            source,
            self.syntax.unwrap_or_default(),
            EVAL_CHUNK_NAME,
        )?;
        self.run_loaded(depth)
    }

    /// Evaluates a REPL line: as an expression when it compiles as one,
    /// otherwise as a statement block.
    pub fn evaluate_line(&mut self, line: &str) -> CliResult<Vec<Output>> {
        if self.syntax.unwrap_or_default() == Syntax::Base {
            let depth = self.context.depth();
            let expression = format!("return {}", line);
            if self
                .context
                .load_script_with_syntax(&expression, Syntax::Base, EVAL_CHUNK_NAME)
                .is_ok()
            {
                return self.run_loaded(depth);
            }
        }
        self.execute_string(line)
    }

    /// Start the REPL (Read-Eval-Print Loop)
    ///
    /// # Example
    /// ```no_run
    /// use moonlit_cli::Runtime;
    ///
    /// let mut runtime = Runtime::new(&bridge::BridgeConfig::default()).unwrap();
    /// runtime.repl().unwrap();
    /// ```
    pub fn repl(&mut self) -> CliResult<()> {
        crate::repl::run_repl(self)
    }

    fn run_loaded(&mut self, depth: usize) -> CliResult<Vec<Output>> {
        if let Err(err) = self.context.call_function(0, ResultCount::All) {
            self.context.discard(1);
            return Err(CliError::Bridge(err));
        }
        let count = self.context.depth() - depth;
        debug!("script returned {} value(s)", count);
        let mut outputs: Vec<Output> = (0..count).map(|_| self.pop_output()).collect();
        outputs.reverse();
        Ok(outputs)
    }

    fn pop_output(&self) -> Output {
        let type_name = self.context.type_name_at_top().unwrap_or("nil");
        match self.context.pop_value() {
            Some(value) => Output::Value(value),
            None => Output::Unrepresentable(type_name),
        }
    }
}
