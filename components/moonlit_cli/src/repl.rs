//! REPL (Read-Eval-Print Loop) implementation

use crate::error::{CliError, CliResult};
use crate::runtime::Runtime;
use core_types::BridgeError;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Marker the compiler puts in messages about truncated input.
const EOF_MARKER: &str = "<eof>";

/// Run the interactive REPL
///
/// Lines accumulate until they compile; a compile error that points at the
/// end of input switches to continuation mode instead of being reported.
pub fn run_repl(runtime: &mut Runtime) -> CliResult<()> {
    let mut editor = DefaultEditor::new()
        .map_err(|e| CliError::Repl(format!("failed to initialize editor: {}", e)))?;

    println!("Moonlit {}", env!("CARGO_PKG_VERSION"));
    println!("Type Lua code or 'exit' to quit.");
    println!();

    let mut line_buffer = String::new();

    loop {
        let in_multiline = !line_buffer.is_empty();
        let prompt = if in_multiline { ">> " } else { "> " };

        match editor.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();

                if !in_multiline && (trimmed == "exit" || trimmed == ".exit" || trimmed == "quit") {
                    println!("Goodbye!");
                    break;
                }

                if !in_multiline && trimmed.starts_with('.') {
                    handle_repl_command(trimmed, runtime);
                    continue;
                }

                if in_multiline {
                    line_buffer.push('\n');
                }
                line_buffer.push_str(&line);

                match runtime.evaluate_line(&line_buffer) {
                    Ok(outputs) => {
                        for output in outputs {
                            println!("{}", output);
                        }
                    }
                    Err(err) if is_incomplete(&err) => continue,
                    Err(err) => eprintln!("{}: {}", err.label(), err),
                }

                let _ = editor.add_history_entry(line_buffer.as_str());
                line_buffer.clear();
            }
            Err(ReadlineError::Interrupted) => {
                if in_multiline {
                    println!("^C");
                    line_buffer.clear();
                } else {
                    println!("Press Ctrl-D or type 'exit' to quit");
                }
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                return Err(CliError::Repl(format!("readline error: {}", err)));
            }
        }
    }

    Ok(())
}

fn handle_repl_command(command: &str, runtime: &Runtime) {
    match command {
        ".help" => {
            println!("REPL Commands:");
            println!("  .help     - Show this help message");
            println!("  .clear    - Clear the screen");
            println!("  .paths    - Show script search paths");
            println!("  .stack    - Show the bridge stack depth");
            println!("  .exit     - Exit the REPL");
            println!("  exit      - Exit the REPL");
            println!("  quit      - Exit the REPL");
        }
        ".clear" => {
            print!("\x1B[2J\x1B[1;1H");
        }
        ".paths" => {
            for path in runtime.context().search_paths() {
                println!("  {}", path.display());
            }
        }
        ".stack" => {
            println!("depth {}", runtime.context().depth());
        }
        _ => {
            println!("Unknown command: {}", command);
            println!("Type .help for available commands");
        }
    }
}

/// Whether a failure only means the input stops early.
fn is_incomplete(err: &CliError) -> bool {
    matches!(err, CliError::Bridge(BridgeError::Compile { message, .. }) if message.contains(EOF_MARKER))
}
