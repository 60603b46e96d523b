use myshell::{Interpreter, PromptedReader, Streams};
use rustyline::DefaultEditor;
use std::io::Write;
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    run();
    ExitCode::SUCCESS
}

fn run() {
    let mut shell = Interpreter::default();
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let mut streams = Streams::new(&mut stdout, &mut stderr);

    match DefaultEditor::new() {
        Ok(mut editor) => shell.repl(&mut editor, &mut streams),
        Err(e) => {
            warn!(error = %e, "line editor unavailable, reading plain stdin");
            let mut reader = PromptedReader::new(std::io::stdin().lock());
            shell.repl(&mut reader, &mut streams);
        }
    }

    debug!(exit_requested = shell.env().should_exit, "shell loop finished");
    if let Err(e) = stdout.flush() {
        warn!(error = %e, "failed to flush stdout");
    }
}
