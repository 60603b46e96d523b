use crate::command::{CommandFactory, ExitCode, Streams};
use crate::env::Environment;
use crate::error::CommandError;
use crate::input::LineReader;
use crate::lexer;
use std::io::Write;
use tracing::{debug, trace, warn};

/// Prompt marker printed before every line is read.
pub const PROMPT: &str = "$ ";

/// Factory allows creating instances of ExecutableCommand.
///
/// Only support commands defined in this crate — BuiltinCommand and ExternalCommand.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// A minimal interactive shell that runs built-in and external commands.
///
/// The interpreter maintains an [`Environment`] and a list of [`CommandFactory`] objects
/// that are queried, in order, to create commands by name. See [`Default`] for the
/// factories included out of the box.
///
/// Example
/// ```
/// use myshell::{Interpreter, Streams};
/// let mut sh = Interpreter::default();
/// let (mut out, mut err) = (Vec::new(), Vec::new());
/// let code = sh
///     .run("echo", &["hello", "world"], &mut Streams::new(&mut out, &mut err))
///     .unwrap();
/// assert_eq!(code, 0);
/// assert_eq!(out, b"hello world\n");
/// ```
pub struct Interpreter {
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(env: Environment, commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self { env, commands }
    }

    /// The default command set running against the given environment.
    pub fn with_env(env: Environment) -> Self {
        use crate::external::ExternalCommand;
        let mut commands = crate::builtin::factories();
        commands.push(Box::new(Factory::<ExternalCommand>::default()));
        Self::new(env, commands)
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Run a single command invocation by name with arguments.
    ///
    /// Returns the command's exit code. Command failures are reported on `streams`
    /// and show up only in the exit code; an `Err` means the streams themselves failed.
    pub fn run(
        &mut self,
        name: &str,
        args: &[&str],
        streams: &mut Streams<'_>,
    ) -> anyhow::Result<ExitCode> {
        debug!(name, argc = args.len(), "dispatching command");
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(&self.env, name, args) {
                return cmd.execute(streams, &mut self.env);
            }
        }
        let err = CommandError::CommandNotFound(name.to_owned());
        err.report(streams)?;
        Ok(err.status())
    }

    /// Tokenize and run one input line.
    ///
    /// Returns `None` when the line holds no command at all.
    pub fn execute_line(
        &mut self,
        line: &str,
        streams: &mut Streams<'_>,
    ) -> anyhow::Result<Option<ExitCode>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let tokens = lexer::split_into_tokens(line);
        trace!(?tokens, "tokenized line");
        let Some((name, rest)) = tokens.split_first() else {
            return Ok(None);
        };
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();
        self.run(name, &args, streams).map(Some)
    }

    /// The read-eval loop.
    ///
    /// Runs until `exit 0` or the end of input. Read errors and failing
    /// commands are reported and the loop moves on to the next line.
    pub fn repl(&mut self, reader: &mut dyn LineReader, streams: &mut Streams<'_>) {
        while !self.env.should_exit {
            let line = match reader.read_line(PROMPT, &mut *streams.out) {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("end of input");
                    break;
                }
                Err(e) => {
                    if let Err(werr) = writeln!(streams.err, "Error reading input: {e}") {
                        warn!(error = %e, report_error = %werr, "failed to report read error");
                    }
                    continue;
                }
            };

            match self.execute_line(&line, streams) {
                Ok(Some(code)) => debug!(code, "command finished"),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "command failed to write its output"),
            }
        }
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the default set of commands:
    /// - built-ins, in order: `exit`, `echo`, `pwd`, `cd`, `type`, `whoami`, `date`, `ls`, `clear`
    /// - external command launcher
    fn default() -> Self {
        Self::with_env(Environment::new())
    }
}
