use crate::command::{ExitCode, Streams};
use std::io::{self, Write};
use thiserror::Error;

/// Exit status reported when a command cannot be found or started.
pub const NOT_FOUND_STATUS: ExitCode = 127;

/// A failure of a single command.
///
/// None of these are fatal for the shell: each is printed as one line and
/// the read-eval loop carries on.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Wrong number or shape of arguments. Holds the usage synopsis.
    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("cd: {0}: No such file or directory")]
    NoSuchDirectory(String),

    #[error("cd: HOME environment variable not set")]
    HomeNotSet,

    #[error("{0}: command not found")]
    CommandNotFound(String),

    #[error("whoami: cannot find name for user ID {0}")]
    UnknownUser(u32),

    #[error("whoami: {0}")]
    User(#[from] nix::Error),

    /// A system call made on behalf of the command failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Writing the command's own output failed.
    #[error(transparent)]
    Output(#[from] io::Error),
}

impl CommandError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        CommandError::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether the message belongs on standard error rather than standard output.
    pub fn is_diagnostic(&self) -> bool {
        !matches!(
            self,
            CommandError::Usage(_)
                | CommandError::NoSuchDirectory(_)
                | CommandError::CommandNotFound(_)
        )
    }

    /// Exit status the failed command finishes with.
    pub fn status(&self) -> ExitCode {
        match self {
            CommandError::CommandNotFound(_) => NOT_FOUND_STATUS,
            _ => 1,
        }
    }

    /// Prints the message as a single line on the stream it belongs to.
    pub fn report(&self, streams: &mut Streams<'_>) -> io::Result<()> {
        let sink: &mut dyn Write = if self.is_diagnostic() {
            &mut *streams.err
        } else {
            &mut *streams.out
        };
        writeln!(sink, "{self}")
    }
}
