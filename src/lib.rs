//! A small interactive shell.
//!
//! Each input line is split into arguments with POSIX-like quoting rules and
//! dispatched either to a builtin (`exit`, `echo`, `pwd`, `cd`, `type`,
//! `whoami`, `date`, `ls`, `clear`) or to an external program found on `PATH`.
//!
//! The main entry point is [`Interpreter`]. [`split_into_tokens`] exposes the
//! tokenizer on its own, and [`LineReader`] abstracts where lines come from.

mod builtin;
pub mod command;
pub mod env;
mod error;
mod external;
mod input;
mod interpreter;
mod lexer;

pub use builtin::{Builtin, DATE_FORMAT};
pub use command::{ExitCode, Streams};
pub use env::Environment;
pub use error::CommandError;
pub use input::{LineReader, PromptedReader};
/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
pub use interpreter::PROMPT;
pub use lexer::split_into_tokens;
