use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Streams};
use crate::env::Environment;
use crate::error::CommandError;
use crate::external::find_in_path;
use crate::interpreter::Factory;
use chrono::{DateTime, Local, TimeZone};
use nix::unistd::{User, getuid};
use std::ffi::OsStr;
use std::fmt::Display;
use std::fs;
use std::io::{self, Write};
use tracing::debug;

/// Timestamp layout printed by `date`, e.g. `Mon, 02 Jan 2006 15:04:05 +01:00`.
pub const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %Z";

/// Moves the cursor home after wiping the screen.
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// The commands the shell implements itself.
///
/// The order of [`Builtin::ALL`] is the order in which command names are
/// matched, ahead of any lookup on `PATH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Exit,
    Echo,
    Pwd,
    Cd,
    Type,
    Whoami,
    Date,
    Ls,
    Clear,
}

impl Builtin {
    pub const ALL: [Builtin; 9] = [
        Builtin::Exit,
        Builtin::Echo,
        Builtin::Pwd,
        Builtin::Cd,
        Builtin::Type,
        Builtin::Whoami,
        Builtin::Date,
        Builtin::Ls,
        Builtin::Clear,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Exit => "exit",
            Builtin::Echo => "echo",
            Builtin::Pwd => "pwd",
            Builtin::Cd => "cd",
            Builtin::Type => "type",
            Builtin::Whoami => "whoami",
            Builtin::Date => "date",
            Builtin::Ls => "ls",
            Builtin::Clear => "clear",
        }
    }

    pub fn lookup(name: &str) -> Option<Builtin> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    /// What `type` prints for this builtin.
    pub fn description(self) -> String {
        format!("{} is a shell builtin", self.name())
    }

    pub(crate) fn factory(self) -> Box<dyn CommandFactory> {
        match self {
            Builtin::Exit => Box::new(Factory::<Exit>::default()),
            Builtin::Echo => Box::new(Factory::<Echo>::default()),
            Builtin::Pwd => Box::new(Factory::<Pwd>::default()),
            Builtin::Cd => Box::new(Factory::<Cd>::default()),
            Builtin::Type => Box::new(Factory::<Type>::default()),
            Builtin::Whoami => Box::new(Factory::<Whoami>::default()),
            Builtin::Date => Box::new(Factory::<Date>::default()),
            Builtin::Ls => Box::new(Factory::<Ls>::default()),
            Builtin::Clear => Box::new(Factory::<Clear>::default()),
        }
    }
}

/// Factories for every builtin, in matching order.
pub(crate) fn factories() -> Vec<Box<dyn CommandFactory>> {
    Builtin::ALL.into_iter().map(Builtin::factory).collect()
}

/// Built-in commands known to the shell at compile time.
///
/// Builtins run in-process. Arguments are checked when the command is built,
/// so a usage error never reaches `execute`.
pub(crate) trait BuiltinCommand: Sized {
    const KIND: Builtin;

    fn from_args(args: &[&str]) -> Result<Self, CommandError>;

    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(
        self,
        streams: &mut Streams<'_>,
        env: &mut Environment,
    ) -> Result<ExitCode, CommandError>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        streams: &mut Streams<'_>,
        env: &mut Environment,
    ) -> anyhow::Result<ExitCode> {
        match <T as BuiltinCommand>::execute(*self, streams, env) {
            Ok(x) => Ok(x),
            Err(e) => {
                e.report(streams)?;
                Ok(e.status())
            }
        }
    }
}

/// A builtin invoked with bad arguments; running it only prints the usage line.
struct InvalidArgs(CommandError);

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        streams: &mut Streams<'_>,
        _env: &mut Environment,
    ) -> anyhow::Result<ExitCode> {
        self.0.report(streams)?;
        Ok(self.0.status())
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name != T::KIND.name() {
            return None;
        }
        Some(match T::from_args(args) {
            Ok(cmd) => Box::new(cmd),
            Err(e) => Box::new(InvalidArgs(e)),
        })
    }
}

/// Leave the shell. Only `exit 0` is accepted.
pub struct Exit;

impl BuiltinCommand for Exit {
    const KIND: Builtin = Builtin::Exit;

    fn from_args(args: &[&str]) -> Result<Self, CommandError> {
        match args {
            ["0"] => Ok(Exit),
            _ => Err(CommandError::Usage("exit 0")),
        }
    }

    fn execute(
        self,
        _streams: &mut Streams<'_>,
        env: &mut Environment,
    ) -> Result<ExitCode, CommandError> {
        env.should_exit = true;
        Ok(0)
    }
}

/// Write the arguments to standard output, separated by spaces.
pub struct Echo {
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    const KIND: Builtin = Builtin::Echo;

    fn from_args(args: &[&str]) -> Result<Self, CommandError> {
        Ok(Echo {
            args: args.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn execute(
        self,
        streams: &mut Streams<'_>,
        _env: &mut Environment,
    ) -> Result<ExitCode, CommandError> {
        writeln!(streams.out, "{}", self.args.join(" "))?;
        Ok(0)
    }
}

/// Print the process's working directory.
pub struct Pwd;

impl BuiltinCommand for Pwd {
    const KIND: Builtin = Builtin::Pwd;

    fn from_args(_args: &[&str]) -> Result<Self, CommandError> {
        Ok(Pwd)
    }

    fn execute(
        self,
        streams: &mut Streams<'_>,
        _env: &mut Environment,
    ) -> Result<ExitCode, CommandError> {
        let cwd = std::env::current_dir().map_err(|e| CommandError::io("pwd", e))?;
        writeln!(streams.out, "{}", cwd.display())?;
        Ok(0)
    }
}

/// Change the working directory. A lone `~` means `$HOME`.
pub struct Cd {
    pub target: String,
}

impl BuiltinCommand for Cd {
    const KIND: Builtin = Builtin::Cd;

    fn from_args(args: &[&str]) -> Result<Self, CommandError> {
        match args {
            [target] => Ok(Cd {
                target: target.to_string(),
            }),
            _ => Err(CommandError::Usage("cd <directory>")),
        }
    }

    fn execute(
        self,
        _streams: &mut Streams<'_>,
        env: &mut Environment,
    ) -> Result<ExitCode, CommandError> {
        let target = if self.target == "~" {
            env.get_var("HOME")
                .filter(|home| !home.is_empty())
                .ok_or(CommandError::HomeNotSet)?
        } else {
            self.target
        };

        if let Err(e) = std::env::set_current_dir(&target) {
            debug!(dir = %target, error = %e, "cd failed");
            return Err(CommandError::NoSuchDirectory(target));
        }
        Ok(0)
    }
}

/// Tell whether a name is a builtin or where it lives on `PATH`.
pub struct Type {
    pub name: String,
}

impl BuiltinCommand for Type {
    const KIND: Builtin = Builtin::Type;

    fn from_args(args: &[&str]) -> Result<Self, CommandError> {
        match args {
            [name] => Ok(Type {
                name: name.to_string(),
            }),
            _ => Err(CommandError::Usage("type <command>")),
        }
    }

    fn execute(
        self,
        streams: &mut Streams<'_>,
        env: &mut Environment,
    ) -> Result<ExitCode, CommandError> {
        if let Some(builtin) = Builtin::lookup(&self.name) {
            writeln!(streams.out, "{}", builtin.description())?;
            return Ok(0);
        }

        let search_paths = env.get_var("PATH").unwrap_or_default();
        match find_in_path(OsStr::new(&search_paths), OsStr::new(&self.name)) {
            Some(path) => {
                writeln!(streams.out, "{} is {}", self.name, path.display())?;
                Ok(0)
            }
            None => {
                writeln!(streams.out, "{}: not found", self.name)?;
                Ok(1)
            }
        }
    }
}

/// Print the name of the invoking user.
pub struct Whoami;

impl BuiltinCommand for Whoami {
    const KIND: Builtin = Builtin::Whoami;

    fn from_args(_args: &[&str]) -> Result<Self, CommandError> {
        Ok(Whoami)
    }

    fn execute(
        self,
        streams: &mut Streams<'_>,
        _env: &mut Environment,
    ) -> Result<ExitCode, CommandError> {
        let uid = getuid();
        let user = User::from_uid(uid)?.ok_or(CommandError::UnknownUser(uid.as_raw()))?;
        writeln!(streams.out, "{}", user.name)?;
        Ok(0)
    }
}

/// Print the local date and time.
pub struct Date;

impl BuiltinCommand for Date {
    const KIND: Builtin = Builtin::Date;

    fn from_args(_args: &[&str]) -> Result<Self, CommandError> {
        Ok(Date)
    }

    fn execute(
        self,
        streams: &mut Streams<'_>,
        _env: &mut Environment,
    ) -> Result<ExitCode, CommandError> {
        writeln!(streams.out, "{}", format_timestamp(&Local::now()))?;
        Ok(0)
    }
}

pub fn format_timestamp<Tz>(time: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    time.format(DATE_FORMAT).to_string()
}

/// List a directory, one name per line. Defaults to the working directory.
pub struct Ls {
    pub dir: Option<String>,
}

impl BuiltinCommand for Ls {
    const KIND: Builtin = Builtin::Ls;

    fn from_args(args: &[&str]) -> Result<Self, CommandError> {
        Ok(Ls {
            dir: args.first().map(|s| s.to_string()),
        })
    }

    fn execute(
        self,
        streams: &mut Streams<'_>,
        _env: &mut Environment,
    ) -> Result<ExitCode, CommandError> {
        let dir = self.dir.as_deref().unwrap_or(".");
        let mut names = fs::read_dir(dir)
            .and_then(|entries| {
                entries
                    .map(|entry| entry.map(|e| e.file_name()))
                    .collect::<io::Result<Vec<_>>>()
            })
            .map_err(|e| CommandError::io(format!("ls: {dir}"), e))?;
        names.sort();

        for name in names {
            writeln!(streams.out, "{}", name.to_string_lossy())?;
        }
        Ok(0)
    }
}

/// Clear the terminal.
pub struct Clear;

impl BuiltinCommand for Clear {
    const KIND: Builtin = Builtin::Clear;

    fn from_args(_args: &[&str]) -> Result<Self, CommandError> {
        Ok(Clear)
    }

    fn execute(
        self,
        streams: &mut Streams<'_>,
        _env: &mut Environment,
    ) -> Result<ExitCode, CommandError> {
        write!(streams.out, "{CLEAR_SCREEN}")?;
        streams.out.flush()?;
        Ok(0)
    }
}
