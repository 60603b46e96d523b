use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Streams};
use crate::env::Environment;
use crate::error::CommandError;
use crate::interpreter::Factory;
use anyhow::Result;
use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use tracing::debug;

/// Command that is not a builtin.
pub struct ExternalCommand {
    /// Name as typed by the user; becomes the child's `argv[0]`.
    name: String,
    program: PathBuf,
    args: Vec<OsString>,
}

impl ExternalCommand {
    pub fn new(name: String, program: PathBuf, args: Vec<OsString>) -> Self {
        Self {
            name,
            program,
            args,
        }
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        let search_paths = env.get_var("PATH").unwrap_or_default();
        let program = find_command_path(OsStr::new(&search_paths), Path::new(name))?;
        debug!(name, program = %program.display(), "resolved external command");
        Some(Box::new(ExternalCommand::new(
            name.to_owned(),
            program.into_owned(),
            args.iter().map(OsString::from).collect(),
        )))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(
        self: Box<Self>,
        streams: &mut Streams<'_>,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let mut cmd = std::process::Command::new(&self.program);
        cmd.args(&self.args)
            .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.arg0(&self.name);
        }

        // The child writes straight to the terminal; anything we buffered must go first.
        streams.out.flush()?;
        streams.err.flush()?;

        match cmd.status() {
            Ok(exit_status) => {
                let code = match exit_status.code() {
                    Some(x) => x,
                    None => terminated_by_signal(exit_status),
                };
                debug!(name = %self.name, code, "external command finished");
                Ok(code)
            }
            Err(e) => {
                debug!(name = %self.name, error = %e, "failed to spawn external command");
                let err = CommandError::CommandNotFound(self.name);
                err.report(streams)?;
                Ok(err.status())
            }
        }
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it names an existing non-directory.
/// - Relative with multiple components (e.g., `bin/sh`): same, relative to the working directory.
/// - Single path component (no separators): search each directory in `search_paths` (PATH)
///   and return the first executable match. Empty PATH entries are ignored, so the
///   working directory is never searched implicitly.
/// - Empty path: returns `None`.
///
/// Returns either a borrowed reference to the provided `path` or an owned `PathBuf`
/// when the result is discovered via PATH lookup.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, None) => None,
        (Some(x), None) => find_executable_in_path(search_paths, x.as_os_str()).map(Cow::Owned),
        _ => find_by_path(path).map(Cow::Borrowed),
    }
}

/// Search `search_paths` in order for a file called `cmd`.
///
/// Only the first hit counts; directories with a matching name are skipped.
pub fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    for dir in std::env::split_paths(search_paths) {
        let path = dir.join(cmd);
        if find_by_path(&path).is_some() {
            return Some(path);
        }
    }
    None
}

/// Like [`find_in_path`], but only accepts files that can be executed and
/// skips empty entries instead of treating them as the working directory.
pub fn find_executable_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(cmd))
        .find(|path| is_executable(path))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match path.metadata() {
        Ok(meta) => !meta.is_dir() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    find_by_path(path).is_some()
}

fn find_by_path(path: &Path) -> Option<&Path> {
    match path.metadata() {
        Ok(meta) if !meta.is_dir() => Some(path),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::lock_current_dir;
    use std::fs::{self, File};

    fn osstr(s: &str) -> &OsStr {
        OsStr::new(s)
    }

    fn joined(dirs: &[&Path]) -> OsString {
        std::env::join_paths(dirs).unwrap()
    }

    fn create_executable(path: &Path) {
        File::create(path).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
        }
    }

    #[test]
    #[cfg(unix)]
    fn absolute_existing_true() {
        let path = Path::new("/bin/sh");
        let res = find_command_path(osstr("/bin"), path);
        assert_eq!(res.as_deref(), Some(path));
    }

    #[test]
    #[cfg(unix)]
    fn absolute_nonexisting() {
        let path = Path::new("/bin/nonexisting");
        assert!(find_command_path(osstr("/bin"), path).is_none());
    }

    #[test]
    #[cfg(unix)]
    fn absolute_directory_is_not_a_command() {
        assert!(find_command_path(osstr("/"), Path::new("/bin")).is_none());
    }

    #[test]
    fn single_component_found_in_path() {
        let dir = tempfile::tempdir().unwrap();
        create_executable(&dir.path().join("tool"));

        let search = joined(&[Path::new("/does/not/exist"), dir.path()]);
        let found = find_command_path(&search, Path::new("tool")).expect("tool in PATH");
        assert_eq!(found.as_ref(), dir.path().join("tool"));
    }

    #[test]
    fn single_component_not_found_in_path() {
        let dir = tempfile::tempdir().unwrap();
        let search = joined(&[dir.path()]);
        assert!(find_command_path(&search, Path::new("nonexisting")).is_none());
    }

    #[test]
    fn first_directory_in_search_order_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        File::create(first.path().join("dup")).unwrap();
        File::create(second.path().join("dup")).unwrap();

        let search = joined(&[first.path(), second.path()]);
        assert_eq!(find_in_path(&search, osstr("dup")), Some(first.path().join("dup")));
    }

    #[test]
    fn directories_are_skipped_during_search() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::create_dir(first.path().join("thing")).unwrap();
        File::create(second.path().join("thing")).unwrap();

        let search = joined(&[first.path(), second.path()]);
        assert_eq!(find_in_path(&search, osstr("thing")), Some(second.path().join("thing")));
    }

    #[test]
    #[cfg(unix)]
    fn non_executable_match_does_not_shadow_later_directories() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        File::create(first.path().join("tool")).unwrap();
        create_executable(&second.path().join("tool"));

        let search = joined(&[first.path(), second.path()]);
        let found = find_command_path(&search, Path::new("tool")).map(Cow::into_owned);
        assert_eq!(found, Some(second.path().join("tool")));
        // `type` only asks for a file, so it still reports the first one.
        assert_eq!(find_in_path(&search, osstr("tool")), Some(first.path().join("tool")));
    }

    #[test]
    #[cfg(unix)]
    fn non_executable_file_alone_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("data")).unwrap();

        let search = joined(&[dir.path()]);
        assert!(find_executable_in_path(&search, osstr("data")).is_none());
    }

    #[test]
    fn missing_or_empty_path_never_searches_working_directory() {
        let _lock = lock_current_dir();
        let cwd_before = std::env::current_dir().expect("cwd");
        let tmp = tempfile::tempdir().unwrap();
        create_executable(&tmp.path().join("foo"));

        std::env::set_current_dir(tmp.path()).expect("set cwd");
        let factory = Factory::<ExternalCommand>::default();
        let without_path = Environment::isolated(Vec::<(String, String)>::new());
        let unset = factory.try_create(&without_path, "foo", &[]).is_none();
        let empty = ["", ":"].map(|path| {
            let env = Environment::isolated([("PATH".to_owned(), path.to_owned())]);
            factory.try_create(&env, "foo", &[]).is_none()
        });
        let explicit = factory.try_create(&without_path, "./foo", &[]).is_some();
        std::env::set_current_dir(&cwd_before).unwrap();

        assert!(unset, "bare name resolved without PATH");
        assert_eq!(empty, [true, true], "empty PATH entry searched the working directory");
        assert!(explicit, "explicit relative path should still resolve");
    }

    #[test]
    fn multiple_components_relative_existing() {
        let _lock = lock_current_dir();
        let cwd_before = std::env::current_dir().expect("cwd");
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("bin")).unwrap();
        File::create(tmp.path().join("bin").join("sh")).unwrap();

        std::env::set_current_dir(tmp.path()).expect("set cwd");
        let res = find_command_path(osstr("/does/not/matter"), Path::new("bin/sh"))
            .map(Cow::into_owned);
        let dotted = find_command_path(osstr("/does/not/matter"), Path::new("./bin/sh"))
            .map(Cow::into_owned);
        // Restore cwd early to avoid interference even on failure
        std::env::set_current_dir(&cwd_before).unwrap();

        assert_eq!(res.as_deref(), Some(Path::new("bin/sh")));
        assert_eq!(dotted.as_deref(), Some(Path::new("./bin/sh")));
    }

    #[test]
    fn empty_path_is_none() {
        assert!(find_command_path(osstr("/bin"), Path::new("")).is_none());
    }

    #[test]
    #[cfg(unix)]
    fn external_command_reports_exit_status() {
        let Some(sh) = find_in_path(osstr("/bin:/usr/bin"), osstr("sh")) else {
            return;
        };
        let cmd = ExternalCommand::new("sh".into(), sh, vec!["-c".into(), "exit 3".into()]);
        let mut env = Environment::isolated(Vec::<(String, String)>::new());
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let code = Box::new(cmd)
            .execute(&mut Streams::new(&mut out, &mut err), &mut env)
            .unwrap();
        assert_eq!(code, 3);
        assert!(out.is_empty());
    }

    #[test]
    fn unspawnable_program_is_reported_as_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = ExternalCommand::new("ghost".into(), dir.path().join("ghost"), Vec::new());
        let mut env = Environment::isolated(Vec::<(String, String)>::new());
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let code = Box::new(cmd)
            .execute(&mut Streams::new(&mut out, &mut err), &mut env)
            .unwrap();
        assert_eq!(code, 127);
        assert_eq!(String::from_utf8(out).unwrap(), "ghost: command not found\n");
    }
}
