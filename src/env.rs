use std::collections::HashMap;
use std::env as stdenv;

/// The shell's view of the process environment.
///
/// The environment contains:
/// - `vars`: variables captured at start-up (e.g., PATH, HOME).
/// - `inherit`: whether lookups missing from `vars` fall through to the live process environment.
/// - `should_exit`: set by `exit 0`; the read-eval loop stops once it sees it.
///
/// The working directory is not tracked here: `cd` changes the process's own
/// working directory and `pwd` reads it back from the OS.
#[derive(Debug, Clone)]
pub struct Environment {
    pub vars: HashMap<String, String>,
    inherit: bool,
    pub should_exit: bool,
}

impl Environment {
    /// Capture the current process variables into a new `Environment`.
    pub fn new() -> Self {
        Self {
            vars: stdenv::vars().collect(),
            inherit: true,
            should_exit: false,
        }
    }

    /// An environment that sees only the given variables.
    pub fn isolated<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            inherit: false,
            should_exit: false,
        }
    }

    /// Get the value of an environment variable.
    ///
    /// Looks up the key in `self.vars` first, falling back to `std::env::var`
    /// unless the environment is isolated.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| self.inherit.then(|| stdenv::var(key).ok()).flatten())
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captured_vars_win_over_process_env() {
        let mut env = Environment::new();
        env.vars.insert("PATH".to_owned(), "/captured".to_owned());
        assert_eq!(env.get_var("PATH").as_deref(), Some("/captured"));

        // inherited lookups still reach the live environment
        env.vars.clear();
        assert!(env.get_var("PATH").is_some());
    }

    #[test]
    fn test_env_reads_from_process_env() {
        let env = Environment::new();
        assert!(env.get_var("PATH").is_some());
        assert!(!env.should_exit);
    }

    #[test]
    fn test_isolated_env_hides_process_vars() {
        let env = Environment::isolated([("HOME", "/somewhere")]);
        assert_eq!(env.get_var("HOME").as_deref(), Some("/somewhere"));
        assert_eq!(env.get_var("PATH"), None);
    }
}
