//! Argument vectors for running a Mojo file under a debugger.

use crate::error::{DebugError, DebugResult};

/// Flags passed to `mojo run` so the program is debuggable.
pub const RUN_DEBUG_FLAGS: [&str; 4] = ["run", "--no-optimization", "--debug-level", "full"];

/// Arguments for the runtime: `run <debug flags> <build args> <file> <program args>`.
pub fn run_invocation(file: &str, build_args: &[String], program_args: &[String]) -> Vec<String> {
    RUN_DEBUG_FLAGS
        .iter()
        .map(|flag| flag.to_string())
        .chain(build_args.iter().cloned())
        .chain(std::iter::once(file.to_string()))
        .chain(program_args.iter().cloned())
        .collect()
}

/// Join arguments into one string that a POSIX shell splits back into the
/// same arguments.
pub fn join_quoted(args: &[String]) -> DebugResult<String> {
    shlex::try_join(args.iter().map(String::as_str)).map_err(|e| {
        let argument = args
            .iter()
            .find(|a| a.contains('\0'))
            .cloned()
            .unwrap_or_default();
        DebugError::UnquotableArgument {
            argument,
            reason: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_run_invocation_order() {
        let args = run_invocation(
            "/a/b/main.mojo",
            &strings(&["-D", "X=1"]),
            &strings(&["--flag"]),
        );
        assert_eq!(
            args,
            strings(&[
                "run",
                "--no-optimization",
                "--debug-level",
                "full",
                "-D",
                "X=1",
                "/a/b/main.mojo",
                "--flag"
            ])
        );
    }

    #[test]
    fn test_join_quoted_survives_shell_split() {
        let args = strings(&["run", "a b"]);
        let joined = join_quoted(&args).unwrap();
        assert_eq!(shlex::split(&joined).unwrap(), args);
    }

    #[test]
    fn test_join_quoted_special_characters() {
        let args = strings(&["it's", "$HOME", "semi;colon", ""]);
        let joined = join_quoted(&args).unwrap();
        assert_eq!(shlex::split(&joined).unwrap(), args);
    }

    #[test]
    fn test_join_quoted_rejects_nul() {
        let err = join_quoted(&strings(&["ok", "bad\0arg"])).unwrap_err();
        match err {
            DebugError::UnquotableArgument { argument, .. } => assert_eq!(argument, "bad\0arg"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
