use crate::error::{self, Result};
use log::{debug, trace};
use snafu::{ensure, ResultExt};
use std::ffi::OsStr;
use std::path::Path;
use tokio::process::Command;

/// Run `program` with `args` and return its stdout. A non-zero exit status is an error that
/// carries both stdout and stderr.
pub async fn run<I, S>(program: &str, args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command.args(args);
    output(program, command).await
}

/// Like [`run`], with `dir` as the working directory.
pub async fn run_in<I, S>(dir: &Path, program: &str, args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command.args(args).current_dir(dir);
    output(program, command).await
}

async fn output(program: &str, mut command: Command) -> Result<String> {
    let display = format!("{:?}", command.as_std());
    debug!("Running {}", display);
    let output = command
        .kill_on_drop(true)
        .output()
        .await
        .context(error::ProcessSnafu { what: program })?;
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    trace!("{} stdout: {}", program, stdout);
    ensure!(
        output.status.success(),
        error::CommandFailedSnafu {
            command: display,
            status: output.status.to_string(),
            stdout,
            stderr,
        }
    );
    Ok(stdout)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn captures_stdout() {
        let stdout = run("echo", ["hello"]).await.unwrap();
        assert_eq!(stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn failure_carries_stderr() {
        let err = run("sh", ["-c", "echo broken >&2; exit 3"])
            .await
            .unwrap_err();
        assert!(
            matches!(&err, Error::CommandFailed { stderr, status, .. }
                if stderr.trim() == "broken" && status.contains('3'))
        );
    }

    #[tokio::test]
    async fn missing_program() {
        let err = run("definitely-not-a-real-program", Vec::<String>::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Process { .. }));
    }

    #[tokio::test]
    async fn runs_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let stdout = run_in(dir.path(), "pwd", Vec::<String>::new())
            .await
            .unwrap();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(
            Path::new(stdout.trim()).canonicalize().unwrap(),
            expected
        );
    }
}
