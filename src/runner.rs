use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// A single external command: program + argument list + env overrides.
/// Built as a list, never as a shell string, so values with spaces or
/// quotes (SQL statements, passwords) need no escaping.
#[derive(Debug, Clone)]
pub struct Cmd {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    cwd: Option<PathBuf>,
}

/// Captured result of one invocation. `code` is -1 when the process was
/// killed by a signal and never reported an exit status.
#[derive(Debug, Clone)]
pub struct CmdOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Cmd {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Human-readable command line for logs and error contexts.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }

    fn command(&self) -> Command {
        let mut c = Command::new(&self.program);
        c.args(&self.args);
        c.envs(std::env::vars());
        for (k, v) in &self.envs {
            c.env(k, v);
        }
        if let Some(dir) = &self.cwd {
            c.current_dir(dir);
        }
        c
    }

    /// Lenient mode: capture stdout/stderr and hand the result back for
    /// the caller to branch on. A non-zero exit is not an error here;
    /// only failing to spawn the process is.
    pub async fn output(&self) -> Result<CmdOutput> {
        let out = self
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("failed to run `{}`", self.display()))?;
        Ok(CmdOutput {
            code: out.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&out.stdout).trim_end().to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).trim_end().to_string(),
        })
    }

    /// Run with inherited stdio and return the raw exit code.
    pub async fn status(&self) -> Result<i32> {
        let status = self
            .command()
            .status()
            .await
            .with_context(|| format!("failed to run `{}`", self.display()))?;
        Ok(status.code().unwrap_or(if status.success() { 0 } else { 1 }))
    }

    /// Strict mode: inherited stdio, non-zero exit is an error.
    pub async fn run(&self) -> Result<()> {
        let code = self.status().await?;
        if code != 0 {
            return Err(anyhow!("`{}` exited with status {code}", self.display()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_program_and_args() {
        let cmd = Cmd::new("docker").args(["volume", "ls", "-qf", "dangling=true"]);
        assert_eq!(cmd.display(), "docker volume ls -qf dangling=true");
    }

    #[tokio::test]
    async fn output_captures_stdout() {
        let out = Cmd::new("sh").args(["-c", "echo hello"]).output().await.unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "hello");
        assert_eq!(out.stderr, "");
    }

    #[tokio::test]
    async fn output_is_lenient_about_exit_codes() {
        let out = Cmd::new("sh")
            .args(["-c", "echo oops >&2; exit 3"])
            .output()
            .await
            .unwrap();
        assert!(!out.success());
        assert_eq!(out.code, 3);
        assert_eq!(out.stderr, "oops");
    }

    #[tokio::test]
    async fn env_overrides_reach_the_child() {
        let out = Cmd::new("sh")
            .args(["-c", "printf %s \"$DB_HOST\""])
            .env("DB_HOST", "db_test")
            .output()
            .await
            .unwrap();
        assert_eq!(out.stdout, "db_test");
    }

    #[tokio::test]
    async fn run_fails_on_nonzero_exit() {
        let err = Cmd::new("sh").args(["-c", "exit 2"]).run().await.unwrap_err();
        assert!(err.to_string().contains("status 2"));
    }
}
