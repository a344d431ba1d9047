//! External command execution.
//!
//! Commands are described as structured [`CommandSpec`] values (program plus
//! argument vector) and handed to a [`CommandRunner`]. Nothing here goes
//! through `sh -c`, so arguments never need escaping locally; the quoted
//! rendering from [`CommandSpec::display`] is only for humans and logs.

use std::fs::File;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::utils::shell;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
    /// File streamed to the child's stdin (uploads over ssh).
    pub stdin_file: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            stdin_file: None,
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

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn stdin_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin_file = Some(path.into());
        self
    }

    /// Shell-quoted rendering, e.g. for logs and error details.
    pub fn display(&self) -> String {
        let mut rendered = shell::join_command(&self.program, &self.args);
        if let Some(stdin) = &self.stdin_file {
            rendered.push_str(" < ");
            rendered.push_str(&shell::quote_arg(&stdin.to_string_lossy()));
        }
        rendered
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
            exit_code: 0,
        }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
            exit_code,
        }
    }

    /// Prefers stderr, falls back to stdout if stderr is empty.
    pub fn error_text(&self) -> String {
        if !self.stderr.trim().is_empty() {
            self.stderr.trim().to_string()
        } else {
            self.stdout.trim().to_string()
        }
    }

    /// stdout and stderr together, for parsers that must see both streams.
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Runs external commands synchronously, one at a time.
pub trait CommandRunner {
    /// Run with stdout/stderr passed through to the terminal as they are produced.
    fn run(&self, spec: &CommandSpec) -> CommandOutput;

    /// Run and capture stdout/stderr for parsing.
    fn capture(&self, spec: &CommandSpec) -> CommandOutput;
}

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    fn build(spec: &CommandSpec) -> Result<Command, String> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);

        if let Some(dir) = &spec.current_dir {
            cmd.current_dir(dir);
        }

        if let Some(stdin_path) = &spec.stdin_file {
            let file = File::open(stdin_path)
                .map_err(|e| format!("Failed to open stdin file: {}", e))?;
            cmd.stdin(file);
        }

        Ok(cmd)
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> CommandOutput {
        let mut cmd = match Self::build(spec) {
            Ok(cmd) => cmd,
            Err(e) => return CommandOutput::failed(-1, e),
        };

        // Passthrough to terminal instead of capturing
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());

        match cmd.status() {
            Ok(status) => CommandOutput {
                stdout: String::new(),
                stderr: String::new(),
                success: status.success(),
                exit_code: status.code().unwrap_or(-1),
            },
            Err(e) => CommandOutput::failed(-1, format!("Command error: {}", e)),
        }
    }

    fn capture(&self, spec: &CommandSpec) -> CommandOutput {
        let mut cmd = match Self::build(spec) {
            Ok(cmd) => cmd,
            Err(e) => return CommandOutput::failed(-1, e),
        };

        match cmd.output() {
            Ok(out) => CommandOutput {
                stdout: String::from_utf8_lossy(&out.stdout).to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).to_string(),
                success: out.status.success(),
                exit_code: out.status.code().unwrap_or(-1),
            },
            Err(e) => CommandOutput::failed(-1, format!("Command error: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_arguments() {
        let spec = CommandSpec::new("./vendor/bin/drush")
            .arg("config:export")
            .arg("-y")
            .arg("--message=Sync from dev1");
        assert_eq!(
            spec.display(),
            "./vendor/bin/drush config:export -y '--message=Sync from dev1'"
        );
    }

    #[test]
    fn display_shows_stdin_redirect() {
        let spec = CommandSpec::new("ssh")
            .args(["web01", "cat > x"])
            .stdin_file("/tmp/.env prod");
        assert!(spec.display().ends_with("< '/tmp/.env prod'"));
    }

    #[test]
    fn error_text_prefers_stderr() {
        let out = CommandOutput {
            stdout: "stdout content".to_string(),
            stderr: "stderr content".to_string(),
            success: false,
            exit_code: 1,
        };
        assert_eq!(out.error_text(), "stderr content");
        assert_eq!(CommandOutput::ok(" only out ").error_text(), "only out");
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_captures_output() {
        let out = SystemRunner.capture(&CommandSpec::new("echo").arg("hello"));
        assert!(out.success);
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_reports_failure_exit_code() {
        let out = SystemRunner.run(&CommandSpec::new("false"));
        assert!(!out.success);
        assert_eq!(out.exit_code, 1);
    }

    #[test]
    fn system_runner_reports_missing_program() {
        let out = SystemRunner.capture(&CommandSpec::new("nonexistent_command_xyz"));
        assert!(!out.success);
        assert_eq!(out.exit_code, -1);
    }

    #[test]
    fn system_runner_reports_missing_stdin_file() {
        let spec = CommandSpec::new("cat").stdin_file("/nonexistent/stdin/file");
        let out = SystemRunner.capture(&spec);
        assert!(!out.success);
        assert!(out.stderr.contains("stdin"));
    }
}
