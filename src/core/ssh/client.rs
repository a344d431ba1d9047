use serde::Serialize;
use std::path::Path;

use crate::executor::CommandSpec;
use crate::utils::shell;

/// A host reached over ssh. Builds command specs; never runs anything itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteHost {
    pub program: String,
    pub user: String,
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<String>,
}

impl RemoteHost {
    pub fn new(
        program: impl Into<String>,
        user: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        identity_file: Option<&str>,
    ) -> Self {
        Self {
            program: program.into(),
            user: user.into(),
            host: host.into(),
            port,
            identity_file: identity_file
                .filter(|path| !path.is_empty())
                .map(|path| shellexpand::tilde(path).to_string()),
        }
    }

    /// `user@host`
    pub fn target(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    fn option_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(identity_file) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity_file.clone());
        }

        if self.port != 22 {
            args.push("-p".to_string());
            args.push(self.port.to_string());
        }

        // Fail instead of hanging on prompts or stalled connections.
        args.extend([
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "ConnectTimeout=10".to_string(),
            "-o".to_string(),
            "ServerAliveInterval=15".to_string(),
            "-o".to_string(),
            "ServerAliveCountMax=3".to_string(),
        ]);

        args
    }

    /// One ssh invocation running `command` in the remote login shell.
    pub fn command(&self, command: &RemoteCommand) -> CommandSpec {
        CommandSpec::new(&self.program)
            .args(self.option_args())
            .arg(self.target())
            .arg(command.render())
    }

    /// Stream a local file to `remote_path` through `cat`.
    pub fn upload(&self, local: &Path, remote_path: &str) -> CommandSpec {
        let remote_command = format!("cat > {}", shell::quote_path(remote_path));
        CommandSpec::new(&self.program)
            .args(self.option_args())
            .arg(self.target())
            .arg(remote_command)
            .stdin_file(local)
    }

    /// Value for rsync's `-e` option so it connects the same way.
    pub fn rsync_shell(&self) -> String {
        shell::join_command(&self.program, &self.option_args())
    }

    /// rsync destination for a directory, e.g. `user@host:public_html/`.
    pub fn rsync_destination(&self, remote_dir: &str) -> String {
        format!("{}:{}/", self.target(), remote_dir.trim_end_matches('/'))
    }
}

/// A shell command line for the remote host, built from structured parts.
///
/// Every word is quoted when rendered, so collected values never reach the
/// remote shell unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCommand {
    Exec { program: String, args: Vec<String> },
    InDir { dir: String, command: Box<RemoteCommand> },
    And(Box<RemoteCommand>, Box<RemoteCommand>),
    Or(Box<RemoteCommand>, Box<RemoteCommand>),
    Pipe(Box<RemoteCommand>, Box<RemoteCommand>),
    AppendTo { command: Box<RemoteCommand>, path: String },
}

impl RemoteCommand {
    pub fn exec<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RemoteCommand::Exec {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn in_dir(self, dir: impl Into<String>) -> Self {
        RemoteCommand::InDir {
            dir: dir.into(),
            command: Box::new(self),
        }
    }

    pub fn and(self, next: RemoteCommand) -> Self {
        RemoteCommand::And(Box::new(self), Box::new(next))
    }

    pub fn or(self, fallback: RemoteCommand) -> Self {
        RemoteCommand::Or(Box::new(self), Box::new(fallback))
    }

    pub fn pipe(self, consumer: RemoteCommand) -> Self {
        RemoteCommand::Pipe(Box::new(self), Box::new(consumer))
    }

    pub fn append_to(self, path: impl Into<String>) -> Self {
        RemoteCommand::AppendTo {
            command: Box::new(self),
            path: path.into(),
        }
    }

    pub fn render(&self) -> String {
        match self {
            RemoteCommand::Exec { program, args } => shell::join_command(program, args),
            RemoteCommand::InDir { dir, command } => {
                format!("cd {} && {}", shell::quote_path(dir), command.render_grouped())
            }
            RemoteCommand::And(a, b) => {
                format!("{} && {}", a.render_grouped(), b.render_grouped())
            }
            RemoteCommand::Or(a, b) => {
                format!("{} || {}", a.render_grouped(), b.render_grouped())
            }
            RemoteCommand::Pipe(a, b) => {
                format!("{} | {}", a.render_grouped(), b.render_grouped())
            }
            RemoteCommand::AppendTo { command, path } => {
                format!("{} >> {}", command.render_grouped(), shell::quote_path(path))
            }
        }
    }

    fn render_grouped(&self) -> String {
        match self {
            RemoteCommand::Exec { .. } => self.render(),
            _ => format!("( {} )", self.render()),
        }
    }
}
