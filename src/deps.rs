//! Dependency injection traits for testability
//!
//! Every external collaborator (processes, HTTP, the host environment and
//! the terminal) sits behind one of these traits so the registry and command
//! logic can be exercised with fakes.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::composer::CommandSpec;

/// Command execution operations
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Check if a command exists in PATH
    async fn check_command_exists(&self, command: &str) -> Result<()>;

    /// Run a command and capture its output
    async fn execute(&self, command: &str, args: &[&str]) -> Result<CommandOutput>;

    /// Run a command, forwarding its output line by line as it is produced.
    ///
    /// When the command carries a stdout redirect, stdout is written to that
    /// file instead and only stderr is forwarded.
    async fn stream(&self, spec: &CommandSpec) -> Result<ExitStatus>;
}

/// Output from command execution
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Whether the process exited with status 0
    pub success: bool,
    /// Captured stdout
    pub stdout: Vec<u8>,
    /// Captured stderr
    pub stderr: Vec<u8>,
}

/// Exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    code: Option<i32>,
}

impl ExitStatus {
    /// Status from an exit code; `None` when killed by a signal
    pub const fn new(code: Option<i32>) -> Self {
        Self { code }
    }

    /// Whether the code is 0
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Exit code, if the process exited normally
    pub const fn code(&self) -> Option<i32> {
        self.code
    }
}

/// HTTP client used for release metadata lookups
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET a URL and return the body of a successful response
    async fn get(&self, url: &str, user_agent: &str) -> Result<String>;
}

/// Host environment lookups used when resolving the configuration directory
pub trait Environment: Send + Sync {
    /// Environment variable, if set
    fn get_var(&self, key: &str) -> Option<String>;

    /// Current user's home directory
    fn get_home_dir(&self) -> Option<PathBuf>;

    /// Whether a directory exists on the host
    fn dir_exists(&self, path: &Path) -> bool;

    /// Output of `systemd-path user-configuration`, if the helper is installed
    fn systemd_user_config_dir(&self) -> Option<PathBuf>;
}

/// User interface operations
pub trait UserInterface: Send + Sync {
    /// Create a spinner progress indicator
    fn create_spinner(&self) -> Box<dyn ProgressIndicator>;

    /// Print a message
    fn print(&self, message: &str);

    /// Print a styled message
    fn print_styled(&self, message: &str, style: MessageStyle);

    /// Check if running in interactive mode
    fn is_interactive(&self) -> bool;

    /// Prompt for text input
    fn prompt_input(&self, prompt: &str, default: Option<&str>) -> Result<String>;

    /// Prompt for selection
    fn prompt_select(&self, prompt: &str, items: &[&str], default: usize) -> Result<usize>;

    /// Prompt for a yes/no answer
    fn prompt_confirm(&self, prompt: &str, default: bool) -> Result<bool>;
}

/// Progress indicator trait
pub trait ProgressIndicator: Send + Sync {
    /// Set the message
    fn set_message(&self, message: &str);

    /// Finish and clear the progress
    fn finish_and_clear(&self);

    /// Enable steady tick
    fn enable_steady_tick(&self, duration: Duration);
}

/// Message styling options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStyle {
    /// Plain text
    Normal,
    /// Echoed commands
    Bold,
    /// Section headers
    Cyan,
    /// Yellow
    Warning,
    /// Red
    Error,
    /// Green
    Success,
}

// Production implementations

/// Production command executor implementation
pub struct RealCommandExecutor;

#[async_trait]
impl CommandExecutor for RealCommandExecutor {
    async fn check_command_exists(&self, command: &str) -> Result<()> {
        which::which(command)
            .map(|_| ())
            .map_err(|_| anyhow::anyhow!("{} not found in PATH", command))
    }

    async fn execute(&self, command: &str, args: &[&str]) -> Result<CommandOutput> {
        let output = tokio::process::Command::new(command)
            .args(args)
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to execute {}: {}", command, e))?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    async fn stream(&self, spec: &CommandSpec) -> Result<ExitStatus> {
        let mut cmd = tokio::process::Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::inherit())
            .stderr(Stdio::piped());

        match &spec.stdout_path {
            Some(path) => {
                let file = std::fs::File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                cmd.stdout(Stdio::from(file));
            }
            None => {
                cmd.stdout(Stdio::piped());
            }
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| anyhow::anyhow!("Failed to spawn {}: {}", spec.program, e))?;

        let stdout_task = child
            .stdout
            .take()
            .map(|out| tokio::spawn(forward_lines(out, false)));
        let stderr_task = child
            .stderr
            .take()
            .map(|err| tokio::spawn(forward_lines(err, true)));

        let status = child
            .wait()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to wait for {}: {}", spec.program, e))?;

        for task in [stdout_task, stderr_task].into_iter().flatten() {
            task.await.context("Output forwarding task panicked")??;
        }

        tracing::debug!(program = %spec.program, code = ?status.code(), "command finished");
        Ok(ExitStatus::new(status.code()))
    }
}

async fn forward_lines<R>(reader: R, to_stderr: bool) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        if to_stderr {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }
    Ok(())
}

/// Production HTTP client backed by reqwest
pub struct RealHttpClient;

#[async_trait]
impl HttpClient for RealHttpClient {
    async fn get(&self, url: &str, user_agent: &str) -> Result<String> {
        let response = reqwest::Client::new()
            .get(url)
            .header("User-Agent", user_agent)
            .send()
            .await?
            .error_for_status()?;

        response
            .text()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read response: {}", e))
    }
}

/// Production environment
pub struct RealEnvironment;

impl Environment for RealEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }

    fn get_home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }

    fn dir_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn systemd_user_config_dir(&self) -> Option<PathBuf> {
        let helper = which::which("systemd-path").ok()?;
        let output = std::process::Command::new(&helper)
            .arg("user-configuration")
            .output()
            .ok()?;
        if !output.status.success() {
            tracing::warn!("{} exited with {}", helper.display(), output.status);
            return None;
        }
        let dir = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!dir.is_empty()).then(|| PathBuf::from(dir))
    }
}
