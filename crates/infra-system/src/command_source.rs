// External scraper process as a JobSource
// reason: tokio::process for async child management, kill_on_drop for timeouts
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use jobwatch_core::application::constants::SOURCE_STDERR_TAIL_BYTES;
use jobwatch_core::domain::JobFields;
use jobwatch_core::port::{JobSource, SourceError};

/// Variables a scraper inherits from the daemon unless configured otherwise
pub const DEFAULT_ENV_ALLOWLIST: [&str; 6] = ["PATH", "HOME", "USER", "LANG", "TMPDIR", "TZ"];

/// How to launch one scraper
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    /// Set explicitly on the child, on top of the allowlisted inherited variables
    pub env: HashMap<String, String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Duration,
}

/// Runs a scraper and reads candidates from its stdout.
///
/// Stdout is either one JSON array of candidates or one candidate object per
/// line. The child runs with a cleared environment plus the allowlisted
/// variables, and is killed if it outlives the timeout.
pub struct CommandSource {
    spec: CommandSpec,
    env_allowlist: Vec<String>,
}

impl CommandSource {
    /// # Arguments
    /// * `spec` - Program, arguments and limits
    /// * `env_allowlist` - Daemon environment variables passed through to the child
    pub fn new(spec: CommandSpec, env_allowlist: Vec<String>) -> Self {
        Self {
            spec,
            env_allowlist,
        }
    }

    /// Inherited variables, filtered to the allowlist, then explicit overrides
    fn child_env(&self) -> HashMap<String, String> {
        let mut env: HashMap<String, String> = std::env::vars()
            .filter(|(k, _)| self.env_allowlist.contains(k))
            .collect();
        env.extend(self.spec.env.clone());
        env
    }

    async fn spawn_and_wait(&self) -> Result<std::process::Output, SourceError> {
        let mut cmd = Command::new(&self.spec.command);
        cmd.args(&self.spec.args)
            .env_clear()
            .envs(self.child_env())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.spec.working_dir {
            cmd.current_dir(dir);
        }

        let child = cmd
            .spawn()
            .map_err(|e| SourceError::SpawnFailed(format!("{}: {}", self.spec.command, e)))?;

        // Dropping the wait future on timeout drops the child, which kills it
        match timeout(self.spec.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(SourceError::IoError(e.to_string())),
            Err(_) => Err(SourceError::Timeout(self.spec.timeout.as_millis() as u64)),
        }
    }
}

#[async_trait]
impl JobSource for CommandSource {
    fn name(&self) -> &str {
        &self.spec.name
    }

    async fn scrape(&self) -> Result<Vec<JobFields>, SourceError> {
        info!(
            source = %self.spec.name,
            command = %self.spec.command,
            args = ?self.spec.args,
            timeout_ms = self.spec.timeout.as_millis() as u64,
            "Starting scraper process"
        );

        let output = self.spawn_and_wait().await?;
        let stderr = stderr_tail(&output.stderr, SOURCE_STDERR_TAIL_BYTES);

        if !output.status.success() {
            return Err(SourceError::ExitStatus {
                code: output.status.code(),
                stderr,
            });
        }
        if !stderr.is_empty() {
            debug!(source = %self.spec.name, stderr = %stderr, "Scraper wrote to stderr");
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| SourceError::InvalidOutput(format!("stdout is not UTF-8: {}", e)))?;
        let candidates = parse_candidates(&stdout)?;

        if candidates.is_empty() {
            warn!(source = %self.spec.name, "Scraper produced no candidates");
        }
        Ok(candidates)
    }
}

/// Parse scraper stdout: a JSON array, or JSON lines
pub fn parse_candidates(stdout: &str) -> Result<Vec<JobFields>, SourceError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed)
            .map_err(|e| SourceError::InvalidOutput(format!("JSON array: {}", e)));
    }

    trimmed
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .map_err(|e| SourceError::InvalidOutput(format!("line {}: {}", i + 1, e)))
        })
        .collect()
}

/// Last `max` bytes of stderr, cut on a char boundary
fn stderr_tail(stderr: &[u8], max: usize) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= max {
        return text.to_string();
    }

    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}
