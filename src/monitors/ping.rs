//! Reachability probes
//!
//! A [`Prober`] answers one question for one target: is it reachable, and how
//! long did it take? Every failure mode (spawn error, non-zero exit, timeout)
//! collapses into [`ProbeResult::down`], so callers never see an error.
//!
//! [`PingProber`] shells out to the system `ping` binary once per probe.

use std::sync::LazyLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, instrument, trace};

use crate::{ProbeResult, Target, util::round_ms};

static LATENCY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)time=\s*([0-9]+(?:[.,][0-9]+)?)").expect("latency pattern is valid")
});

/// Executes a single reachability check against one target.
///
/// Implementations must return within `timeout`.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, target: &Target, timeout: Duration) -> ProbeResult;
}

/// Probe backed by the operating system's `ping` command
#[derive(Debug, Clone)]
pub struct PingProber {
    program: String,

    /// Arguments placed before the generated ping arguments
    leading_args: Vec<String>,
}

impl Default for PingProber {
    fn default() -> Self {
        Self::new()
    }
}

impl PingProber {
    pub fn new() -> Self {
        Self {
            program: "ping".to_string(),
            leading_args: vec![],
        }
    }

    /// Use a different executable in place of `ping`.
    pub fn with_command<I, S>(program: impl ToString, leading_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self {
            program: program.to_string(),
            leading_args: leading_args.into_iter().map(|arg| arg.to_string()).collect(),
        }
    }

    /// Run the command and return its stdout if it exited successfully.
    async fn execute(&self, address: &str, timeout: Duration) -> Result<String> {
        let output = Command::new(&self.program)
            .args(&self.leading_args)
            .args(ping_args(address, timeout))
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to execute '{}'", self.program))?;

        if !output.status.success() {
            bail!("'{}' exited with {}", self.program, output.status);
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl Prober for PingProber {
    #[instrument(skip_all, fields(host = %target.address))]
    async fn probe(&self, target: &Target, timeout: Duration) -> ProbeResult {
        let start = Instant::now();

        match tokio::time::timeout(timeout, self.execute(&target.address, timeout)).await {
            Ok(Ok(stdout)) => {
                let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
                let latency = parse_latency(&stdout).unwrap_or_else(|| {
                    trace!("no latency in ping output, using elapsed time");
                    round_ms(elapsed_ms)
                });
                ProbeResult::up(latency)
            }
            Ok(Err(e)) => {
                debug!("probe failed: {e:#}");
                ProbeResult::down()
            }
            Err(_) => {
                debug!("probe timed out after {timeout:?}");
                ProbeResult::down()
            }
        }
    }
}

/// Build the platform specific arguments for a single echo request.
pub fn ping_args(address: &str, timeout: Duration) -> Vec<String> {
    if cfg!(target_os = "windows") {
        let millis = timeout.as_millis().max(1);
        vec![
            "-n".to_string(),
            "1".to_string(),
            "-w".to_string(),
            millis.to_string(),
            address.to_string(),
        ]
    } else {
        // -W only takes whole seconds
        let secs = timeout.as_secs_f64().ceil().max(1.0) as u64;
        vec![
            "-c".to_string(),
            "1".to_string(),
            "-W".to_string(),
            secs.to_string(),
            address.to_string(),
        ]
    }
}

/// Extract the round-trip time from the first `time=` occurrence in `output`.
pub fn parse_latency(output: &str) -> Option<f64> {
    let captures = LATENCY_PATTERN.captures(output)?;
    captures[1].replace(',', ".").parse().ok()
}
