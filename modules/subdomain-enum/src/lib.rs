//! External subdomain enumeration tools: the registry, the launcher and
//! output collection.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, warn};

/// Where a tool delivers its findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// The tool writes the file named by the `{output}` placeholder itself.
    File,
    /// The tool prints to stdout; we capture it and write the file ourselves.
    Stdout,
}

/// One external enumeration tool and how to invoke it.
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub args: &'static [&'static str],
    pub output: OutputMode,
    pub needs_key: bool,
}

/// The passive enumeration tools, tried in this order for every domain.
pub const TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "findomain",
        args: &["-t", "{domain}", "-u", "{output}"],
        output: OutputMode::File,
        needs_key: false,
    },
    ToolSpec {
        name: "subfinder",
        args: &["-d", "{domain}", "-all", "-o", "{output}"],
        output: OutputMode::File,
        needs_key: false,
    },
    ToolSpec {
        name: "assetfinder",
        args: &["--subs-only", "{domain}"],
        output: OutputMode::Stdout,
        needs_key: false,
    },
    ToolSpec {
        name: "amass",
        args: &["enum", "-passive", "-d", "{domain}", "-o", "{output}"],
        output: OutputMode::File,
        needs_key: false,
    },
    ToolSpec {
        name: "chaos",
        args: &["-d", "{domain}", "-key", "{key}", "-o", "{output}"],
        output: OutputMode::File,
        needs_key: true,
    },
];

/// How a tool invocation ended. Only a launch that exits in time can leave
/// output worth importing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Completed { exit_code: Option<i32> },
    TimedOut,
    LaunchFailed,
    SkippedMissingKey,
}

/// Substitute the `{domain}`, `{output}` and `{key}` placeholders in a tool's
/// argument template. Arguments are passed to the process verbatim, never
/// through a shell.
pub fn expand_args(spec: &ToolSpec, domain: &str, output: &Path, key: Option<&str>) -> Vec<String> {
    spec.args
        .iter()
        .map(|a| {
            a.replace("{domain}", domain)
                .replace("{output}", &output.to_string_lossy())
                .replace("{key}", key.unwrap_or(""))
        })
        .collect()
}

/// Launch one tool against `domain` and wait at most `wait` for it to finish.
///
/// Failures stay contained here: a missing binary, an expired deadline or an
/// absent API key become a warning and the caller moves on to the next tool.
pub async fn run_tool(
    spec: &ToolSpec,
    domain: &str,
    temp_dir: &Path,
    key: Option<&str>,
    wait: Duration,
) -> ToolOutcome {
    if spec.needs_key && key.is_none() {
        warn!(tool = spec.name, domain, "no API key configured, skipping");
        return ToolOutcome::SkippedMissingKey;
    }

    let output = recon_core::paths::tool_output_path(temp_dir, domain, spec.name);
    let args = expand_args(spec, domain, &output, key);
    info!(tool = spec.name, domain, "scan started");

    let mut cmd = Command::new(spec.name);
    cmd.args(&args).stdin(Stdio::null()).kill_on_drop(true);

    match spec.output {
        OutputMode::File => {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
            let mut child = match cmd.spawn() {
                Ok(child) => child,
                Err(err) => {
                    warn!(tool = spec.name, domain, %err, "failed to launch");
                    return ToolOutcome::LaunchFailed;
                }
            };
            match timeout(wait, child.wait()).await {
                Ok(Ok(status)) => completed(spec.name, domain, status),
                Ok(Err(err)) => {
                    warn!(tool = spec.name, domain, %err, "lost track of child process");
                    ToolOutcome::LaunchFailed
                }
                Err(_) => {
                    warn!(
                        tool = spec.name,
                        domain,
                        timeout_secs = wait.as_secs(),
                        "deadline expired, killing"
                    );
                    let _ = child.start_kill();
                    ToolOutcome::TimedOut
                }
            }
        }
        OutputMode::Stdout => {
            cmd.stdout(Stdio::piped()).stderr(Stdio::null());
            let child = match cmd.spawn() {
                Ok(child) => child,
                Err(err) => {
                    warn!(tool = spec.name, domain, %err, "failed to launch");
                    return ToolOutcome::LaunchFailed;
                }
            };
            // wait_with_output consumes the child; kill_on_drop reaps it if
            // the deadline fires first.
            match timeout(wait, child.wait_with_output()).await {
                Ok(Ok(out)) => {
                    if out.status.success() {
                        if let Err(err) = std::fs::write(&output, &out.stdout) {
                            warn!(tool = spec.name, domain, %err, "could not persist captured stdout");
                        }
                    }
                    completed(spec.name, domain, out.status)
                }
                Ok(Err(err)) => {
                    warn!(tool = spec.name, domain, %err, "lost track of child process");
                    ToolOutcome::LaunchFailed
                }
                Err(_) => {
                    warn!(
                        tool = spec.name,
                        domain,
                        timeout_secs = wait.as_secs(),
                        "deadline expired, killing"
                    );
                    ToolOutcome::TimedOut
                }
            }
        }
    }
}

fn completed(tool: &str, domain: &str, status: ExitStatus) -> ToolOutcome {
    if status.success() {
        info!(tool, domain, "scan completed");
    } else {
        warn!(tool, domain, code = ?status.code(), "exited with failure");
    }
    ToolOutcome::Completed { exit_code: status.code() }
}

/// Read back the lines a tool produced for `domain`, trimmed, with blanks
/// dropped. `None` means the tool left no file behind, which is normal for a
/// tool that found nothing or never ran.
pub fn read_tool_output(temp_dir: &Path, domain: &str, tool: &str) -> Result<Option<Vec<String>>> {
    let path = recon_core::paths::tool_output_path(temp_dir, domain, tool);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!(tool, domain, "produced no output");
            return Ok(None);
        }
        Err(err) => return Err(err).context(format!("reading {}", path.display())),
    };
    let lines: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    Ok(Some(lines))
}
