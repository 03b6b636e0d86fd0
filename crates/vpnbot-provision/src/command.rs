//! External Tool Invocation
//!
//! Thin async wrapper around `tokio::process` for the `wg` utility and
//! friends. Captures stdout, reports stderr on failure.

use std::process::{ExitStatus, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// External tool errors
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Failed to launch {program}: {source}")]
    Unavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error talking to {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed ({status}): {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{program} produced non-UTF-8 output")]
    InvalidOutput { program: String },
}

/// Run `program` with `args`, optionally feeding `input` on stdin.
///
/// Returns trimmed stdout. A non-zero exit status is an error.
pub(crate) async fn run_tool(
    program: &str,
    args: &[&str],
    input: Option<&str>,
) -> Result<String, ToolError> {
    debug!("Running {} {}", program, args.join(" "));

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|source| ToolError::Unavailable {
        program: program.to_string(),
        source,
    })?;

    if let Some(input) = input {
        if let Some(mut stdin) = child.stdin.take() {
            let mut line = String::with_capacity(input.len() + 1);
            line.push_str(input);
            line.push('\n');

            match stdin.write_all(line.as_bytes()).await {
                Ok(()) => {}
                // Tool exited without reading; its status and stderr tell why
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    debug!("{} closed stdin early", program);
                }
                Err(source) => {
                    return Err(ToolError::Io {
                        program: program.to_string(),
                        source,
                    });
                }
            }
            // Dropping the handle closes the pipe so the tool sees EOF
        }
    }

    let output = child.wait_with_output().await.map_err(|source| ToolError::Io {
        program: program.to_string(),
        source,
    })?;

    if !output.status.success() {
        return Err(ToolError::Failed {
            program: program.to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8(output.stdout).map_err(|_| ToolError::InvalidOutput {
        program: program.to_string(),
    })?;

    Ok(stdout.trim().to_string())
}
