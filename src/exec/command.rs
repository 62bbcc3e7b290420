// src/exec/command.rs

//! Run external tool commands (linters, transpilers) over one file.
//!
//! The command line goes through the platform shell so users can write
//! pipes and flags the way they would in a terminal. The file contents are
//! fed on stdin; `{file}` in the command line is replaced with the source
//! path so tools that need a filename for diagnostics can have one.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Placeholder substituted with the source path.
pub const FILE_PLACEHOLDER: &str = "{file}";

/// Captured result of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Expand `{file}` in a command line.
pub fn expand_command(cmd: &str, file: &Path) -> String {
    cmd.replace(FILE_PLACEHOLDER, &file.to_string_lossy())
}

/// Spawn `cmd` through the shell, write `input` to its stdin, and collect
/// its output. A non-zero exit is *not* an error here; callers decide what
/// it means.
pub async fn run_with_stdin(cmd: &str, file: &Path, input: &[u8]) -> Result<CommandOutput> {
    let line = expand_command(cmd, file);
    debug!(cmd = %line, file = %file.display(), "running external command");

    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&line);
        c
    };

    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning '{line}'"))?;

    // Feed stdin from a separate task so a tool that writes a lot before it
    // finishes reading cannot deadlock against us.
    let writer = child.stdin.take().map(|mut stdin| {
        let input = input.to_vec();
        tokio::spawn(async move {
            // A tool may legitimately exit without reading all of stdin.
            let _ = stdin.write_all(&input).await;
            let _ = stdin.shutdown().await;
        })
    });

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("waiting for '{line}'"))?;

    if let Some(writer) = writer {
        let _ = writer.await;
    }

    Ok(CommandOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: output.stdout,
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
