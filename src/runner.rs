//! Child process execution with live output streaming.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{error, info, warn};

/// Runs `program` with `args` and waits for it to exit.
///
/// Stdout lines are logged at info and stderr lines at warn as they arrive,
/// so long-running builds stay observable. Returns `true` iff the child
/// exited with status zero; a spawn failure or signal termination is just a
/// failure, callers only need pass/fail.
pub async fn run(program: &Path, args: &[String]) -> bool {
    info!("Running: {} {}", program.display(), args.join(" "));

    let mut child = match Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            error!("Failed to start {}: {}", program.display(), e);
            return false;
        }
    };

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let stdout_task = tokio::spawn(async move {
        if let Some(stdout) = stdout {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!("{}", line);
            }
        }
    });

    let stderr_task = tokio::spawn(async move {
        if let Some(stderr) = stderr {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!("{}", line);
            }
        }
    });

    let status = child.wait().await;

    // Drain remaining output before reporting the result.
    let _ = tokio::join!(stdout_task, stderr_task);

    match status {
        Ok(status) if status.success() => true,
        Ok(status) => {
            warn!("{} exited with {}", program.display(), status);
            false
        }
        Err(e) => {
            error!("Failed to wait on {}: {}", program.display(), e);
            false
        }
    }
}
