//! Spawning the companion command.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::error::ProcessLogError;
use crate::pump::{OnLineFn, OutputPumps, pump_lines};
use crate::OutputStream;

/// A command spawned once with piped output.
///
/// The process is killed if the handle is dropped while it still runs.
pub struct ChildProcess {
    name: String,
    child: Child,
}

impl ChildProcess {
    /// Spawns `command[0]` with the remaining elements as arguments.
    pub fn spawn(command: &[String]) -> Result<Self, ProcessLogError> {
        let (program, args) = command.split_first().ok_or(ProcessLogError::EmptyCommand)?;

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessLogError::Spawn {
                program: program.clone(),
                source,
            })?;

        let name = display_name(program);
        tracing::info!(pid = child.id(), name = %name, "spawned child command");
        Ok(Self { name, child })
    }

    /// Short name used in line prefixes: the program's file stem.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Starts pumping stdout and stderr into `on_line`.
    ///
    /// Each pipe can be taken once; a second call pumps nothing.
    pub fn pump_output(&mut self, on_line: OnLineFn, cancel: CancellationToken) -> OutputPumps {
        let mut handles = Vec::with_capacity(2);
        if let Some(stdout) = self.child.stdout.take() {
            handles.push(tokio::spawn(pump_lines(
                stdout,
                OutputStream::Stdout,
                on_line.clone(),
                cancel.clone(),
            )));
        }
        if let Some(stderr) = self.child.stderr.take() {
            handles.push(tokio::spawn(pump_lines(
                stderr,
                OutputStream::Stderr,
                on_line,
                cancel,
            )));
        }
        OutputPumps::new(handles)
    }

    /// Waits for the child to exit.
    pub async fn wait(&mut self) -> Result<ExitStatus, ProcessLogError> {
        let status = self.child.wait().await?;
        tracing::info!(name = %self.name, %status, "child command exited");
        Ok(status)
    }

    /// Kills the child and reaps it. A child that already exited is fine.
    pub async fn kill(&mut self) -> Result<(), ProcessLogError> {
        if self.child.try_wait()?.is_some() {
            return Ok(());
        }
        self.child.kill().await?;
        tracing::debug!(name = %self.name, "child command killed");
        Ok(())
    }
}

fn display_name(program: &str) -> String {
    Path::new(program)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(program)
        .to_string()
}
