//! Run loop: wires the console collector and the companion command to one
//! output pipeline.

use std::sync::Arc;
use std::time::Duration;

use devtap_console_log::{Collector, Pipeline, TermColor};
use devtap_process_log::{ChildProcess, OnLineFn, OutputStream, ProcessLine, prefix};
use tokio_util::sync::CancellationToken;

use crate::config::Settings;

/// How long to wait for the child's pipes to drain after it exits.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Captures until Ctrl-C or until the companion command exits.
///
/// Returns the command's exit code, if it ran and exited on its own.
pub async fn run(settings: Settings) -> anyhow::Result<Option<i32>> {
    let mut child = if settings.command.is_empty() {
        None
    } else {
        Some(ChildProcess::spawn(&settings.command)?)
    };

    let pipeline = Pipeline::new(settings.pipeline.clone());
    let collector = Collector::new(settings.capture.clone(), pipeline.clone());
    collector.start().await;

    let cancel = CancellationToken::new();
    let pumps = child.as_mut().map(|c| {
        let on_line = passthrough(&pipeline, c.name());
        c.pump_output(on_line, cancel.clone())
    });

    let exit_code = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("interrupted");
            if let Some(child) = child.as_mut() {
                child.kill().await?;
            }
            None
        }
        status = wait_child(child.as_mut()) => status?.code(),
    };

    if let Some(pumps) = pumps {
        if tokio::time::timeout(DRAIN_TIMEOUT, pumps.join()).await.is_err() {
            tracing::warn!("child output did not close in time");
            cancel.cancel();
        }
    }

    collector.stop().await;
    pipeline.close();
    Ok(exit_code)
}

/// Waits for the child, or forever when there is none.
async fn wait_child(
    child: Option<&mut ChildProcess>,
) -> Result<std::process::ExitStatus, devtap_process_log::ProcessLogError> {
    match child {
        Some(child) => child.wait().await,
        None => std::future::pending().await,
    }
}

/// Writes child lines through the pipeline with a `[name]` prefix; stderr
/// lines are red.
fn passthrough(pipeline: &Pipeline, name: &str) -> OnLineFn {
    let pipeline = pipeline.clone();
    let name = name.to_string();
    Arc::new(move |line: ProcessLine| {
        let color = (line.stream == OutputStream::Stderr).then_some(TermColor::Red);
        let text = format!("{}{}\n", prefix(&name, line.stream), line.text);
        pipeline.write_passthrough(&text, color);
    })
}
