//! Liveness indicator
//!
//! Cosmetic spinner that tells the user the process has not hung. It runs
//! on its own task, shares nothing with the dialer or relay except the
//! output device, and stops through its handle.

use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;

use crate::common::Shutdown;

/// Frames written in order, each overwriting the previous one
pub const FRAMES: &[u8; 5] = b"-\\|/-";

/// Handle to a running indicator. Dropping it aborts the task.
pub struct IndicatorHandle {
    stop: Shutdown,
    task: Option<JoinHandle<()>>,
}

impl IndicatorHandle {
    /// Whether the spinner task is still alive
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the spinner and wait for its task to finish
    pub async fn stop(mut self) {
        self.stop.trigger();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for IndicatorHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Start a spinner on stdout
pub fn start(interval: Duration) -> IndicatorHandle {
    start_with_writer(interval, tokio::io::stdout())
}

/// Start a spinner on any writer
pub fn start_with_writer<W>(interval: Duration, writer: W) -> IndicatorHandle
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let stop = Shutdown::new();
    let task = tokio::spawn(spin(interval, writer, stop.clone()));

    IndicatorHandle {
        stop,
        task: Some(task),
    }
}

async fn spin<W>(interval: Duration, mut writer: W, stop: Shutdown)
where
    W: AsyncWrite + Unpin,
{
    loop {
        for &frame in FRAMES {
            let bytes = [b'\r', frame];
            tokio::select! {
                biased;
                _ = stop.triggered() => return,
                written = draw(&mut writer, &bytes) => {
                    if written.is_err() {
                        return;
                    }
                }
            }

            tokio::select! {
                biased;
                _ = stop.triggered() => return,
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }
}

async fn draw<W>(writer: &mut W, frame: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await?;
    writer.flush().await
}
