//! Interrupt handler
//!
//! Turns Ctrl-C / SIGTERM into a shutdown signal. Whatever is dialing or
//! relaying observes the token and tears down; the binary then exits 0.

use std::future::Future;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::common::Shutdown;

/// Notice printed to the terminal when an interrupt arrives
pub const INTERRUPT_NOTICE: &str = "\rinterrupt received, shutting down";

/// Listen for Ctrl-C and SIGTERM, triggering `shutdown` on the first one.
///
/// The listeners are registered before this returns, so a signal that lands
/// before the task first runs is still caught.
pub fn install(shutdown: Shutdown) -> JoinHandle<()> {
    install_with(wait_for_termination(), shutdown)
}

/// Trigger `shutdown` once `signal` completes
pub fn install_with<F>(signal: F, shutdown: Shutdown) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        signal.await;
        println!("{}", INTERRUPT_NOTICE);
        info!("Exiting program");
        shutdown.trigger();
    })
}

/// Register the listeners now; the returned future resolves on the first
/// Ctrl-C or SIGTERM.
///
/// Must be called from within a tokio runtime.
pub fn wait_for_termination() -> impl Future<Output = ()> + Send + 'static {
    let signals = Signals::register();
    signals.recv()
}

#[cfg(unix)]
struct Signals {
    interrupt: Option<tokio::signal::unix::Signal>,
    terminate: Option<tokio::signal::unix::Signal>,
}

#[cfg(unix)]
impl Signals {
    fn register() -> Self {
        use tokio::signal::unix::SignalKind;

        Self {
            interrupt: listen(SignalKind::interrupt(), "SIGINT"),
            terminate: listen(SignalKind::terminate(), "SIGTERM"),
        }
    }

    async fn recv(mut self) {
        tokio::select! {
            _ = next(self.interrupt.as_mut()) => {}
            _ = next(self.terminate.as_mut()) => {}
        }
    }
}

#[cfg(unix)]
fn listen(kind: tokio::signal::unix::SignalKind, name: &str) -> Option<tokio::signal::unix::Signal> {
    match tokio::signal::unix::signal(kind) {
        Ok(signal) => Some(signal),
        Err(e) => {
            warn!("Could not install {} handler: {}", name, e);
            None
        }
    }
}

#[cfg(unix)]
async fn next(signal: Option<&mut tokio::signal::unix::Signal>) {
    match signal {
        Some(signal) => {
            signal.recv().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(not(unix))]
struct Signals {
    ctrl_c: Option<tokio::signal::windows::CtrlC>,
}

#[cfg(not(unix))]
impl Signals {
    fn register() -> Self {
        let ctrl_c = match tokio::signal::windows::ctrl_c() {
            Ok(ctrl_c) => Some(ctrl_c),
            Err(e) => {
                warn!("Could not listen for Ctrl-C: {}", e);
                None
            }
        };
        Self { ctrl_c }
    }

    async fn recv(mut self) {
        match self.ctrl_c.as_mut() {
            Some(ctrl_c) => {
                ctrl_c.recv().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_signal_triggers_shutdown() {
        let shutdown = Shutdown::new();
        let (tx, rx) = oneshot::channel::<()>();

        let handle = install_with(
            async move {
                let _ = rx.await;
            },
            shutdown.clone(),
        );

        assert!(!shutdown.is_triggered());
        tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(1), shutdown.triggered())
            .await
            .expect("shutdown was not triggered");
        handle.await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_signal_before_first_poll_is_caught() {
        let shutdown = Shutdown::new();
        let handle = install(shutdown.clone());
        assert!(!shutdown.is_triggered());

        // Delivered before the spawned task has had a chance to run
        let status = std::process::Command::new("kill")
            .arg("-INT")
            .arg(std::process::id().to_string())
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(Duration::from_secs(2), shutdown.triggered())
            .await
            .expect("interrupt was not observed");
        handle.await.unwrap();
    }
}
