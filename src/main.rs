//! tcpcat - dial a host/port, optionally relay what it sends to stdout

use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use tcpcat::app::{interrupt, Client};
use tcpcat::{Config, Error, Result, SessionReport, Shutdown};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "tcpcat", version, about = "Read-only TCP connectivity probe")]
struct Args {
    /// Path to a JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Transport protocol
    #[arg(long)]
    proto: Option<String>,

    /// Target host or IP address
    #[arg(long)]
    address: Option<String>,

    /// Target port
    #[arg(long)]
    port: Option<u16>,

    /// Relay bytes sent by the peer to stdout
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    wait: Option<bool>,

    /// Also forward stdin to the peer (requires --wait)
    #[arg(long)]
    stdin: bool,

    /// Dial timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Indicator interval in milliseconds, 0 to disable
    #[arg(long)]
    indicator_ms: Option<u64>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    /// Config file (or defaults) with command line overrides applied
    fn effective_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        let client = &mut config.client;
        if let Some(proto) = &self.proto {
            client.proto = proto.clone();
        }
        if let Some(address) = &self.address {
            client.address = address.clone();
        }
        if let Some(port) = self.port {
            client.port = port;
        }
        if let Some(wait) = self.wait {
            client.wait = wait;
        }
        if self.stdin {
            client.stdin = true;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            client.timeout_ms = timeout_ms;
        }
        if let Some(indicator_ms) = self.indicator_ms {
            client.indicator_ms = indicator_ms;
        }

        Ok(config)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match args.effective_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.print_config {
        return match config.to_json() {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}", e);
                ExitCode::FAILURE
            }
        };
    }

    if let Err(e) = tcpcat::logging::init(&config.log) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    ExitCode::from(block_then_detach(rt, run(config)))
}

/// Drive `future` to completion, then drop the runtime without joining
/// its blocking pool.
///
/// A pending stdin read occupies a blocking thread until the terminal sends
/// EOF, so a joining drop would hang after the session is already over.
fn block_then_detach<F: Future>(rt: tokio::runtime::Runtime, future: F) -> F::Output {
    let output = rt.block_on(future);
    rt.shutdown_background();
    output
}

async fn run(config: Config) -> u8 {
    let options = match config.client.options() {
        Ok(options) => options,
        Err(e) => {
            error!("{}", e);
            return Outcome::Failed(e).exit_code();
        }
    };

    let shutdown = Shutdown::new();
    let _interrupt = interrupt::install(shutdown.clone());

    let client = Client::new(options);
    let outcome = Outcome::from_session(client.run(&shutdown).await);
    outcome.report();
    outcome.exit_code()
}

/// How a finished session maps onto the process exit
#[derive(Debug)]
enum Outcome {
    /// Connected and closed; carries the relayed byte count in wait mode
    Done(Option<u64>),
    /// Torn down by Ctrl-C or SIGTERM
    Interrupted,
    Failed(Error),
}

impl Outcome {
    fn from_session(result: Result<SessionReport>) -> Self {
        match result {
            Ok(report) => Outcome::Done(report.relayed),
            Err(Error::Cancelled) => Outcome::Interrupted,
            Err(e) => Outcome::Failed(e),
        }
    }

    fn exit_code(&self) -> u8 {
        match self {
            Outcome::Done(_) | Outcome::Interrupted => 0,
            Outcome::Failed(_) => 1,
        }
    }

    /// Line for stdout after the relayed bytes, if any
    fn summary(&self) -> Option<String> {
        match self {
            Outcome::Done(Some(bytes)) => Some(format!("\rwrote {}", bytes)),
            _ => None,
        }
    }

    fn report(&self) {
        if let Some(line) = self.summary() {
            println!("{}", line);
        }
        match self {
            Outcome::Interrupted => info!("Interrupted, connection released"),
            Outcome::Failed(e) => error!("{}", e),
            Outcome::Done(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::mpsc;
    use std::time::Duration;

    use tcpcat::ConnectionTarget;

    fn report(relayed: Option<u64>) -> SessionReport {
        SessionReport {
            target: ConnectionTarget::tcp("127.0.0.1", 22).unwrap(),
            peer: None,
            relayed,
        }
    }

    #[test]
    fn test_success_exits_zero() {
        let outcome = Outcome::from_session(Ok(report(None)));
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(outcome.summary(), None);

        let outcome = Outcome::from_session(Ok(report(Some(17))));
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(outcome.summary().as_deref(), Some("\rwrote 17"));
    }

    #[test]
    fn test_interrupt_exits_zero() {
        let outcome = Outcome::from_session(Err(Error::Cancelled));
        assert!(matches!(outcome, Outcome::Interrupted));
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(outcome.summary(), None);
    }

    #[test]
    fn test_dial_and_relay_failures_exit_one() {
        let refused = Outcome::from_session(Err(Error::ConnectionRefused("127.0.0.1:1".into())));
        assert_eq!(refused.exit_code(), 1);

        let timeout = Outcome::from_session(Err(Error::Timeout {
            addr: "10.255.255.1:22".into(),
            timeout: Duration::from_millis(50),
        }));
        assert_eq!(timeout.exit_code(), 1);

        let reset = Outcome::from_session(Err(Error::Io(io::Error::from(
            io::ErrorKind::ConnectionReset,
        ))));
        assert_eq!(reset.exit_code(), 1);
        assert_eq!(reset.summary(), None);
    }

    #[test]
    fn test_pending_blocking_read_does_not_hold_exit() {
        // Stands in for a stdin read that never sees EOF
        let (_keep_open, pending) = mpsc::channel::<()>();
        let (done_tx, done_rx) = mpsc::channel();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let code = block_then_detach(rt, async move {
                tokio::task::spawn_blocking(move || {
                    let _ = pending.recv();
                });
                tokio::task::yield_now().await;
                0u8
            });
            let _ = done_tx.send(code);
        });

        let code = done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("runtime teardown waited on the blocking read");
        assert_eq!(code, 0);
    }
}
