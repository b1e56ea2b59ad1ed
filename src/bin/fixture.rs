//! tcpcat-fixture - line-echo server for trying the client by hand

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use tcpcat::app::interrupt;
use tcpcat::config::LogConfig;
use tcpcat::{Server, TcpServer};

#[derive(Parser, Debug)]
#[command(name = "tcpcat-fixture", version, about = "Line-echo fixture server for tcpcat")]
struct Args {
    /// Transport protocol (only tcp variants are served)
    #[arg(long, default_value = "tcp")]
    proto: String,

    /// Listen address, `:port` for all interfaces
    #[arg(long, default_value = ":8080")]
    listen: String,

    /// Hold the first connection open without serving it
    #[arg(long)]
    hold_first: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let log = LogConfig {
        level: args.log_level.clone(),
    };
    if let Err(e) = tcpcat::logging::init(&log) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    let protocol = match tcpcat::transport::Protocol::parse(&args.proto.to_lowercase()) {
        Ok(protocol) => protocol,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let server = TcpServer::with_protocol(args.listen, protocol)
        .hold_first_connection(args.hold_first);

    let stop = interrupt::wait_for_termination();
    tokio::pin!(stop);

    let result = tokio::select! {
        result = server.run() => result,
        _ = &mut stop => {
            info!("Shutting down...");
            server.close().await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
