//! Courier RPC binary - serves or calls the demo SHA-256 service.

use anyhow::Result;
use clap::{Parser, Subcommand};
use courier_core::{ClientConfig, RpcDefaults, ServerConfig};
use courier_rpc::demo::{self, ShaRequest, ShaResponse};
use courier_rpc::{RpcClient, RpcServer};
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "courier-rpc")]
#[command(about = "Courier RPC server and client")]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the demo sha.svc service
    Serve {
        /// Host to bind to
        #[arg(long, default_value = RpcDefaults::SERVER_HOST)]
        host: String,

        /// Port to listen on (0 = auto-assign)
        #[arg(short, long, default_value_t = RpcDefaults::PORT)]
        port: u16,

        /// Maximum concurrent requests
        #[arg(long, default_value_t = RpcDefaults::WORKER_POOL_SIZE)]
        workers: usize,

        /// Per-request timeout in milliseconds
        #[arg(long, default_value_t = 5000)]
        request_timeout_ms: u64,
    },

    /// Hash a string with a running sha.svc
    Sha {
        /// Data to hash
        #[arg(long)]
        data: String,

        /// Server host
        #[arg(long, default_value = RpcDefaults::CLIENT_HOST)]
        host: String,

        /// Server port
        #[arg(short, long, default_value_t = RpcDefaults::PORT)]
        port: u16,

        /// Call timeout in seconds
        #[arg(long, default_value_t = 5)]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    match args.command {
        Command::Serve {
            host,
            port,
            workers,
            request_timeout_ms,
        } => {
            let config = ServerConfig::default()
                .with_host(host)
                .with_port(port)
                .with_worker_pool_size(workers)
                .with_request_timeout(Duration::from_millis(request_timeout_ms));

            let server = RpcServer::new(config);
            demo::register(server.registry(), RpcDefaults::VERSION);

            let addr = server.start().await?;

            // Print port for scripts that start the server with port 0
            println!("RPC_PORT={}", addr.port());

            tokio::signal::ctrl_c().await?;
            info!("Shutdown signal received, exiting");
            server.shutdown();
        }
        Command::Sha {
            data,
            host,
            port,
            timeout_secs,
        } => {
            let client = RpcClient::new(
                ClientConfig::default()
                    .with_host(host)
                    .with_port(port)
                    .with_timeout(Duration::from_secs(timeout_secs)),
            )?;
            let response: ShaResponse = client
                .invoke(&demo::sha_target(), &ShaRequest { data })
                .await?;
            println!("{}", response.sha);
        }
    }

    Ok(())
}
