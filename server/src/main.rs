use clap::Parser;
use log::info;
use server::network::{Server, ServerConfig};
use server::relay::DEFAULT_SEND_QUEUE;
use std::time::Duration;

/// Real-time position relay server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Route serving the WebSocket upgrade
    #[arg(long, default_value = "/ws")]
    path: String,

    /// Disconnect clients that stay silent this many seconds
    #[arg(long)]
    idle_timeout_secs: Option<u64>,

    /// Frames a slow client may fall behind by before frames for it are dropped
    #[arg(
        long,
        default_value_t = DEFAULT_SEND_QUEUE,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    send_queue: usize,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            host: args.host,
            port: args.port,
            ws_path: args.path,
            idle_timeout: args.idle_timeout_secs.map(Duration::from_secs),
            send_queue: args.send_queue,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = ServerConfig::from(Args::parse());
    info!(
        "Starting relay on {} (WebSocket route {})",
        config.address(),
        config.ws_path
    );
    if let Some(timeout) = config.idle_timeout {
        info!("Idle clients are dropped after {:?}", timeout);
    }

    let server = Server::bind(&config).await?;
    server
        .run_until(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl+C, shutting down");
            }
        })
        .await?;

    Ok(())
}
