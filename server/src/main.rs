use clap::Parser;
use log::info;
use server::game::Server;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = shared::SERVER_PORT)]
    port: u16,

    /// Simulation tick interval in milliseconds
    #[arg(short, long, default_value = "16")]
    tick_ms: u64,

    /// Match duration in seconds
    #[arg(short, long, default_value_t = shared::MATCH_DURATION_SECS)]
    duration: i32,

    /// Autonomous entities spawned on the first join
    #[arg(short, long, default_value_t = shared::AGENT_BATCH_SIZE)]
    agents: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    info!("Starting arena server on {}", addr);
    let mut server = Server::new(
        &addr,
        Duration::from_millis(args.tick_ms),
        args.duration,
        args.agents,
    )
    .await?;

    server.run().await
}
