use clap::Parser;
use demos::duel::{DuelLobby, DuelMessage, DUEL_PORT};
use log::{info, warn};
use tokio::net::UdpSocket;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = DUEL_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let socket = UdpSocket::bind(format!("{}:{}", args.host, args.port)).await?;
    info!("Math-duel server listening on {}", socket.local_addr()?);

    // One loop owns the lobby; no other task ever touches it
    let mut lobby = DuelLobby::new();
    let mut buffer = [0u8; 2048];

    loop {
        let (len, addr) = match socket.recv_from(&mut buffer).await {
            Ok(received) => received,
            Err(e) => {
                warn!("Error receiving datagram: {}", e);
                continue;
            }
        };

        let message: DuelMessage = match bincode::deserialize(&buffer[..len]) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping malformed datagram from {}: {}", addr, e);
                continue;
            }
        };

        for (to, reply) in lobby.handle(addr, message) {
            match bincode::serialize(&reply) {
                Ok(bytes) => {
                    if let Err(e) = socket.send_to(&bytes, to).await {
                        warn!("Failed to send to {}: {}", to, e);
                    }
                }
                Err(e) => warn!("Failed to serialize reply: {}", e),
            }
        }
    }
}
