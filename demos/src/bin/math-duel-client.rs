use clap::Parser;
use demos::duel::{DuelMessage, DUEL_PORT};
use log::warn;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value_t = format!("127.0.0.1:{}", DUEL_PORT))]
    server: String,

    /// Display name in the lobby
    #[arg(short, long, default_value = "anonymous")]
    name: String,
}

fn display_help() {
    println!("-----------------Client-INFO-------------------");
    println!("/c [msg]  - Send a message to all connected clients");
    println!("/duel     - Challenge someone to a math duel");
    println!("/a [n]    - Answer the current duel problem");
    println!("Any other message is sent to the server only");
    println!("-----------------------------------------------");
}

fn parse_command(line: &str) -> Option<DuelMessage> {
    if let Some(text) = line.strip_prefix("/c ") {
        return Some(DuelMessage::Broadcast {
            text: text.to_string(),
        });
    }
    if line == "/duel" {
        return Some(DuelMessage::RequestDuel);
    }
    if let Some(answer) = line.strip_prefix("/a ") {
        return match answer.trim().parse() {
            Ok(value) => Some(DuelMessage::Answer { value }),
            Err(_) => {
                println!("Answers must be integers");
                None
            }
        };
    }
    Some(DuelMessage::Chat {
        text: line.to_string(),
    })
}

fn display(message: DuelMessage) {
    match message {
        DuelMessage::Info { text } => println!("SERVER: {}", text),
        DuelMessage::ChatRelay { from, text } => println!("CHAT ({}): {}", from, text),
        DuelMessage::Problem { a, b, op } => {
            println!("DUEL! Solve: {} {} {}  (answer with /a <n>)", a, op.symbol(), b)
        }
        DuelMessage::DuelResult { winner } => println!("Duel over, {} wins!", winner),
        other => warn!("Unexpected client-bound message {:?}", other),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect(&args.server).await?;
    println!("Client is using port {}", socket.local_addr()?.port());
    display_help();

    let hello = bincode::serialize(&DuelMessage::Hello {
        name: args.name.clone(),
    })?;
    socket.send(&hello).await?;

    // One loop multiplexes stdin and the socket; nothing is shared
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut buffer = [0u8; 2048];

    loop {
        tokio::select! {
            received = socket.recv(&mut buffer) => {
                match received {
                    Ok(len) => match bincode::deserialize(&buffer[..len]) {
                        Ok(message) => display(message),
                        Err(e) => warn!("Dropping malformed datagram: {}", e),
                    },
                    Err(e) => warn!("Error receiving datagram: {}", e),
                }
            },

            line = lines.next_line() => {
                let line = match line? {
                    Some(line) => line,
                    None => break, // stdin closed
                };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed == "/help" || trimmed == "/h" || trimmed == "/?" {
                    display_help();
                    continue;
                }
                if let Some(message) = parse_command(trimmed) {
                    socket.send(&bincode::serialize(&message)?).await?;
                }
            },
        }
    }

    Ok(())
}
