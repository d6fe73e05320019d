//! Client-side connection: join handshake, inbound dispatch and the frame
//! loop tying input, mirror and rendering together.

use crate::input;
use crate::mirror::Mirror;
use crate::rendering::Renderer;
use log::{info, warn};
use shared::channel::Endpoint;
use shared::protocol::Message;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::interval;

const INPUT_INTERVAL: Duration = Duration::from_millis(16);
const RENDER_INTERVAL: Duration = Duration::from_millis(16);
const SWEEP_INTERVAL: Duration = Duration::from_millis(50);

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    endpoint: Endpoint,
    mirror: Mirror,
    renderer: Renderer,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        width: usize,
        height: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;

        Ok(Client {
            socket,
            server_addr,
            endpoint: Endpoint::new(Instant::now()),
            mirror: Mirror::new(),
            renderer: Renderer::new(width, height),
        })
    }

    pub fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    /// Unwraps one datagram into the mirror and returns the ack frames to
    /// ship back.
    fn process_datagram(&mut self, data: &[u8], now: Instant) -> Vec<Vec<u8>> {
        let inbound = self.endpoint.on_datagram(data, now);
        for payload in inbound.deliveries {
            match Message::decode(&payload) {
                Ok(message) => self.mirror.apply(message),
                Err(e) => warn!("Dropping malformed packet: {}", e),
            }
        }
        inbound.replies
    }

    async fn send_message(&mut self, message: &Message) -> std::io::Result<()> {
        let frame = self
            .endpoint
            .enqueue(message.channel(), &message.encode(), Instant::now());
        self.socket.send_to(&frame, self.server_addr).await?;
        Ok(())
    }

    async fn send_raw(&self, frame: &[u8]) {
        if let Err(e) = self.socket.send_to(frame, self.server_addr).await {
            warn!("Failed to send frame: {}", e);
        }
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Joining arena at {}", self.server_addr);
        self.send_message(&Message::Join).await?;

        let mut input_ticker = interval(INPUT_INTERVAL);
        let mut render_ticker = interval(RENDER_INTERVAL);
        let mut sweep_ticker = interval(SWEEP_INTERVAL);
        let mut last_input = Instant::now();
        let mut buffer = [0u8; 2048];

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, from)) => {
                            if from != self.server_addr {
                                continue;
                            }
                            let data = buffer[..len].to_vec();
                            let replies = self.process_datagram(&data, Instant::now());
                            for reply in replies {
                                self.send_raw(&reply).await;
                            }
                        }
                        Err(e) => warn!("Error receiving packet: {}", e),
                    }
                },

                _ = input_ticker.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_input).as_secs_f32();
                    last_input = now;

                    let movement = input::sample();
                    if let Some(message) =
                        self.mirror.integrate_input(movement.dx, movement.dy, dt)
                    {
                        if let Err(e) = self.send_message(&message).await {
                            warn!("Error sending movement: {}", e);
                        }
                    }
                },

                _ = sweep_ticker.tick() => {
                    let frames = self.endpoint.sweep(Instant::now());
                    for frame in frames {
                        self.send_raw(&frame).await;
                    }
                },

                _ = render_ticker.tick() => {
                    self.renderer.render(&self.mirror);
                },
            }
        }
    }
}
