//! The authoritative simulation loop.
//!
//! One `SimulationState` value owns the registry, clock, control index and
//! replication queue; the loop applies inbound messages, steps the
//! simulation and flushes the outbound queue, in that order, so message
//! application never interleaves with collision resolution inside a tick.

use log::{debug, info, warn};
use shared::protocol::Message;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::interval;

use crate::agents::drive_agents;
use crate::broadcast::Replicator;
use crate::clock::{ClockEvent, GameClock, Phase};
use crate::devour;
use crate::network::{
    spawn_receiver, spawn_sender, NetEvent, OutboundFrame, SessionId, Sessions,
};
use crate::registry::{ControlIndex, EntityRegistry};

/// Everything the tick loop mutates, grouped so components receive it by
/// reference instead of reaching for globals.
#[derive(Debug)]
pub struct SimulationState {
    pub registry: EntityRegistry,
    pub control: ControlIndex,
    pub clock: GameClock,
    pub replicator: Replicator,
    pub agent_batch: usize,
}

impl SimulationState {
    pub fn new(match_duration_secs: i32, agent_batch: usize) -> Self {
        Self {
            registry: EntityRegistry::new(),
            control: ControlIndex::new(),
            clock: GameClock::new(match_duration_secs),
            replicator: Replicator::new(),
            agent_batch,
        }
    }

    /// Dispatches one decoded application message from a session.
    pub fn apply_message(&mut self, message: Message, session: SessionId, sessions: &[SessionId]) {
        match message {
            Message::Join => self.on_join(session, sessions),
            Message::PlayerMove { id, x, y } => {
                // Unknown ids make this a no-op by design
                self.registry.apply_snapshot(id, x, y, None);
            }
            other => {
                warn!(
                    "Unexpected {:?} from session {}",
                    other.message_type(),
                    session
                );
            }
        }
    }

    fn on_join(&mut self, session: SessionId, sessions: &[SessionId]) {
        if self.control.entity_of(session).is_some() {
            debug!("Session {} re-sent join, ignoring", session);
            return;
        }

        // The first join brings the arena to life
        if self.clock.phase() == Phase::Warmup {
            info!("First join: spawning {} agents", self.agent_batch);
            for _ in 0..self.agent_batch {
                self.registry.create_agent();
            }
            self.clock.start();
        }

        // Catalog of everything that already exists, then the new entity
        // to everyone (the joiner included), then the control handshake.
        for entity in self.registry.entities() {
            self.replicator.unicast(
                session,
                Message::EntityJoined {
                    id: entity.id,
                    x: entity.x,
                    y: entity.y,
                    color: entity.color,
                },
            );
        }

        let id = self.registry.create();
        self.control.bind(id, session);

        if let Some(entity) = self.registry.get(id) {
            self.replicator.broadcast(
                sessions,
                Message::EntityJoined {
                    id,
                    x: entity.x,
                    y: entity.y,
                    color: entity.color,
                },
            );
        }
        self.replicator.unicast(session, Message::Welcome { id });
        info!("Session {} controls entity {}", session, id);
    }

    /// One simulation step: agents, devour resolution, clock, snapshots.
    pub fn step(&mut self, dt: Duration, sessions: &[SessionId]) {
        drive_agents(self.registry.entities_mut(), dt.as_secs_f32());

        if let Some(outcome) = devour::resolve(self.registry.entities_mut()) {
            self.replicator.broadcast(
                sessions,
                Message::ScoreUpdate {
                    id: outcome.devourer,
                    score: outcome.devourer_score,
                },
            );
            self.replicator.broadcast(
                sessions,
                Message::Devoured {
                    devoured: outcome.devoured,
                    devourer: outcome.devourer,
                    new_size: outcome.devourer_size,
                    new_x: outcome.reset_x,
                    new_y: outcome.reset_y,
                },
            );
        }

        for event in self.clock.advance(dt, self.registry.entities()) {
            match event {
                ClockEvent::TimeChanged { seconds_remaining } => {
                    self.replicator
                        .broadcast(sessions, Message::GameTime { seconds_remaining });
                }
                ClockEvent::GameOver {
                    winner,
                    winner_score,
                } => {
                    self.replicator.broadcast(
                        sessions,
                        Message::GameOver {
                            winner,
                            winner_score,
                        },
                    );
                }
            }
        }

        self.replicator
            .broadcast_snapshots(sessions, self.registry.entities(), &self.control);
    }

    /// Unbinds a departed session and tells the remaining viewers. The
    /// entity itself stays in the registry; entities are never destroyed.
    pub fn on_session_dropped(&mut self, session: SessionId, sessions: &[SessionId]) {
        if let Some(id) = self.control.unbind_session(session) {
            info!("Entity {} orphaned by session {}", id, session);
            self.replicator
                .broadcast(sessions, Message::EntityLeft { id });
        }
    }
}

/// Owns the socket tasks and drives [`SimulationState`].
pub struct Server {
    state: SimulationState,
    sessions: Sessions,
    tick_interval: Duration,

    event_tx: mpsc::UnboundedSender<NetEvent>,
    event_rx: mpsc::UnboundedReceiver<NetEvent>,
    frame_tx: mpsc::UnboundedSender<OutboundFrame>,
    frame_rx: mpsc::UnboundedReceiver<OutboundFrame>,
    socket: Arc<UdpSocket>,
}

impl Server {
    pub async fn new(
        addr: &str,
        tick_interval: Duration,
        match_duration_secs: i32,
        agent_batch: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();

        Ok(Server {
            state: SimulationState::new(match_duration_secs, agent_batch),
            sessions: Sessions::new(),
            tick_interval,
            event_tx,
            event_rx,
            frame_tx,
            frame_rx,
            socket,
        })
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        spawn_receiver(Arc::clone(&self.socket), self.event_tx.clone());
        let frame_rx = std::mem::replace(&mut self.frame_rx, mpsc::unbounded_channel().1);
        spawn_sender(Arc::clone(&self.socket), frame_rx);

        let mut ticker = interval(self.tick_interval);
        let mut last_tick = Instant::now();
        info!("Server started");

        loop {
            tokio::select! {
                event = self.event_rx.recv() => {
                    match event {
                        Some(NetEvent::Datagram { data, addr }) => {
                            self.handle_datagram(&data, addr, Instant::now());
                        }
                        None => {
                            info!("Network tasks gone, shutting down");
                            break;
                        }
                    }
                },
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick);
                    last_tick = now;
                    self.tick(dt, now);
                },
            }
        }

        Ok(())
    }

    fn handle_datagram(&mut self, data: &[u8], addr: SocketAddr, now: Instant) {
        let session = self.sessions.session_for(addr, now);
        let session_ids = self.sessions.ids();

        let peer = match self.sessions.peer_mut(session) {
            Some(peer) => peer,
            None => return,
        };
        let inbound = peer.endpoint.on_datagram(data, now);

        for reply in inbound.replies {
            let _ = self.frame_tx.send(OutboundFrame { addr, frame: reply });
        }

        for payload in inbound.deliveries {
            match Message::decode(&payload) {
                Ok(message) => {
                    self.state.apply_message(message, session, &session_ids);
                }
                Err(e) => {
                    warn!("Dropping malformed packet from {}: {}", addr, e);
                }
            }
        }
    }

    fn tick(&mut self, dt: Duration, now: Instant) {
        for session in self.sessions.check_timeouts(now) {
            let remaining = self.sessions.ids();
            self.state.on_session_dropped(session, &remaining);
        }

        let session_ids = self.sessions.ids();
        self.state.step(dt, &session_ids);
        self.flush_outbound(now);
    }

    /// Frames queued messages through each session's endpoint and hands
    /// them to the sender task, then retransmits anything overdue.
    fn flush_outbound(&mut self, now: Instant) {
        for (session, message) in self.state.replicator.drain() {
            let payload = message.encode();
            let channel = message.channel();
            if let Some(peer) = self.sessions.peer_mut(session) {
                let frame = peer.endpoint.enqueue(channel, &payload, now);
                let _ = self.frame_tx.send(OutboundFrame {
                    addr: peer.addr,
                    frame,
                });
            }
        }

        for session in self.sessions.ids() {
            if let Some(peer) = self.sessions.peer_mut(session) {
                for frame in peer.endpoint.sweep(now) {
                    let _ = self.frame_tx.send(OutboundFrame {
                        addr: peer.addr,
                        frame,
                    });
                }
            }
        }
    }
}
