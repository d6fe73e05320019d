//! Socket plumbing and session tracking.
//!
//! Two background tasks own the socket I/O: a receiver that forwards raw
//! datagrams to the simulation loop, and a sender that drains the outbound
//! frame queue. All connection state (one reliability [`Endpoint`] per
//! remote address) lives in [`Sessions`], owned single-threadedly by the
//! loop; events travel over channels as plain values, never through
//! handler callbacks.

use log::{error, info};
use shared::channel::Endpoint;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

pub type SessionId = u32;

/// Events from the network tasks to the simulation loop.
#[derive(Debug)]
pub enum NetEvent {
    Datagram { data: Vec<u8>, addr: SocketAddr },
}

/// A framed datagram queued for sending.
#[derive(Debug)]
pub struct OutboundFrame {
    pub addr: SocketAddr,
    pub frame: Vec<u8>,
}

#[derive(Debug)]
pub struct Peer {
    pub addr: SocketAddr,
    pub endpoint: Endpoint,
}

/// Connected viewer sessions, keyed both ways: by address for inbound
/// dispatch and by session id for replication.
#[derive(Debug)]
pub struct Sessions {
    by_addr: HashMap<SocketAddr, SessionId>,
    peers: HashMap<SessionId, Peer>,
    next_id: SessionId,
}

impl Sessions {
    pub fn new() -> Self {
        Self {
            by_addr: HashMap::new(),
            peers: HashMap::new(),
            next_id: 1,
        }
    }

    /// Looks up the session for an address, creating one for a first-time
    /// sender.
    pub fn session_for(&mut self, addr: SocketAddr, now: Instant) -> SessionId {
        if let Some(id) = self.by_addr.get(&addr) {
            return *id;
        }
        let id = self.next_id;
        self.next_id += 1;
        info!("Session {} connected from {}", id, addr);
        self.by_addr.insert(addr, id);
        self.peers.insert(
            id,
            Peer {
                addr,
                endpoint: Endpoint::new(now),
            },
        );
        id
    }

    pub fn peer_mut(&mut self, session: SessionId) -> Option<&mut Peer> {
        self.peers.get_mut(&session)
    }

    pub fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.peers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Drops sessions whose endpoints have gone idle, returning their ids.
    pub fn check_timeouts(&mut self, now: Instant) -> Vec<SessionId> {
        let timed_out: Vec<SessionId> = self
            .peers
            .iter()
            .filter(|(_, peer)| peer.endpoint.is_idle(now))
            .map(|(id, _)| *id)
            .collect();

        for id in &timed_out {
            if let Some(peer) = self.peers.remove(id) {
                info!("Session {} timed out ({})", id, peer.addr);
                self.by_addr.remove(&peer.addr);
            }
        }
        timed_out
    }
}

/// Spawns the task that continuously listens for incoming datagrams.
pub fn spawn_receiver(socket: Arc<UdpSocket>, events: mpsc::UnboundedSender<NetEvent>) {
    tokio::spawn(async move {
        let mut buffer = [0u8; 2048];
        loop {
            match socket.recv_from(&mut buffer).await {
                Ok((len, addr)) => {
                    let event = NetEvent::Datagram {
                        data: buffer[..len].to_vec(),
                        addr,
                    };
                    if events.send(event).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Error receiving datagram: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    });
}

/// Spawns the task that drains the outbound frame queue onto the socket.
pub fn spawn_sender(socket: Arc<UdpSocket>, mut frames: mpsc::UnboundedReceiver<OutboundFrame>) {
    tokio::spawn(async move {
        while let Some(out) = frames.recv().await {
            if let Err(e) = socket.send_to(&out.frame, out.addr).await {
                error!("Failed to send frame to {}: {}", out.addr, e);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::channel::SESSION_TIMEOUT;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{}", port).parse().unwrap()
    }

    #[test]
    fn test_sessions_assign_sequential_ids() {
        let now = Instant::now();
        let mut sessions = Sessions::new();

        let first = sessions.session_for(addr(4000), now);
        let second = sessions.session_for(addr(4001), now);
        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn test_same_address_reuses_session() {
        let now = Instant::now();
        let mut sessions = Sessions::new();

        let first = sessions.session_for(addr(4000), now);
        let again = sessions.session_for(addr(4000), now);
        assert_eq!(first, again);
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn test_idle_sessions_time_out() {
        let now = Instant::now();
        let mut sessions = Sessions::new();
        let id = sessions.session_for(addr(4000), now);

        assert!(sessions.check_timeouts(now).is_empty());

        let later = now + SESSION_TIMEOUT + Duration::from_millis(1);
        let dropped = sessions.check_timeouts(later);
        assert_eq!(dropped, vec![id]);
        assert!(sessions.is_empty());

        // The address gets a fresh session afterwards
        let fresh = sessions.session_for(addr(4000), later);
        assert_ne!(fresh, id);
    }

    #[test]
    fn test_ids_are_sorted() {
        let now = Instant::now();
        let mut sessions = Sessions::new();
        for port in [4002, 4000, 4001] {
            sessions.session_for(addr(port), now);
        }
        assert_eq!(sessions.ids(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_receiver_forwards_datagrams() {
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let local = socket.local_addr().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        spawn_receiver(Arc::clone(&socket), tx);

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(b"ping", local).await.unwrap();

        let event = rx.recv().await.unwrap();
        match event {
            NetEvent::Datagram { data, addr } => {
                assert_eq!(data, b"ping");
                assert_eq!(addr, sender.local_addr().unwrap());
            }
        }
    }

    #[tokio::test]
    async fn test_sender_ships_frames() {
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        spawn_sender(Arc::clone(&socket), rx);

        tx.send(OutboundFrame {
            addr: receiver.local_addr().unwrap(),
            frame: b"pong".to_vec(),
        })
        .unwrap();

        let mut buffer = [0u8; 64];
        let (len, _) = receiver.recv_from(&mut buffer).await.unwrap();
        assert_eq!(&buffer[..len], b"pong");
    }
}
