//! Per-peer delivery-class state machine.
//!
//! An [`Endpoint`] frames outbound payloads for one remote peer and unwraps
//! inbound datagrams from it, providing the three delivery classes the
//! application rides on: unreliable (fire-and-forget), reliable ordered
//! (acked, retransmitted, delivered in send order) and reliable unordered
//! (acked, retransmitted, delivered as they arrive, duplicates dropped).
//!
//! The endpoint never touches a socket. The owning event loop feeds it
//! received datagrams and ships whatever frames it hands back; this keeps
//! all connection state single-threaded and unit-testable.

use crate::protocol::Channel;
use log::debug;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};

/// Unacked reliable frames are retransmitted this often.
pub const RESEND_INTERVAL: Duration = Duration::from_millis(200);
/// Peers silent for longer than this are considered gone.
pub const SESSION_TIMEOUT: Duration = Duration::from_secs(5);

const KIND_UNRELIABLE: u8 = 0;
const KIND_RELIABLE: u8 = 1;
const KIND_RELIABLE_UNORDERED: u8 = 2;
const KIND_ACK: u8 = 3;

/// Duplicate-suppression history kept behind the highest unordered
/// sequence seen so far.
const UNORDERED_HISTORY: u16 = 1024;

/// Wrapping sequence comparison: true when `a` is more recent than `b`.
pub fn sequence_greater_than(a: u16, b: u16) -> bool {
    ((a > b) && (a - b <= 32768)) || ((a < b) && (b - a > 32768))
}

#[derive(Debug)]
struct PendingFrame {
    frame: Vec<u8>,
    last_sent: Instant,
}

/// What an inbound datagram produced: application payloads ready for
/// decoding, and ack frames that must go back to the peer.
#[derive(Debug, Default)]
pub struct Inbound {
    pub deliveries: Vec<Vec<u8>>,
    pub replies: Vec<Vec<u8>>,
}

#[derive(Debug)]
pub struct Endpoint {
    next_reliable_seq: u16,
    next_unordered_seq: u16,
    pending: HashMap<(u8, u16), PendingFrame>,

    expected_reliable_seq: u16,
    holdback: BTreeMap<u16, Vec<u8>>,

    unordered_seen: HashSet<u16>,
    unordered_highest: u16,

    last_seen: Instant,
}

impl Endpoint {
    pub fn new(now: Instant) -> Self {
        Self {
            next_reliable_seq: 0,
            next_unordered_seq: 0,
            pending: HashMap::new(),
            expected_reliable_seq: 0,
            holdback: BTreeMap::new(),
            unordered_seen: HashSet::new(),
            unordered_highest: 0,
            last_seen: now,
        }
    }

    /// Frames a payload for sending. Reliable frames are remembered until
    /// the peer acks them; the returned bytes must be sent now.
    pub fn enqueue(&mut self, channel: Channel, payload: &[u8], now: Instant) -> Vec<u8> {
        match channel {
            Channel::Unreliable => {
                let mut frame = Vec::with_capacity(payload.len() + 1);
                frame.push(KIND_UNRELIABLE);
                frame.extend_from_slice(payload);
                frame
            }
            Channel::Reliable => {
                let seq = self.next_reliable_seq;
                self.next_reliable_seq = self.next_reliable_seq.wrapping_add(1);
                self.track(KIND_RELIABLE, seq, payload, now)
            }
            Channel::ReliableUnordered => {
                let seq = self.next_unordered_seq;
                self.next_unordered_seq = self.next_unordered_seq.wrapping_add(1);
                self.track(KIND_RELIABLE_UNORDERED, seq, payload, now)
            }
        }
    }

    fn track(&mut self, kind: u8, seq: u16, payload: &[u8], now: Instant) -> Vec<u8> {
        let mut frame = Vec::with_capacity(payload.len() + 3);
        frame.push(kind);
        frame.extend_from_slice(&seq.to_le_bytes());
        frame.extend_from_slice(payload);
        self.pending.insert(
            (kind, seq),
            PendingFrame {
                frame: frame.clone(),
                last_sent: now,
            },
        );
        frame
    }

    /// Unwraps one received datagram. Datagrams shorter than their frame
    /// header, and unknown kind bytes, are ignored; the minimal length
    /// check is the only validation this layer performs.
    pub fn on_datagram(&mut self, data: &[u8], now: Instant) -> Inbound {
        let mut inbound = Inbound::default();
        let kind = match data.first() {
            Some(kind) => *kind,
            None => return inbound,
        };
        self.last_seen = now;

        match kind {
            KIND_UNRELIABLE => {
                inbound.deliveries.push(data[1..].to_vec());
            }
            KIND_RELIABLE => {
                if data.len() < 3 {
                    return inbound;
                }
                let seq = u16::from_le_bytes([data[1], data[2]]);
                inbound.replies.push(ack_frame(KIND_RELIABLE, seq));
                self.receive_ordered(seq, &data[3..], &mut inbound);
            }
            KIND_RELIABLE_UNORDERED => {
                if data.len() < 3 {
                    return inbound;
                }
                let seq = u16::from_le_bytes([data[1], data[2]]);
                inbound.replies.push(ack_frame(KIND_RELIABLE_UNORDERED, seq));
                self.receive_unordered(seq, &data[3..], &mut inbound);
            }
            KIND_ACK => {
                if data.len() < 4 {
                    return inbound;
                }
                let acked_kind = data[1];
                let seq = u16::from_le_bytes([data[2], data[3]]);
                self.pending.remove(&(acked_kind, seq));
            }
            _ => {
                debug!("ignoring frame with unknown kind byte {}", kind);
            }
        }
        inbound
    }

    fn receive_ordered(&mut self, seq: u16, payload: &[u8], inbound: &mut Inbound) {
        if seq == self.expected_reliable_seq {
            inbound.deliveries.push(payload.to_vec());
            self.expected_reliable_seq = self.expected_reliable_seq.wrapping_add(1);
            // Drain anything the gap was holding back
            while let Some(held) = self.holdback.remove(&self.expected_reliable_seq) {
                inbound.deliveries.push(held);
                self.expected_reliable_seq = self.expected_reliable_seq.wrapping_add(1);
            }
        } else if sequence_greater_than(seq, self.expected_reliable_seq) {
            self.holdback.insert(seq, payload.to_vec());
        }
        // Older sequences were already delivered; the ack above is enough.
    }

    fn receive_unordered(&mut self, seq: u16, payload: &[u8], inbound: &mut Inbound) {
        if self.unordered_seen.contains(&seq) {
            return;
        }
        self.unordered_seen.insert(seq);
        if sequence_greater_than(seq, self.unordered_highest) {
            self.unordered_highest = seq;
        }
        let horizon = self.unordered_highest.wrapping_sub(UNORDERED_HISTORY);
        self.unordered_seen
            .retain(|s| !sequence_greater_than(horizon, *s));
        inbound.deliveries.push(payload.to_vec());
    }

    /// Returns reliable frames due for retransmission and stamps them as
    /// sent again. Call once per tick.
    pub fn sweep(&mut self, now: Instant) -> Vec<Vec<u8>> {
        let mut resend = Vec::new();
        for pending in self.pending.values_mut() {
            if now.duration_since(pending.last_sent) >= RESEND_INTERVAL {
                pending.last_sent = now;
                resend.push(pending.frame.clone());
            }
        }
        resend
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }

    pub fn is_idle(&self, now: Instant) -> bool {
        now.duration_since(self.last_seen) > SESSION_TIMEOUT
    }
}

fn ack_frame(kind: u8, seq: u16) -> Vec<u8> {
    let bytes = seq.to_le_bytes();
    vec![KIND_ACK, kind, bytes[0], bytes[1]]
}
