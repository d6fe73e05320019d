//! Lobby state machine for the chat / math-duel sample.

use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;

pub const DUEL_PORT: u16 = 2025;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
}

impl Op {
    pub fn symbol(&self) -> char {
        match self {
            Op::Add => '+',
            Op::Sub => '-',
            Op::Mul => '*',
        }
    }

    pub fn apply(&self, a: i32, b: i32) -> i32 {
        match self {
            Op::Add => a + b,
            Op::Sub => a - b,
            Op::Mul => a * b,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum DuelMessage {
    // Client -> Server
    Hello { name: String },
    Chat { text: String },
    Broadcast { text: String },
    RequestDuel,
    Answer { value: i32 },

    // Server -> Client
    Info { text: String },
    ChatRelay { from: String, text: String },
    Problem { a: i32, b: i32, op: Op },
    DuelResult { winner: String },
}

/// A registered participant.
#[derive(Debug, Clone)]
pub struct ClientRecord {
    pub name: String,
}

/// One running or finished duel between two participants.
#[derive(Debug)]
pub struct MathDuel {
    pub first: SocketAddr,
    pub second: SocketAddr,
    pub a: i32,
    pub b: i32,
    pub op: Op,
    pub answer: i32,
    pub active: bool,
    pub solved: bool,
}

/// All sample-server state: the client roster, the FIFO queue of clients
/// waiting for an opponent, and past/present duels.
#[derive(Debug, Default)]
pub struct DuelLobby {
    clients: HashMap<SocketAddr, ClientRecord>,
    waiting: VecDeque<SocketAddr>,
    duels: Vec<MathDuel>,
}

impl DuelLobby {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    fn name_of(&self, addr: SocketAddr) -> String {
        self.clients
            .get(&addr)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| addr.to_string())
    }

    /// Applies one message and returns the replies to send, each with its
    /// destination. Broadcasts are expanded here so the caller only ever
    /// sends unicast datagrams.
    pub fn handle(&mut self, addr: SocketAddr, message: DuelMessage) -> Vec<(SocketAddr, DuelMessage)> {
        match message {
            DuelMessage::Hello { name } => self.on_hello(addr, name),
            DuelMessage::Chat { text } => self.on_chat(addr, text),
            DuelMessage::Broadcast { text } => self.on_broadcast(addr, text),
            DuelMessage::RequestDuel => self.on_request_duel(addr),
            DuelMessage::Answer { value } => self.on_answer(addr, value),
            // Server-bound only; a client echoing server messages is noise
            _ => Vec::new(),
        }
    }

    fn on_hello(&mut self, addr: SocketAddr, name: String) -> Vec<(SocketAddr, DuelMessage)> {
        info!("{} joined as {}", addr, name);
        let mut replies = vec![(
            addr,
            DuelMessage::Info {
                text: format!("Welcome, {}!", name),
            },
        )];
        for other in self.clients.keys() {
            replies.push((
                *other,
                DuelMessage::Info {
                    text: format!("{} joined the lobby", name),
                },
            ));
        }
        self.clients.insert(addr, ClientRecord { name });
        replies
    }

    fn on_chat(&mut self, addr: SocketAddr, text: String) -> Vec<(SocketAddr, DuelMessage)> {
        info!("{}: {}", self.name_of(addr), text);
        vec![(
            addr,
            DuelMessage::Info {
                text: format!("echo: {}", text),
            },
        )]
    }

    fn on_broadcast(&mut self, addr: SocketAddr, text: String) -> Vec<(SocketAddr, DuelMessage)> {
        let from = self.name_of(addr);
        self.clients
            .keys()
            .filter(|other| **other != addr)
            .map(|other| {
                (
                    *other,
                    DuelMessage::ChatRelay {
                        from: from.clone(),
                        text: text.clone(),
                    },
                )
            })
            .collect()
    }

    fn on_request_duel(&mut self, addr: SocketAddr) -> Vec<(SocketAddr, DuelMessage)> {
        if self.waiting.contains(&addr) {
            return vec![(
                addr,
                DuelMessage::Info {
                    text: "Already waiting for an opponent".to_string(),
                },
            )];
        }
        self.waiting.push_back(addr);

        if self.waiting.len() < 2 {
            return vec![(
                addr,
                DuelMessage::Info {
                    text: "Waiting for an opponent...".to_string(),
                },
            )];
        }

        let (first, second) = match (self.waiting.pop_front(), self.waiting.pop_front()) {
            (Some(first), Some(second)) => (first, second),
            _ => return Vec::new(),
        };

        let mut rng = rand::thread_rng();
        let a = rng.gen_range(1..=20);
        let b = rng.gen_range(1..=20);
        let op = match rng.gen_range(0..3) {
            0 => Op::Add,
            1 => Op::Sub,
            _ => Op::Mul,
        };
        let answer = op.apply(a, b);

        info!(
            "Duel: {} vs {} ({} {} {})",
            self.name_of(first),
            self.name_of(second),
            a,
            op.symbol(),
            b
        );
        self.duels.push(MathDuel {
            first,
            second,
            a,
            b,
            op,
            answer,
            active: true,
            solved: false,
        });

        let problem = DuelMessage::Problem { a, b, op };
        vec![(first, problem.clone()), (second, problem)]
    }

    fn on_answer(&mut self, addr: SocketAddr, value: i32) -> Vec<(SocketAddr, DuelMessage)> {
        let duel = self
            .duels
            .iter_mut()
            .find(|d| d.active && (d.first == addr || d.second == addr));
        let duel = match duel {
            Some(duel) => duel,
            None => {
                return vec![(
                    addr,
                    DuelMessage::Info {
                        text: "No duel in progress".to_string(),
                    },
                )]
            }
        };

        if value != duel.answer {
            return vec![(
                addr,
                DuelMessage::Info {
                    text: "Wrong answer, try again".to_string(),
                },
            )];
        }

        // First correct answer wins
        duel.active = false;
        duel.solved = true;
        let (first, second) = (duel.first, duel.second);
        let winner = self.name_of(addr);
        info!("Duel won by {}", winner);

        let result = DuelMessage::DuelResult { winner };
        vec![(first, result.clone()), (second, result)]
    }
}
