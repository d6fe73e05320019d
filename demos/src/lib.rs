//! Chat and math-duel sample protocol.
//!
//! A deliberately simple companion to the arena: the same broadcast vs
//! unicast replication idea, over a bincode-serialized message enum and a
//! plain UDP socket. All state lives in a single [`duel::DuelLobby`] value
//! owned by the server's event loop; the client multiplexes stdin and the
//! socket in one `tokio::select!` loop instead of sharing a client list
//! across threads.

pub mod duel;
