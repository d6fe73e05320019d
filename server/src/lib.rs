//! # Arena Server Library
//!
//! Authoritative simulation and state replication for the devour arena.
//! The server owns the canonical entity set (players and autonomous
//! agents), resolves size-based devour collisions, tracks score and the
//! countdown clock, and streams the resulting state to every connected
//! viewer.
//!
//! ## Architecture
//!
//! A single `tokio::select!` loop owns all mutable state. Two background
//! tasks handle socket I/O (a receiver and a sender) and talk to the loop
//! exclusively through channels carrying plain event values, so no locking
//! is needed anywhere in the simulation. Inbound datagrams are fully
//! applied to the registry before a tick's simulation step runs.
//!
//! Per tick: apply queued messages → drive agents → resolve at most one
//! devour → advance the game clock → replicate (reliable lifecycle events
//! to everyone, unreliable snapshots to everyone but the entity's own
//! controller) → flush and retransmit.
//!
//! The loop has no fixed tick-rate contract; all movement is scaled by the
//! measured elapsed time, so the simulation stays correct under a
//! variable, uncapped tick rate.
//!
//! ## Modules
//!
//! - [`registry`]: dense entity table and the entity ↔ session control
//!   index
//! - [`agents`]: movement policy for autonomous entities
//! - [`devour`]: pairwise collision scan and the devour rule
//! - [`clock`]: countdown and end-state machine
//! - [`broadcast`]: per-tick replication policy
//! - [`network`]: socket tasks and session tracking
//! - [`game`]: the simulation state and the loop that drives it
//!
//! ## Usage
//!
//! ```rust,no_run
//! use server::game::Server;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(
//!         "127.0.0.1:10131",
//!         Duration::from_millis(16),
//!         60, // match duration in seconds
//!         10, // agents spawned on the first join
//!     )
//!     .await?;
//!     server.run().await
//! }
//! ```

pub mod agents;
pub mod broadcast;
pub mod clock;
pub mod devour;
pub mod game;
pub mod network;
pub mod registry;
