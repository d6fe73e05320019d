//! # Arena Viewer Library
//!
//! Client-side implementation for the devour arena: joins the server,
//! keeps a local mirror of the authoritative entity set, drives the
//! controlled entity from keyboard input, and renders the arena.
//!
//! The mirror trusts the server completely: positional snapshots overwrite
//! local state directly, and a devoured event moves the controlled entity
//! even when local prediction says otherwise. The only locally-originated
//! motion is the player's own input, which is applied immediately and
//! reported to the server as unreliable player-move messages; the server
//! never echoes a viewer's own entity back, so prediction and authority
//! meet only through devour corrections.
//!
//! ## Modules
//!
//! - [`mirror`]: identifier-keyed local entity table and message
//!   application
//! - [`input`]: keyboard sampling
//! - [`network`]: connection, join handshake, frame loop
//! - [`rendering`]: macroquad arena, HUD and leaderboard drawing

pub mod input;
pub mod mirror;
pub mod network;
pub mod rendering;
