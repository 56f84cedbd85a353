//! # Position Relay Server Library
//!
//! This library implements the relay hub for a lightweight multiplayer
//! session. Clients connect over WebSocket, receive a unique identity, report
//! their position, and have every report fanned out to all other clients.
//!
//! ## Core Responsibilities
//!
//! ### Connection Tracking
//! Every live connection is registered under its identity for exactly as long
//! as its session is reading. Registration and removal also keep the player
//! roster in step with the live connections.
//!
//! ### State Replay
//! The last `move` frame of each client is cached verbatim. A newly joined
//! client receives its identity followed by every other client's cached
//! frame, before anything else that is broadcast.
//!
//! ### Broadcast Relay
//! Every data frame a client sends is relayed unmodified to all other
//! clients. A recipient that has gone away is logged and skipped without
//! affecting the others.
//!
//! ## Architecture Design
//!
//! ### One Task Per Connection
//! Each upgraded socket runs its own session task on the multi-threaded
//! runtime, plus a writer task draining the client's outbound queue.
//!
//! ### Single Lock
//! Registry, state cache and roster sit behind one `tokio::sync::Mutex`
//! owned by a [`relay::Hub`]. Critical sections are pure map operations and
//! non-blocking queue pushes; socket writes never happen under the lock.
//!
//! ## Module Organization
//!
//! ### Client Manager Module (`client_manager`)
//! Connection registry and per-client state cache.
//!
//! ### Game Module (`game`)
//! Player roster kept in lockstep with the registry.
//!
//! ### Relay Module (`relay`)
//! The hub: join with replay, state updates, leave, broadcast.
//!
//! ### Session Module (`session`)
//! Per-connection lifecycle from upgrade to departure notice.
//!
//! ### Network Module (`network`)
//! HTTP routes, WebSocket upgrade, request logging, server lifecycle.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(&ServerConfig::default()).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod error;
pub mod game;
pub mod network;
pub mod relay;
pub mod session;
