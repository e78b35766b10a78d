//! # Hunt Server Library
//!
//! This library provides the authoritative server for a live assassin-style
//! elimination game. Every alive participant hunts exactly one other
//! participant; together the assignments form a single rotating cycle. The
//! server owns that cycle, applies confirmed kills to it and derives the
//! public leaderboard from the resulting ledger.
//!
//! ## Core Responsibilities
//!
//! ### Cycle Construction
//! An admin (re)builds the hunt cycle over the currently alive players. All
//! open assignments are expired and the shuffled players are linked into one
//! ring. The shuffle comes from an injected, seedable random source.
//!
//! ### Kill Processing
//! An admin confirms a kill by naming the hunter's open assignment. The prey
//! is eliminated and the hunter inherits the prey's own assignment. The whole
//! change commits atomically or not at all.
//!
//! ### Standings
//! The leaderboard is computed from completed assignments minus random kill
//! deductions. Target records are never deleted, so the ledger doubles as the
//! audit trail.
//!
//! ## Module Organization
//!
//! ### Store (`store`)
//! Registries for users, games and players plus the append-only target
//! ledger. Writes are batched with status preconditions and committed
//! all-or-nothing, optionally persisted to a snapshot file.
//!
//! ### Hunt Core (`targets`, `kills`, `leaderboard`, `lookup`, `corrections`)
//! Pure functions over a committed view of the store. Mutating operations
//! return a plan (a batch of conditional writes) instead of writing directly.
//!
//! ### Service (`game`)
//! [`game::HuntService`] ties the store and the random source together and
//! exposes one async method per operation.
//!
//! ### Network (`network`)
//! UDP request/response transport. Each request is handled on its own task,
//! so requests are served concurrently.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::game::HuntService;
//! use server::network::Server;
//! use server::rng::HuntRng;
//! use server::store::Store;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(Store::open("hunt.bin").await?);
//!     let service = Arc::new(HuntService::new(store, HuntRng::new(42)));
//!
//!     let mut server = Server::new("127.0.0.1:8080", service).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod access;
pub mod config;
pub mod corrections;
pub mod game;
pub mod kills;
pub mod leaderboard;
pub mod lookup;
pub mod network;
pub mod rng;
pub mod roster;
pub mod store;
pub mod targets;
