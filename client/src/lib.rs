//! # Hunt Client Library
//!
//! Client-side access to the hunt server. The [`network::Client`] sends one
//! request at a time over UDP on behalf of a single user and waits for the
//! matching response; server-side rejections come back as
//! [`network::ClientError::Rejected`] carrying the typed error.
//!
//! The [`rendering`] module turns replies into plain-text tables for the
//! command line client.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//! use shared::{GameId, UserId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::new("127.0.0.1:8080", UserId(7)).await?;
//!     let target = client.fetch_target(GameId(1)).await?;
//!     println!("Hunting {}", target.name);
//!     Ok(())
//! }
//! ```

pub mod network;
pub mod rendering;
