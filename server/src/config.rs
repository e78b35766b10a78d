//! Command line configuration for the server binary.

use clap::Parser;
use std::path::PathBuf;

/// Authoritative server for the assassin hunt.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about)]
pub struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    pub port: u16,
    /// Seed for cycle shuffles and correction draws (random when omitted)
    #[clap(short, long)]
    pub seed: Option<u64>,
    /// Snapshot file keeping the ledger across restarts
    #[clap(short, long)]
    pub data: Option<PathBuf>,
    /// JSON roster used to seed an empty store
    #[clap(short, long)]
    pub roster: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub address: String,
    pub seed: Option<u64>,
    pub data: Option<PathBuf>,
    pub roster: Option<PathBuf>,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            address: format!("{}:{}", args.host, args.port),
            seed: args.seed,
            data: args.data,
            roster: args.roster,
        }
    }
}
