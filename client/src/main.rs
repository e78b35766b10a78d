use clap::{Parser, Subcommand};
use client::network::Client;
use client::rendering::render_reply;
use log::info;
use shared::{GameId, Operation, RecordId, UserId};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// User id to act as
    #[arg(short = 'u', long)]
    user: u64,

    /// Response timeout in milliseconds
    #[arg(short = 't', long, default_value = "2000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild the hunt cycle over all alive players (admin)
    Build {
        #[arg(short, long)]
        game: u64,
    },
    /// Confirm the kill reported on a target record (admin)
    Kill {
        #[arg(short, long)]
        game: u64,
        #[arg(short, long)]
        record: u64,
    },
    /// Show your current target
    Target {
        #[arg(short, long)]
        game: u64,
    },
    /// Show the standings
    Leaderboard {
        #[arg(short, long)]
        game: u64,
    },
    /// List every target record (admin)
    Targets {
        #[arg(short, long)]
        game: u64,
    },
    /// Grant immunity to a random alive player (admin)
    Immunity {
        #[arg(short, long)]
        game: u64,
    },
    /// Deduct a kill from a random alive player (admin)
    Deduct {
        #[arg(short, long)]
        game: u64,
    },
    /// Show game status and your registration
    Info {
        #[arg(short, long)]
        game: u64,
    },
}

impl Command {
    fn into_operation(self) -> Operation {
        match self {
            Command::Build { game } => Operation::BuildCycle { game: GameId(game) },
            Command::Kill { game, record } => Operation::ProcessKill {
                game: GameId(game),
                record: RecordId(record),
            },
            Command::Target { game } => Operation::FetchTarget { game: GameId(game) },
            Command::Leaderboard { game } => Operation::Leaderboard { game: GameId(game) },
            Command::Targets { game } => Operation::ListTargets { game: GameId(game) },
            Command::Immunity { game } => Operation::GrantImmunity { game: GameId(game) },
            Command::Deduct { game } => Operation::DeductKill { game: GameId(game) },
            Command::Info { game } => Operation::GameInfo { game: GameId(game) },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Connecting to: {} as user#{}", args.server, args.user);

    let mut client = Client::new(&args.server, UserId(args.user))
        .await?
        .with_timeout(Duration::from_millis(args.timeout_ms));

    let reply = client.request(args.command.into_operation()).await?;
    print!("{}", render_reply(&reply));

    Ok(())
}
