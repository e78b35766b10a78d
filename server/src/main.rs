use clap::Parser;
use log::info;
use server::config::{Args, ServerConfig};
use server::game::HuntService;
use server::network::Server;
use server::rng::HuntRng;
use server::roster::Roster;
use server::store::Store;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = ServerConfig::from(Args::parse());

    let store = match &config.data {
        Some(path) => Store::open(path).await?,
        None => Store::in_memory(),
    };

    if let Some(path) = &config.roster {
        if store.is_empty().await {
            let roster = Roster::from_path(path).await?;
            roster.seed(&store).await?;
        } else {
            info!("Store already populated, ignoring roster {}", path.display());
        }
    }

    let rng = match config.seed {
        Some(seed) => HuntRng::new(seed),
        None => HuntRng::from_entropy(),
    };
    info!("Random seed: {}", rng.seed());

    let service = Arc::new(HuntService::new(Arc::new(store), rng));
    let mut server = Server::new(&config.address, service).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
