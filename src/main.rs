use anyhow::{Context, Result};
use clap::Parser;
use rand::Rng;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use std::net::SocketAddr;

mod commands;

use commands::{Args, Commands};
use people_store::{PersonRecord, PersonStore};

const FIRST_NAMES: [&str; 10] = [
    "Tom", "Johnny", "Jim", "Eric", "Amanda", "Grace", "Judy", "Frank", "Sally", "Will",
];
const LAST_NAMES: [&str; 10] = [
    "Connor",
    "Henderson",
    "Farley",
    "Henson",
    "Jeffries",
    "Carlin",
    "Anderson",
    "O' Sullivan",
    "Dorothy",
    "McDougal",
];

async fn serve(store: PersonStore, bind: SocketAddr) -> Result<()> {
    tracing::info!("Starting server");

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Could not bind to {}", bind))?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, people_store::router(store))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server stopped with an error")?;

    tracing::info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {:?}", e);
    }
}

async fn create_db(store: &PersonStore) -> Result<()> {
    tracing::info!("Creating persons table");

    store
        .initialize_schema()
        .await
        .context("Database error while creating persons table")?;

    tracing::info!("Database set up");

    Ok(())
}

async fn seed(store: &PersonStore, count: u32) -> Result<()> {
    create_db(store).await?;

    tracing::info!("Inserting {} random people", count);

    let start = std::time::Instant::now();

    let mut rng = rand::rng();
    for _ in 0..count {
        let first_name = FIRST_NAMES[rng.random_range(0..FIRST_NAMES.len())];
        let last_name = LAST_NAMES[rng.random_range(0..LAST_NAMES.len())];
        let mailbox: String = last_name
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect();
        let email = format!(
            "{}.{}_{}@somemail.com",
            first_name,
            mailbox,
            rng.random_range(18..=65)
        );

        let person = PersonRecord::new(first_name, last_name, &email)?;
        store
            .insert(&person)
            .await
            .context("Database error while inserting person")?;
    }

    tracing::info!("{} people stored in {:?}", count, start.elapsed());

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("Failed to load .env");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Args::parse();
    let store = match cli.database_url {
        Some(url) => PersonStore::with_url(url),
        None => PersonStore::from_env(),
    };

    match cli.command {
        Some(Commands::Serve { bind }) => serve(store, bind).await?,
        Some(Commands::CreateDb) => create_db(&store).await?,
        Some(Commands::Seed { count }) => seed(&store, count).await?,
        None => {
            println!("Run with --help to see instructions");
        }
    }

    Ok(())
}
