use clap::{Parser, Subcommand, command};

use std::net::SocketAddr;

#[derive(Parser)]
#[command()]
pub struct Args {
    /// Fixed database URL; when absent DATABASE_URL is read on every operation
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// The address to listen on
        #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
    },
    /// Create the persons table if it does not exist yet
    CreateDb,
    /// Insert random people
    Seed {
        /// The number of people to insert
        count: u32,
    },
}
