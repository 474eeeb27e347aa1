use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "metropay")]
#[command(author, version, about = "Payment callback processor for the Metro Shop bot", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the callback server
    Run {
        /// Override the listen port (default: WEBHOOK_PORT env or 8080)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Create the database schema and exit
    InitDb,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
