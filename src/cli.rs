use clap::{Parser, Subcommand};

use crate::commands;
use crate::constants::DEFAULT_PORT;

#[derive(Parser)]
#[command(name = "stockcache")]
#[command(about = "Historical stock price cache and REST API", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Download a ticker's history into the cache (or reuse the cached file)
    Fetch {
        /// Ticker symbol, e.g. AAPL
        ticker: String,
        /// Start date (YYYY-MM-DD)
        start_date: String,
        /// End date (YYYY-MM-DD, exclusive)
        end_date: String,
    },
    /// Extend a cached ticker up to today
    Update {
        /// Ticker symbol, e.g. AAPL
        ticker: String,
    },
    /// Show cached tickers and their coverage
    Status,
}

pub async fn run() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            commands::serve::run(port).await;
        }
        Commands::Fetch {
            ticker,
            start_date,
            end_date,
        } => {
            commands::fetch::run(ticker, start_date, end_date).await;
        }
        Commands::Update { ticker } => {
            commands::update::run(ticker).await;
        }
        Commands::Status => {
            commands::status::run();
        }
    }
}
