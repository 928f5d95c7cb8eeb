use crate::services::{SharedProvider, Stock, YahooClient};
use crate::utils::get_data_dir;
use std::sync::Arc;

/// Open a stock once (download or reuse its cache file) and report coverage
pub async fn run(ticker: String, start_date: String, end_date: String) {
    let data_dir = get_data_dir();
    println!("📥 Fetching {} ({} → {})", ticker, start_date, end_date);
    println!("📁 Cache directory: {}", data_dir.display());

    let provider: SharedProvider = match YahooClient::from_env() {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("❌ Failed to create provider client: {}", e);
            std::process::exit(1);
        }
    };

    match Stock::open(&ticker, &start_date, &end_date, provider, &data_dir).await {
        Ok(stock) => {
            println!("✅ {}", stock.ticker());
            println!("   Coverage: {}", stock.coverage());
            println!("   Records:  {}", stock.bars().len());
        }
        Err(e) => {
            eprintln!("❌ Fetch failed: {}", e);
            std::process::exit(1);
        }
    }
}
