use crate::error::AppError;
use crate::services::{SharedProvider, Stock, YahooClient};
use crate::utils::get_data_dir;
use chrono::Utc;
use std::sync::Arc;

/// Extend an existing cache file up to today
pub async fn run(ticker: String) {
    let data_dir = get_data_dir();
    let today = Utc::now().date_naive();
    println!("🔄 Updating {} up to {}", ticker, today);

    let provider: SharedProvider = match YahooClient::from_env() {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("❌ Failed to create provider client: {}", e);
            std::process::exit(1);
        }
    };

    let mut stock = match Stock::from_cache(&ticker, provider, &data_dir) {
        Ok(stock) => stock,
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!("   Run 'fetch {} <start> <end>' first.", ticker);
            std::process::exit(1);
        }
    };

    let before = stock.bars().len();
    match stock.update(today).await {
        Ok(()) => {
            println!("✅ {} now covers {}", stock.ticker(), stock.coverage());
            println!("   Added {} records ({} total)", stock.bars().len().saturating_sub(before), stock.bars().len());
        }
        Err(AppError::UpToDate) => {
            println!("✅ {} is already up to date ({})", stock.ticker(), stock.coverage());
        }
        Err(e) => {
            eprintln!("❌ Update failed: {}", e);
            std::process::exit(1);
        }
    }
}
