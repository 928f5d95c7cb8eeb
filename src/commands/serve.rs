use crate::server::{self, AppState};
use crate::services::{SharedProvider, StockRegistry, YahooClient};
use crate::utils::{get_cors_origins, get_data_dir};
use std::sync::Arc;

pub async fn run(port: u16) {
    println!("🚀 Starting stockcache server on port {}", port);

    let data_dir = get_data_dir();
    println!("📁 Cache directory: {}", data_dir.display());
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        eprintln!("❌ Failed to create cache directory {}: {}", data_dir.display(), e);
        std::process::exit(1);
    }

    let provider: SharedProvider = match YahooClient::from_env() {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("❌ Failed to create provider client: {}", e);
            std::process::exit(1);
        }
    };

    let registry = Arc::new(StockRegistry::new(provider, data_dir));
    let cors_origins = get_cors_origins();

    println!("🌐 Starting HTTP server...");
    if let Err(e) = server::serve(AppState::new(registry), &cors_origins, port).await {
        eprintln!("❌ Server error: {}", e);
        std::process::exit(1);
    }
}
