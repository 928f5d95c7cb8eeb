pub mod cache_file;
pub mod provider;
pub mod registry;
pub mod stock;
pub mod yahoo;

pub use cache_file::{find_cache_file, list_cache_files, CacheFile};
pub use provider::{PriceProvider, SharedProvider};
pub use registry::{SharedRegistry, StockRegistry};
pub use stock::Stock;
pub use yahoo::YahooClient;
