mod coverage;
mod price_bar;
mod stock_snapshot;

pub use coverage::CoverageRange;
pub use price_bar::PriceBar;
pub use stock_snapshot::{AddStockRequest, StockSnapshot};

/// Daily bars for a single ticker, ascending by date
pub type TimeSeries = Vec<PriceBar>;
