use crate::services::cache_file::{list_cache_files, read_bars};
use crate::utils::get_data_dir;

pub fn run() {
    println!("📊 Stock Cache Status\n");

    match show_status() {
        Ok(()) => {}
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn show_status() -> Result<(), Box<dyn std::error::Error>> {
    let data_dir = get_data_dir();
    println!("📁 Cache directory: {}\n", data_dir.display());

    let files = list_cache_files(&data_dir)?;
    if files.is_empty() {
        println!("⚠️  No cached stocks found. Run 'fetch' or POST /stocks first.");
        return Ok(());
    }

    println!("📈 Cached Tickers: {}\n", files.len());

    for file in &files {
        match read_bars(&file.path) {
            Ok(bars) => {
                let last_close = bars
                    .last()
                    .map_or_else(|| "-".to_string(), |bar| format!("{:.2}", bar.close));
                println!(
                    "🔹 {:<8} {:>8} records  ({})  last close: {}",
                    file.ticker,
                    format_number(bars.len()),
                    file.coverage,
                    last_close
                );
            }
            Err(e) => {
                eprintln!("⚠️  Could not read {}: {}", file.path.display(), e);
            }
        }
    }

    Ok(())
}

fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.insert(0, ',');
        }
        result.insert(0, c);
    }
    result
}
