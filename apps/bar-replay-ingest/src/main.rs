use bar_replay_domain::repositories::market_data::{BarDownloader, DownloadRequest};
use bar_replay_infrastructure::market_data::{write_csv, YahooChartClient};
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "bar-replay-ingest")]
#[command(about = "Download daily bars from Yahoo Finance and save them as CSV.", version)]
struct Cli {
    /// Ticker symbol, e.g. AAPL or EURUSD=X.
    #[arg(long, env = "BAR_REPLAY_SYMBOL", default_value = "AAPL")]
    symbol: String,

    /// First day to download (YYYY-MM-DD, inclusive).
    #[arg(long, default_value = "2022-01-01")]
    start: String,

    /// Last day boundary (YYYY-MM-DD, exclusive).
    #[arg(long, default_value = "2023-01-01")]
    end: String,

    /// Output CSV path. Defaults to `<SYMBOL>_data.csv`.
    #[arg(long)]
    out: Option<PathBuf>,

    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,
}

fn main() {
    if let Err(err) = init_tracing() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let request = DownloadRequest {
        symbol: cli.symbol.trim().to_string(),
        start: parse_date(&cli.start)?,
        end: parse_date(&cli.end)?,
    };
    let out = cli
        .out
        .unwrap_or_else(|| default_out_path(&request.symbol));

    let client = YahooChartClient::new(Duration::from_millis(cli.timeout_ms))?;
    let bars = client.fetch_bars(&request)?;
    if bars.is_empty() {
        tracing::warn!(symbol = %request.symbol, "provider returned no bars");
    }
    write_csv(&out, &bars)?;

    tracing::info!(bars = bars.len(), out = %out.display(), "saved bars");
    for bar in bars.iter().take(5) {
        let date = bar
            .datetime()
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!(
            "{date} open={:.4} high={:.4} low={:.4} close={:.4} volume={:.0}",
            bar.open, bar.high, bar.low, bar.close, bar.volume
        );
    }
    Ok(())
}

fn init_tracing() -> Result<(), String> {
    let filter = std::env::var("BAR_REPLAY_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| format!("invalid log filter: {err}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|err| format!("invalid date {value:?} (expected YYYY-MM-DD): {err}"))
}

fn default_out_path(symbol: &str) -> PathBuf {
    let stem: String = symbol
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '.')
        .collect();
    PathBuf::from(format!("{stem}_data.csv"))
}
