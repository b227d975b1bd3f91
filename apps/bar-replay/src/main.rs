use bar_replay::headless::{self, HeadlessArgs};
use bar_replay::{logging, TuiOpts};
use bar_replay_application::config::{self, Config};
use bar_replay_application::dataset::load_dataset;
use bar_replay_application::session::SessionOptions;
use bar_replay_infrastructure::market_data::CsvBarRepository;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "bar-replay")]
#[command(about = "Bar-by-bar chart replay with trend lines and buy/sell markers.", version)]
struct Cli {
    /// Config file path (TOML). If omitted, uses env BAR_REPLAY_CONFIG, then built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// OHLCV CSV file; overrides `data.csv_path`.
    #[arg(long)]
    data: Option<PathBuf>,

    /// Replay Loop period in milliseconds; overrides `replay.tick_interval_ms`.
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Print bars to stdout instead of opening the TUI, exiting when the replay ends.
    #[arg(long)]
    headless: bool,

    /// Seconds between bars in headless mode; overrides the tick interval.
    #[arg(long, requires = "headless")]
    speed: Option<f64>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,
}

fn main() {
    let cli = Cli::parse();

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    if cli.print_config {
        match config::to_toml_pretty(&config) {
            Ok(text) => {
                print!("{text}");
                std::process::exit(0);
            }
            Err(err) => {
                eprintln!("error: {err}");
                std::process::exit(1);
            }
        }
    }

    let log_store = Arc::new(parking_lot::Mutex::new(logging::LogStore::new(
        config.ui.log_lines,
    )));
    let tracing_result = if cli.headless {
        init_tracing(None)
    } else {
        init_tracing(Some(log_store.clone()))
    };
    if let Err(err) = tracing_result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    if let Err(err) = init_metrics() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    let mut options = SessionOptions {
        tick_interval: config.tick_interval(),
        annotations: config.annotation_settings(),
        style: config.chart_style(),
    };
    if let Some(speed) = cli.speed {
        options.tick_interval = match headless::speed_to_interval(speed) {
            Ok(interval) => interval,
            Err(err) => {
                eprintln!("error: {err}");
                std::process::exit(1);
            }
        };
    }

    let repo = CsvBarRepository::new(config.data.csv_path.clone());
    let dataset = load_dataset(&repo);

    if cli.headless {
        if let Some(err) = dataset.error.as_deref() {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
        let result = headless::run_headless(HeadlessArgs {
            bars: dataset.bars,
            options,
        });
        if let Err(err) = result {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
        return;
    }

    let opts = TuiOpts {
        symbol: config.data.symbol.clone(),
        dataset,
        options,
        log_store,
    };
    if let Err(err) = bar_replay::run(opts) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn resolve_config(cli: &Cli) -> Result<Config, String> {
    let path = cli.config.clone().or_else(|| {
        std::env::var("BAR_REPLAY_CONFIG")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
    });
    let mut config = match path {
        Some(path) => config::load_config(&path)?,
        None => Config::default(),
    };
    if let Some(data) = cli.data.clone() {
        config.data.csv_path = data;
    }
    if let Some(tick_ms) = cli.tick_ms {
        config.replay.tick_interval_ms = tick_ms;
    }
    config.validate()?;
    Ok(config)
}

fn init_tracing(log_store: Option<logging::SharedLogStore>) -> Result<(), String> {
    let filter = std::env::var("BAR_REPLAY_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| format!("invalid log filter: {err}"))?;

    match log_store {
        Some(store) => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_ansi(false)
            .with_writer(logging::LogMakeWriter::new(store))
            .init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init(),
    }

    Ok(())
}

#[cfg(feature = "prometheus")]
fn init_metrics() -> Result<Option<SocketAddr>, String> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let Some(raw) = std::env::var("BAR_REPLAY_METRICS_ADDR").ok() else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }

    let addr: SocketAddr = raw
        .trim()
        .parse()
        .map_err(|err| format!("invalid BAR_REPLAY_METRICS_ADDR (expected host:port): {err}"))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|err| format!("failed to install prometheus exporter: {err}"))?;

    tracing::info!(metrics_addr = %addr, "prometheus metrics exporter enabled");
    Ok(Some(addr))
}

#[cfg(not(feature = "prometheus"))]
fn init_metrics() -> Result<Option<SocketAddr>, String> {
    Ok(None)
}
