use bar_replay_domain::repositories::market_data::BarRepository;
use bar_replay_domain::services::ohlcv::{canonicalize_bars, DataQualityReport};
use bar_replay_domain::value_objects::bar::Bar;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use std::fs::File;
use std::path::{Path, PathBuf};

const TIMESTAMP_HEADERS: [&str; 5] = ["date", "datetime", "timestamp", "timestamp_utc", "time"];

/// Bar Dataset stored as a CSV file on disk.
#[derive(Debug, Clone)]
pub struct CsvBarRepository {
    path: PathBuf,
}

impl CsvBarRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BarRepository for CsvBarRepository {
    fn load_bars(&self) -> Result<(Vec<Bar>, DataQualityReport), String> {
        load_csv(&self.path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    /// Matches the first row naming all of open/high/low/close, in any order.
    fn detect(record: &csv::StringRecord) -> Option<Self> {
        let names: Vec<String> = record.iter().map(|c| c.trim().to_ascii_lowercase()).collect();
        let find = |wanted: &str| names.iter().position(|n| n == wanted);
        let timestamp = TIMESTAMP_HEADERS
            .iter()
            .find_map(|name| find(*name))
            .unwrap_or(0);
        Some(Self {
            timestamp,
            open: find("open")?,
            high: find("high")?,
            low: find("low")?,
            close: find("close")?,
            volume: find("volume"),
        })
    }
}

/// Loads OHLCV rows from a CSV file.
///
/// The header row is located by its column names, so files with extra preamble
/// rows (e.g. the multi-row header written by pandas for Yahoo downloads) load as
/// well as plain single-header files. Rows with an unparsable timestamp or a
/// missing price are dropped and counted; volume defaults to zero.
pub fn load_csv(path: &Path) -> Result<(Vec<Bar>, DataQualityReport), String> {
    let file = File::open(path)
        .map_err(|err| format!("failed to open OHLCV CSV {}: {}", path.display(), err))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut report = DataQualityReport::default();
    let mut columns: Option<Columns> = None;
    let mut seen_data = false;
    let mut saw_any_row = false;
    let mut bars = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|err| format!("failed to read CSV row: {}", err))?;
        saw_any_row = true;

        let Some(cols) = columns else {
            columns = Columns::detect(&record);
            if let Some(cols) = columns {
                tracing::debug!(?cols, path = %path.display(), "detected OHLCV header");
            }
            continue;
        };

        let timestamp = record.get(cols.timestamp).and_then(parse_timestamp);
        let prices = [cols.open, cols.high, cols.low, cols.close].map(|idx| cell_f64(&record, idx));

        if !seen_data && timestamp.is_none() && prices.iter().all(Option::is_none) {
            // Continuation of a multi-row header ("Ticker,AAPL,..." / "Date,,,,").
            continue;
        }
        seen_data = true;
        report.rows_read += 1;

        let Some(timestamp) = timestamp else {
            report.invalid_timestamp += 1;
            continue;
        };
        let [Some(open), Some(high), Some(low), Some(close)] = prices else {
            report.incomplete_rows += 1;
            continue;
        };
        let volume = cols
            .volume
            .and_then(|idx| cell_f64(&record, idx))
            .unwrap_or(0.0);

        bars.push(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    if saw_any_row && columns.is_none() {
        return Err(format!(
            "no open/high/low/close header found in {}",
            path.display()
        ));
    }

    let bars = canonicalize_bars(bars, &mut report);
    Ok((bars, report))
}

/// Writes bars as `Date,Open,High,Low,Close,Volume`, creating parent directories.
pub fn write_csv(path: &Path, bars: &[Bar]) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|err| format!("failed to create {}: {}", parent.display(), err))?;
    }
    let mut writer = csv::Writer::from_path(path)
        .map_err(|err| format!("failed to create CSV {}: {}", path.display(), err))?;
    writer
        .write_record(["Date", "Open", "High", "Low", "Close", "Volume"])
        .map_err(|err| format!("failed to write CSV header: {}", err))?;

    for bar in bars {
        let date = format_timestamp(bar.timestamp)?;
        writer
            .write_record([
                date,
                bar.open.to_string(),
                bar.high.to_string(),
                bar.low.to_string(),
                bar.close.to_string(),
                bar.volume.to_string(),
            ])
            .map_err(|err| format!("failed to write CSV row: {}", err))?;
    }
    writer
        .flush()
        .map_err(|err| format!("failed to flush CSV {}: {}", path.display(), err))
}

fn cell_f64(record: &csv::StringRecord, idx: usize) -> Option<f64> {
    record
        .get(idx)
        .and_then(|cell| cell.parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

fn parse_timestamp(value: &str) -> Option<i64> {
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%z", "%Y-%m-%d %H:%M:%S%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(value, fmt) {
            return Some(dt.timestamp());
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(Utc.from_utc_datetime(&naive).timestamp());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive).timestamp());
    }
    value.parse::<i64>().ok()
}

fn format_timestamp(timestamp: i64) -> Result<String, String> {
    let dt = DateTime::from_timestamp(timestamp, 0)
        .ok_or_else(|| format!("timestamp out of range: {}", timestamp))?;
    if dt.num_seconds_from_midnight() == 0 {
        Ok(dt.format("%Y-%m-%d").to_string())
    } else {
        Ok(dt.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}
