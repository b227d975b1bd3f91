use bar_replay_domain::repositories::market_data::{BarDownloader, DownloadRequest};
use bar_replay_domain::value_objects::bar::Bar;
use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = concat!("bar-replay/", env!("CARGO_PKG_VERSION"));

/// Daily-bar client for the Yahoo Finance chart endpoint.
#[derive(Debug, Clone)]
pub struct YahooChartClient {
    base_url: String,
    client: Client,
}

impl YahooChartClient {
    pub fn new(timeout: Duration) -> Result<Self, String> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| format!("failed to build http client: {err}"))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn chart_url(&self, request: &DownloadRequest) -> Result<String, String> {
        if request.symbol.trim().is_empty() {
            return Err("symbol must not be empty".to_string());
        }
        if request.end <= request.start {
            return Err(format!(
                "end date {} must be after start date {}",
                request.end, request.start
            ));
        }
        Ok(format!(
            "{}/{}?period1={}&period2={}&interval=1d&events=history",
            self.base_url,
            request.symbol.trim(),
            day_start_epoch(request.start),
            day_start_epoch(request.end),
        ))
    }
}

impl BarDownloader for YahooChartClient {
    fn fetch_bars(&self, request: &DownloadRequest) -> Result<Vec<Bar>, String> {
        let url = self.chart_url(request)?;
        let span = tracing::info_span!(
            "yahoo.fetch_bars",
            symbol = %request.symbol,
            start = %request.start,
            end = %request.end
        );
        let _enter = span.enter();

        metrics::counter!("bar_replay.infra.download.requests_total").increment(1);
        let response = self.client.get(&url).send().map_err(|err| {
            metrics::counter!("bar_replay.infra.download.errors_total").increment(1);
            format!("chart request failed: {err}")
        })?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|err| format!("failed to read chart response: {err}"))?;
        if !status.is_success() {
            metrics::counter!("bar_replay.infra.download.errors_total").increment(1);
            let detail = parse_chart_response(&body)
                .err()
                .unwrap_or_else(|| truncate(&body, 200));
            return Err(format!("chart request returned {status}: {detail}"));
        }

        let bars = parse_chart_response(&body)?;
        tracing::info!(bars = bars.len(), "downloaded daily bars");
        Ok(bars)
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Decodes a chart response body into bars, skipping rows with a null price.
pub fn parse_chart_response(body: &str) -> Result<Vec<Bar>, String> {
    let envelope: ChartEnvelope = serde_json::from_str(body)
        .map_err(|err| format!("failed to decode chart response: {err}"))?;
    if let Some(error) = envelope.chart.error {
        return Err(format!("{}: {}", error.code, error.description));
    }
    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let at = |series: &[Option<f64>], idx: usize| {
        series
            .get(idx)
            .copied()
            .flatten()
            .filter(|value| value.is_finite())
    };

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (idx, timestamp) in result.timestamp.iter().copied().enumerate() {
        let (Some(open), Some(high), Some(low), Some(close)) = (
            at(&quote.open, idx),
            at(&quote.high, idx),
            at(&quote.low, idx),
            at(&quote.close, idx),
        ) else {
            tracing::debug!(timestamp, "skipping chart row with missing prices");
            continue;
        };
        bars.push(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume: at(&quote.volume, idx).unwrap_or(0.0),
        });
    }
    Ok(bars)
}

fn day_start_epoch(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc().timestamp())
        .unwrap_or_default()
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
