use crate::services::ohlcv::DataQualityReport;
use crate::value_objects::bar::Bar;
use chrono::NaiveDate;

/// Reads a persisted Bar Dataset.
pub trait BarRepository {
    fn load_bars(&self) -> Result<(Vec<Bar>, DataQualityReport), String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Fetches bars from a remote market-data provider.
pub trait BarDownloader {
    fn fetch_bars(&self, request: &DownloadRequest) -> Result<Vec<Bar>, String>;
}
