use bar_replay_domain::repositories::market_data::BarRepository;
use bar_replay_domain::services::ohlcv::{is_strictly_increasing, DataQualityReport};
use bar_replay_domain::value_objects::bar::Bar;

#[derive(Debug, Clone, Default)]
pub struct LoadedDataset {
    pub bars: Vec<Bar>,
    pub report: Option<DataQualityReport>,
    pub error: Option<String>,
}

impl LoadedDataset {
    pub fn is_usable(&self) -> bool {
        !self.bars.is_empty()
    }
}

/// Loads the dataset, turning any failure into an empty dataset plus an error message.
pub fn load_dataset(repo: &dyn BarRepository) -> LoadedDataset {
    match repo.load_bars() {
        Ok((bars, report)) => {
            if !is_strictly_increasing(&bars) {
                let err = "dataset timestamps are not strictly increasing".to_string();
                tracing::error!(error = %err, "dataset rejected");
                return LoadedDataset {
                    bars: Vec::new(),
                    report: Some(report),
                    error: Some(err),
                };
            }
            tracing::info!(
                bars = bars.len(),
                dropped_rows = report.dropped_rows(),
                duplicates = report.duplicates,
                out_of_order = report.out_of_order,
                "data loaded successfully"
            );
            if bars.is_empty() {
                tracing::warn!("dataset is empty; replay has nothing to show");
            }
            LoadedDataset {
                bars,
                report: Some(report),
                error: None,
            }
        }
        Err(err) => {
            tracing::error!(error = %err, "error loading data");
            LoadedDataset {
                bars: Vec::new(),
                report: None,
                error: Some(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::load_dataset;
    use bar_replay_domain::repositories::market_data::BarRepository;
    use bar_replay_domain::services::ohlcv::DataQualityReport;
    use bar_replay_domain::value_objects::bar::Bar;

    struct FixedRepo(Result<Vec<Bar>, String>);

    impl BarRepository for FixedRepo {
        fn load_bars(&self) -> Result<(Vec<Bar>, DataQualityReport), String> {
            self.0
                .clone()
                .map(|bars| (bars, DataQualityReport::default()))
        }
    }

    fn bar(ts: i64) -> Bar {
        Bar {
            timestamp: ts,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 1.0,
        }
    }

    #[test]
    fn failure_yields_empty_dataset() {
        let loaded = load_dataset(&FixedRepo(Err("missing file".to_string())));
        assert!(!loaded.is_usable());
        assert_eq!(loaded.error.as_deref(), Some("missing file"));
    }

    #[test]
    fn unordered_bars_are_rejected() {
        let loaded = load_dataset(&FixedRepo(Ok(vec![bar(2), bar(1)])));
        assert!(loaded.bars.is_empty());
        assert!(loaded.error.is_some());
    }

    #[test]
    fn ordered_bars_pass_through() {
        let loaded = load_dataset(&FixedRepo(Ok(vec![bar(1), bar(2)])));
        assert_eq!(loaded.bars.len(), 2);
        assert!(loaded.error.is_none());
    }
}
