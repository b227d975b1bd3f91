use crate::value_objects::bar::Bar;
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DataQualityReport {
    pub rows_read: usize,
    pub invalid_timestamp: usize,
    pub incomplete_rows: usize,
    pub duplicates: usize,
    pub out_of_order: usize,
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
    pub first_duplicate: Option<i64>,
    pub first_out_of_order: Option<i64>,
}

impl DataQualityReport {
    pub fn dropped_rows(&self) -> usize {
        self.invalid_timestamp + self.incomplete_rows + self.duplicates
    }
}

/// Orders bars by timestamp and keeps the last row seen for any repeated timestamp,
/// so the result is strictly increasing. Counters are added to `report`.
pub fn canonicalize_bars(bars: Vec<Bar>, report: &mut DataQualityReport) -> Vec<Bar> {
    let mut by_ts: BTreeMap<i64, Bar> = BTreeMap::new();
    let mut last_seen: Option<i64> = None;

    for bar in bars {
        let ts = bar.timestamp;
        if let Some(prev) = last_seen {
            if ts < prev {
                report.out_of_order += 1;
                if report.first_out_of_order.is_none() {
                    report.first_out_of_order = Some(ts);
                }
            }
        }
        last_seen = Some(ts);

        if by_ts.insert(ts, bar).is_some() {
            report.duplicates += 1;
            if report.first_duplicate.is_none() {
                report.first_duplicate = Some(ts);
            }
        }
    }

    let bars: Vec<Bar> = by_ts.into_values().collect();
    report.first_timestamp = bars.first().map(|b| b.timestamp);
    report.last_timestamp = bars.last().map(|b| b.timestamp);
    bars
}

pub fn is_strictly_increasing(bars: &[Bar]) -> bool {
    bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp)
}
