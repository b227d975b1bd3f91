pub mod ohlcv;
pub mod yahoo;

pub use self::ohlcv::{load_csv, write_csv, CsvBarRepository};
pub use self::yahoo::YahooChartClient;
