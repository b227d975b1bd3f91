pub mod chart;
pub mod geometry;
pub mod ohlcv;
