// Source trait for remote economic time series
use async_trait::async_trait;
use std::time::Duration;

/// One dated observation; missing upstream values are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub date: String,
    pub value: Option<f64>,
}

impl SeriesPoint {
    pub fn new(date: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            date: date.into(),
            value,
        }
    }
}

/// Observation window, `YYYY-MM-DD` inclusive bounds
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObservationRange {
    pub start: String,
    pub end: String,
}

impl ObservationRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

/// Hints passed through to the underlying data source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchOptions {
    /// How long a fetched series may be served before it is fetched again
    pub revalidate: Duration,
}

impl FetchOptions {
    pub fn revalidate_seconds(seconds: u64) -> Self {
        Self {
            revalidate: Duration::from_secs(seconds),
        }
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::revalidate_seconds(300)
    }
}

#[async_trait]
pub trait SeriesSource: Send + Sync {
    /// Fetch one series, sorted by date
    async fn fetch_series(
        &self,
        series_id: &str,
        range: &ObservationRange,
        options: FetchOptions,
    ) -> anyhow::Result<Vec<SeriesPoint>>;
}
