// Tile data service - Resolves a tile id to its normalized payload
use crate::application::registry::Registry;
use crate::application::series_source::{FetchOptions, ObservationRange, SeriesPoint, SeriesSource};
use crate::domain::payload::{PayloadBuilder, TileDataMeta, TileDataPayload};
use crate::domain::tile::{FetchDescriptor, FredSeriesRef};
use crate::domain::time_scale::{TIMELINE_END_DATE, TIMELINE_START_DATE};
use crate::domain::static_datasets;
use futures::future::try_join_all;
use indexmap::IndexMap;
use std::sync::Arc;

// Distributional Financial Accounts wealth shares
const DFA_BOTTOM50: &str = "WFRBSB50189";
const DFA_P50TO90: &str = "WFRBSN40162";
const DFA_P90TO99: &str = "WFRBSN09135";
const DFA_TOP1: &str = "WFRBST01108";

#[derive(Debug, thiserror::Error)]
pub enum TileDataError {
    #[error("Unknown tile")]
    UnknownTile,
    #[error("No data for this tile")]
    NoData,
    #[error("{0}")]
    Upstream(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct TileDataService {
    registry: Arc<Registry>,
    source: Arc<dyn SeriesSource>,
    options: FetchOptions,
}

impl TileDataService {
    pub fn new(registry: Arc<Registry>, source: Arc<dyn SeriesSource>, options: FetchOptions) -> Self {
        Self {
            registry,
            source,
            options,
        }
    }

    pub fn options(&self) -> FetchOptions {
        self.options
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub async fn tile_data(&self, tile_id: &str) -> Result<TileDataPayload, TileDataError> {
        let tile = self.registry.tile(tile_id).ok_or(TileDataError::UnknownTile)?;
        tracing::debug!("Loading tile {} ({})", tile_id, tile.fetch.kind());

        let payload = match &tile.fetch {
            FetchDescriptor::WealthDistribution => self.wealth_distribution().await?,
            FetchDescriptor::FredMulti { series } => self.fred_multi(series).await?,
            FetchDescriptor::LongRunTopWealthShares => self.long_run_top_wealth_shares().await?,
            FetchDescriptor::ScfWealthByCohort => static_datasets::scf_wealth_by_cohort(),
            FetchDescriptor::GssInstitutionalTrust => static_datasets::gss_institutional_trust(),
            FetchDescriptor::TurningTimelineOverlay => static_datasets::turning_timeline(),
            FetchDescriptor::AbsoluteMobility => static_datasets::absolute_mobility(),
            FetchDescriptor::Polarization => static_datasets::polarization(),
            FetchDescriptor::Unrest => static_datasets::unrest(),
            FetchDescriptor::ViolenceWar => static_datasets::violence_war(),
            FetchDescriptor::Stub => TileDataPayload::empty(),
            FetchDescriptor::None => return Err(TileDataError::NoData),
        };

        tracing::debug!("Tile {} resolved with {} rows", tile_id, payload.data.len());
        Ok(payload)
    }

    fn timeline_range() -> ObservationRange {
        ObservationRange::new(TIMELINE_START_DATE, TIMELINE_END_DATE)
    }

    /// Fetch all series concurrently; any failure fails the tile.
    async fn fetch_all(&self, ids: &[&str]) -> anyhow::Result<Vec<Vec<SeriesPoint>>> {
        let range = Self::timeline_range();
        try_join_all(
            ids.iter()
                .map(|id| self.source.fetch_series(id, &range, self.options)),
        )
        .await
    }

    async fn fred_multi(&self, series: &[FredSeriesRef]) -> anyhow::Result<TileDataPayload> {
        if series.is_empty() {
            return Ok(TileDataPayload::empty());
        }
        let ids: Vec<&str> = series.iter().map(|s| s.id.as_str()).collect();
        let all_points = self.fetch_all(&ids).await?;

        let mut builder = PayloadBuilder::new(ids.iter().copied());
        for (id, points) in ids.iter().zip(all_points) {
            for p in points {
                builder.set(&p.date, id, p.value);
            }
        }

        let meta = TileDataMeta {
            units: None,
            frequency: None,
            series: series
                .iter()
                .map(|s| (s.id.clone(), s.label.clone()))
                .collect::<IndexMap<_, _>>(),
        };
        Ok(builder.build(meta, TIMELINE_START_DATE, TIMELINE_END_DATE))
    }

    async fn wealth_distribution(&self) -> anyhow::Result<TileDataPayload> {
        let keyed = [
            ("bottom50", DFA_BOTTOM50, "B50"),
            ("p50to90", DFA_P50TO90, "50-90"),
            ("p90to99", DFA_P90TO99, "90-99"),
            ("top1", DFA_TOP1, "T1"),
        ];
        let ids: Vec<&str> = keyed.iter().map(|(_, id, _)| *id).collect();
        let all_points = self.fetch_all(&ids).await?;

        let mut builder = PayloadBuilder::new(keyed.iter().map(|(k, _, _)| *k));
        for ((key, _, _), points) in keyed.iter().zip(all_points) {
            for p in points {
                builder.set(&p.date, key, p.value);
            }
        }

        let meta = TileDataMeta {
            units: Some("percent".to_string()),
            frequency: Some("quarterly".to_string()),
            series: keyed
                .iter()
                .map(|(k, _, label)| (k.to_string(), label.to_string()))
                .collect(),
        };
        Ok(builder.build(meta, TIMELINE_START_DATE, TIMELINE_END_DATE))
    }

    /// Top 1% share and top 10% = top 1% + 90-99%, where both are known.
    async fn long_run_top_wealth_shares(&self) -> anyhow::Result<TileDataPayload> {
        let mut fetched = self.fetch_all(&[DFA_TOP1, DFA_P90TO99]).await?.into_iter();
        let top1 = fetched.next().unwrap_or_default();
        let p90to99 = fetched.next().unwrap_or_default();

        let mut builder = PayloadBuilder::new(["top1", "top10"]);
        for p in top1 {
            builder.set(&p.date, "top1", p.value);
        }
        for p in p90to99 {
            builder.touch(&p.date);
            let top10 = builder
                .get(&p.date, "top1")
                .zip(p.value)
                .map(|(a, b)| a + b);
            builder.set(&p.date, "top10", top10);
        }

        let meta = TileDataMeta {
            units: Some("percent".to_string()),
            frequency: Some("quarterly".to_string()),
            series: [("top1", "Top 1%"), ("top10", "Top 10%")]
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };
        Ok(builder.build(meta, TIMELINE_START_DATE, TIMELINE_END_DATE))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::application::registry::tests::catalogue;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory series keyed by id; unknown ids fail like an unreachable upstream.
    #[derive(Default)]
    pub(crate) struct FakeSource {
        pub series: HashMap<String, Vec<SeriesPoint>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeSource {
        pub(crate) fn with(mut self, id: &str, points: &[(&str, Option<f64>)]) -> Self {
            self.series.insert(
                id.to_string(),
                points.iter().map(|(d, v)| SeriesPoint::new(*d, *v)).collect(),
            );
            self
        }
    }

    #[async_trait]
    impl SeriesSource for FakeSource {
        async fn fetch_series(
            &self,
            series_id: &str,
            _range: &ObservationRange,
            _options: FetchOptions,
        ) -> anyhow::Result<Vec<SeriesPoint>> {
            self.calls.lock().unwrap().push(series_id.to_string());
            self.series
                .get(series_id)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("FRED fetch failed: 500"))
        }
    }

    fn service(source: FakeSource) -> TileDataService {
        TileDataService::new(Arc::new(catalogue()), Arc::new(source), FetchOptions::default())
    }

    #[tokio::test]
    async fn test_unknown_tile() {
        let err = service(FakeSource::default()).tile_data("nope").await.unwrap_err();
        assert!(matches!(err, TileDataError::UnknownTile));
    }

    #[tokio::test]
    async fn test_fred_multi_merges_by_date() {
        // generational-size-dependency-ratios: SPPOP1564TOZSUSA + SPPOPDPNDOLUSA
        let source = FakeSource::default()
            .with(
                "SPPOP1564TOZSUSA",
                &[("1984-01-01", Some(1.0)), ("1990-01-01", Some(66.0)), ("2000-01-01", None)],
            )
            .with("SPPOPDPNDOLUSA", &[("1990-01-01", Some(18.0)), ("1995-01-01", Some(19.0))]);
        let payload = service(source)
            .tile_data("generational-size-dependency-ratios")
            .await
            .unwrap();

        let dates: Vec<&str> = payload.data.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["1990-01-01", "1995-01-01"]);
        assert_eq!(payload.data[1].values.get("SPPOP1564TOZSUSA"), Some(&None));
        assert_eq!(payload.data[1].value("SPPOPDPNDOLUSA"), Some(19.0));
        assert_eq!(
            payload.series_keys().collect::<Vec<_>>(),
            vec!["SPPOP1564TOZSUSA", "SPPOPDPNDOLUSA"]
        );
    }

    #[tokio::test]
    async fn test_upstream_failure_surfaces() {
        let err = service(FakeSource::default())
            .tile_data("income-concentration-top")
            .await
            .unwrap_err();
        assert!(matches!(err, TileDataError::Upstream(_)));
        assert_eq!(err.to_string(), "FRED fetch failed: 500");
    }

    #[tokio::test]
    async fn test_wealth_distribution_keys() {
        let source = FakeSource::default()
            .with(DFA_BOTTOM50, &[("1989-07-01", Some(3.5))])
            .with(DFA_P50TO90, &[("1989-07-01", Some(35.0))])
            .with(DFA_P90TO99, &[("1989-07-01", Some(37.0))])
            .with(DFA_TOP1, &[("1989-07-01", Some(23.0))]);
        let payload = service(source).tile_data("wealth-distribution").await.unwrap();

        assert_eq!(payload.meta.units.as_deref(), Some("percent"));
        assert_eq!(payload.series_label("top1"), "T1");
        assert_eq!(payload.data.len(), 1);
        assert_eq!(payload.data[0].value("p50to90"), Some(35.0));
    }

    #[tokio::test]
    async fn test_top10_is_sum_when_both_known() {
        let source = FakeSource::default()
            .with(DFA_TOP1, &[("2000-01-01", Some(25.0)), ("2001-01-01", None)])
            .with(DFA_P90TO99, &[("2000-01-01", Some(40.0)), ("2001-01-01", Some(41.0))]);
        let payload = service(source)
            .tile_data("long-run-top-wealth-shares")
            .await
            .unwrap();

        assert_eq!(payload.data.len(), 1);
        assert_eq!(payload.data[0].value("top10"), Some(65.0));
    }

    #[tokio::test]
    async fn test_static_and_stub_tiles_skip_network() {
        let source = Arc::new(FakeSource::default());
        let svc = TileDataService::new(Arc::new(catalogue()), source.clone(), FetchOptions::default());

        let unrest = svc.tile_data("instability-unrest-events").await.unwrap();
        let stub = svc.tile_data("inheritance-intergenerational-transfers").await.unwrap();
        assert!(source.calls.lock().unwrap().is_empty());
        assert_eq!(unrest.data.len(), 7);
        assert_eq!(unrest.meta.units.as_deref(), Some("count"));
        assert!(stub.data.is_empty());
        assert!(stub.meta.series.is_empty());
    }
}
