// Tile and model catalogue definitions
use serde::{Deserialize, Serialize};

const FRED_SERIES_URL: &str = "https://fred.stlouisfed.org/series";
const DFA_TOP1_SERIES: &str = "WFRBST01108";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileSource {
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Explicit link to the upstream dataset page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FredSeriesRef {
    pub id: String,
    pub label: String,
}

/// How a tile's data is obtained. The tag mirrors the `kind` field of the
/// catalogue file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FetchDescriptor {
    WealthDistribution,
    FredMulti { series: Vec<FredSeriesRef> },
    LongRunTopWealthShares,
    ScfWealthByCohort,
    GssInstitutionalTrust,
    TurningTimelineOverlay,
    AbsoluteMobility,
    Polarization,
    Unrest,
    ViolenceWar,
    Stub,
    None,
}

impl FetchDescriptor {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchDescriptor::WealthDistribution => "wealth-distribution",
            FetchDescriptor::FredMulti { .. } => "fred-multi",
            FetchDescriptor::LongRunTopWealthShares => "long-run-top-wealth-shares",
            FetchDescriptor::ScfWealthByCohort => "scf-wealth-by-cohort",
            FetchDescriptor::GssInstitutionalTrust => "gss-institutional-trust",
            FetchDescriptor::TurningTimelineOverlay => "turning-timeline-overlay",
            FetchDescriptor::AbsoluteMobility => "absolute-mobility",
            FetchDescriptor::Polarization => "polarization",
            FetchDescriptor::Unrest => "unrest",
            FetchDescriptor::ViolenceWar => "violence-war",
            FetchDescriptor::Stub => "stub",
            FetchDescriptor::None => "none",
        }
    }

    /// Whether the canvas has to go to the network for this tile.
    pub fn requires_data(&self) -> bool {
        !matches!(self, FetchDescriptor::None)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileDef {
    pub id: String,
    pub label: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_story: Option<String>,
    pub source: TileSource,
    pub fetch: FetchDescriptor,
}

impl TileDef {
    /// Link to the upstream data: explicit source URL first, then the first
    /// FRED series of a multi-series tile.
    pub fn source_url(&self) -> Option<String> {
        if let Some(url) = &self.source.url {
            return Some(url.clone());
        }
        match &self.fetch {
            FetchDescriptor::FredMulti { series } => series
                .first()
                .map(|s| format!("{}/{}", FRED_SERIES_URL, s.id)),
            FetchDescriptor::WealthDistribution => {
                Some(format!("{}/{}", FRED_SERIES_URL, DFA_TOP1_SERIES))
            }
            _ => None,
        }
    }

    /// Text for the per-track info panel
    pub fn info_text(&self) -> &str {
        self.chart_story.as_deref().unwrap_or(&self.description)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryModel {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Ordered tile ids exposed by this model
    pub tiles: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(fetch: FetchDescriptor, url: Option<&str>) -> TileDef {
        TileDef {
            id: "t".to_string(),
            label: "T".to_string(),
            description: "desc".to_string(),
            chart_story: None,
            source: TileSource {
                provider: "p".to_string(),
                dataset: None,
                access: None,
                notes: None,
                url: url.map(str::to_string),
            },
            fetch,
        }
    }

    #[test]
    fn test_source_url_prefers_explicit_url() {
        let t = tile(
            FetchDescriptor::FredMulti {
                series: vec![FredSeriesRef { id: "GDP".into(), label: "GDP".into() }],
            },
            Some("https://example.org/data"),
        );
        assert_eq!(t.source_url().as_deref(), Some("https://example.org/data"));
    }

    #[test]
    fn test_source_url_from_first_fred_series() {
        let t = tile(
            FetchDescriptor::FredMulti {
                series: vec![
                    FredSeriesRef { id: "GPDI".into(), label: "GPDI".into() },
                    FredSeriesRef { id: "GDP".into(), label: "GDP".into() },
                ],
            },
            None,
        );
        assert_eq!(
            t.source_url().as_deref(),
            Some("https://fred.stlouisfed.org/series/GPDI")
        );
    }

    #[test]
    fn test_source_url_absent_for_static_tables() {
        assert_eq!(tile(FetchDescriptor::Unrest, None).source_url(), None);
        assert_eq!(
            tile(FetchDescriptor::FredMulti { series: vec![] }, None).source_url(),
            None
        );
    }

    #[test]
    fn test_fetch_descriptor_from_toml() {
        let t: TileDef = toml::from_str(
            r#"
            id = "x"
            label = "X"
            description = "d"
            source = { provider = "FRED" }
            [fetch]
            kind = "fred-multi"
            series = [{ id = "UNRATE", label = "Unemployment %" }]
            "#,
        )
        .unwrap();
        assert_eq!(t.fetch.kind(), "fred-multi");
        assert!(t.fetch.requires_data());

        let none: FetchDescriptor = toml::from_str(r#"kind = "none""#).unwrap();
        assert!(!none.requires_data());
    }
}
