// Timeline canvas - Shared time domain, per-tile data states and the cursor overlay
use crate::application::registry::Registry;
use crate::domain::format::format_tooltip_value;
use crate::domain::payload::TileDataPayload;
use crate::domain::time_scale::{format_for_status, LinearScale, TimeDomain};
use crate::domain::workspace::Track;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub const SERIES_COLORS: [&str; 4] = ["#4f7cff", "#f97316", "#22c55e", "#a855f7"];

/// Gap between the pointer and the tooltip box, in pixels
pub const TOOLTIP_OFFSET: f64 = 16.0;

pub fn series_color(index: usize) -> &'static str {
    SERIES_COLORS[index % SERIES_COLORS.len()]
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TileFetchError {
    #[error("tile data request failed with status {0}")]
    Status(u16),
    #[error("tile data request failed: {0}")]
    Transport(String),
}

/// Per-tile data lifecycle: `Loading -> Ok | Error`
#[derive(Debug, Clone, PartialEq)]
pub enum TileDataState {
    Loading,
    Ok(TileDataPayload),
    Error,
}

/// What a track's chart slot shows
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackChart<'a> {
    /// Tile has no data source at all
    NotAvailable,
    Loading,
    Unavailable,
    Empty,
    Data(&'a TileDataPayload),
}

impl TrackChart<'_> {
    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            TrackChart::NotAvailable => Some("Data not yet available"),
            TrackChart::Loading => Some("Loading data…"),
            TrackChart::Unavailable => Some("Data unavailable"),
            TrackChart::Empty => Some("No data yet"),
            TrackChart::Data(_) => None,
        }
    }
}

/// Horizontal geometry of the shared chart column
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChartArea {
    /// Left edge in client (viewport) coordinates
    pub client_left: f64,
    pub width: f64,
    /// Left edge relative to the canvas container
    pub offset_left: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    /// Hairline position relative to the canvas container
    pub left_px: f64,
    pub instant_ms: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TooltipPlacement {
    pub on_left: bool,
    pub above: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TooltipEntry {
    pub label: String,
    pub value: String,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub heading: String,
    pub entries: Vec<TooltipEntry>,
    pub left: f64,
    pub top: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Size {
    width: f64,
    height: f64,
}

/// Explicit state container for the canvas. Every change goes through one
/// of the event methods below; nothing else mutates it.
#[derive(Debug, Clone)]
pub struct CanvasState {
    registry: Arc<Registry>,
    domain: TimeDomain,
    tracks: Vec<Track>,
    data_by_tile: HashMap<String, TileDataState>,
    started: HashSet<String>,
    chart_area: ChartArea,
    pending_client_x: Option<f64>,
    frame_requested: bool,
    pointer: (f64, f64),
    cursor: Option<Cursor>,
    is_hovering: bool,
    hovered_track: Option<String>,
    hovering_buttons: bool,
    info_track: Option<String>,
    viewport: Size,
    tooltip_size: Size,
    placement: TooltipPlacement,
}

impl CanvasState {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_domain(registry, TimeDomain::default())
    }

    pub fn with_domain(registry: Arc<Registry>, domain: TimeDomain) -> Self {
        Self {
            registry,
            domain,
            tracks: Vec::new(),
            data_by_tile: HashMap::new(),
            started: HashSet::new(),
            chart_area: ChartArea::default(),
            pending_client_x: None,
            frame_requested: false,
            pointer: (0.0, 0.0),
            cursor: None,
            is_hovering: false,
            hovered_track: None,
            hovering_buttons: false,
            info_track: None,
            viewport: Size {
                width: f64::INFINITY,
                height: f64::INFINITY,
            },
            tooltip_size: Size {
                width: 0.0,
                height: 0.0,
            },
            placement: TooltipPlacement::default(),
        }
    }

    pub fn domain(&self) -> TimeDomain {
        self.domain
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn data_state(&self, tile_id: &str) -> Option<&TileDataState> {
        self.data_by_tile.get(tile_id)
    }

    pub fn is_started(&self, tile_id: &str) -> bool {
        self.started.contains(tile_id)
    }

    pub fn chart_area(&self) -> ChartArea {
        self.chart_area
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }

    pub fn is_hovering(&self) -> bool {
        self.is_hovering
    }

    pub fn hovered_track(&self) -> Option<&str> {
        self.hovered_track.as_deref()
    }

    pub fn placement(&self) -> TooltipPlacement {
        self.placement
    }

    /// Unknown tiles are fetched too; the endpoint answers 404 and the track
    /// ends up `Error`.
    fn is_fetchable(&self, tile_id: &str) -> bool {
        self.registry
            .tile(tile_id)
            .map(|t| t.fetch.requires_data())
            .unwrap_or(true)
    }

    /// Replace the visible track list. Returns the tile ids whose fetch must
    /// start now; each is already marked `Loading` and recorded as started.
    pub fn sync_tracks(&mut self, tracks: &[Track]) -> Vec<String> {
        self.tracks = tracks.to_vec();

        let fetchable: HashSet<String> = self
            .tracks
            .iter()
            .filter(|t| self.is_fetchable(&t.tile_id))
            .map(|t| t.tile_id.clone())
            .collect();

        self.started.retain(|id| fetchable.contains(id));

        let mut to_start = Vec::new();
        for track in &self.tracks {
            let id = &track.tile_id;
            if fetchable.contains(id) && self.started.insert(id.clone()) {
                self.data_by_tile.insert(id.clone(), TileDataState::Loading);
                to_start.push(id.clone());
            }
        }

        if self
            .hovered_track
            .as_ref()
            .is_some_and(|h| !self.tracks.iter().any(|t| &t.id == h))
        {
            self.hovered_track = None;
        }
        if self
            .info_track
            .as_ref()
            .is_some_and(|h| !self.tracks.iter().any(|t| &t.id == h))
        {
            self.info_track = None;
        }
        self.update_placement();

        if !to_start.is_empty() {
            tracing::debug!("Canvas starting fetches for {:?}", to_start);
        }
        to_start
    }

    /// Record a completed fetch. Late results for tiles that are no longer
    /// visible are stored but not rendered.
    pub fn apply_fetch_result(&mut self, tile_id: &str, result: Result<TileDataPayload, TileFetchError>) {
        let state = match result {
            Ok(payload) => TileDataState::Ok(payload),
            Err(e) => {
                tracing::warn!("Tile {} unavailable: {}", tile_id, e);
                TileDataState::Error
            }
        };
        self.data_by_tile.insert(tile_id.to_string(), state);
        self.update_placement();
    }

    pub fn track_chart(&self, track: &Track) -> TrackChart<'_> {
        if !self.is_fetchable(&track.tile_id) {
            return TrackChart::NotAvailable;
        }
        match self.data_by_tile.get(&track.tile_id) {
            None | Some(TileDataState::Loading) => TrackChart::Loading,
            Some(TileDataState::Error) => TrackChart::Unavailable,
            Some(TileDataState::Ok(p)) if p.data.is_empty() => TrackChart::Empty,
            Some(TileDataState::Ok(p)) => TrackChart::Data(p),
        }
    }

    pub fn set_chart_area(&mut self, area: ChartArea) {
        self.chart_area = area;
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = Size { width, height };
        self.update_placement();
    }

    /// Rendered size of the tooltip box
    pub fn measure_tooltip(&mut self, width: f64, height: f64) {
        self.tooltip_size = Size { width, height };
        self.update_placement();
    }

    /// Pointer moved over the canvas. Only the latest x is kept until the next
    /// frame; returns true when the caller must request an animation frame.
    pub fn pointer_move(&mut self, client_x: f64, client_y: f64) -> bool {
        self.pending_client_x = Some(client_x);
        self.pointer = (client_x, client_y);
        self.is_hovering = true;
        self.update_placement();

        if self.frame_requested {
            return false;
        }
        self.frame_requested = true;
        true
    }

    /// Consume the pending pointer position and resolve the cursor.
    pub fn animation_frame(&mut self) {
        self.frame_requested = false;
        let Some(client_x) = self.pending_client_x.take() else {
            return;
        };

        let area = self.chart_area;
        let chart_x = client_x - area.client_left;
        if chart_x < 0.0 || chart_x > area.width {
            self.cursor = None;
            self.is_hovering = false;
        } else {
            let scale = LinearScale::for_domain(self.domain, 0.0, area.width);
            self.cursor = Some(Cursor {
                left_px: area.offset_left + chart_x,
                instant_ms: scale.to_instant(chart_x),
            });
            self.is_hovering = true;
        }
        self.update_placement();
    }

    pub fn pointer_leave(&mut self) {
        self.pending_client_x = None;
        self.frame_requested = false;
        self.cursor = None;
        self.is_hovering = false;
        self.hovered_track = None;
        self.update_placement();
    }

    /// Pointer entered (`Some`) or left (`None`) a track row.
    pub fn hover_track(&mut self, track_id: Option<&str>) {
        self.hovered_track = track_id.map(str::to_string);
        self.update_placement();
    }

    pub fn set_hovering_buttons(&mut self, hovering: bool) {
        self.hovering_buttons = hovering;
        self.update_placement();
    }

    pub fn toggle_info(&mut self, track_id: &str) {
        if self.info_track.as_deref() == Some(track_id) {
            self.info_track = None;
        } else {
            self.info_track = Some(track_id.to_string());
        }
    }

    /// Explanation shown for the track whose info panel is open
    pub fn info_text(&self, track_id: &str) -> Option<&str> {
        if self.info_track.as_deref() != Some(track_id) {
            return None;
        }
        let track = self.tracks.iter().find(|t| t.id == track_id)?;
        Some(
            self.registry
                .tile(&track.tile_id)
                .map(|tile| tile.info_text())
                .unwrap_or("What this chart shows."),
        )
    }

    fn hovered_payload(&self) -> Option<&TileDataPayload> {
        let hovered = self.hovered_track.as_deref()?;
        let track = self.tracks.iter().find(|t| t.id == hovered)?;
        match self.data_by_tile.get(&track.tile_id)? {
            TileDataState::Ok(payload) => Some(payload),
            _ => None,
        }
    }

    /// The tooltip only shows inside the hovered track's observed date span.
    pub fn tooltip_visible(&self) -> bool {
        if self.hovering_buttons || !self.is_hovering {
            return false;
        }
        let (Some(cursor), Some(payload)) = (self.cursor, self.hovered_payload()) else {
            return false;
        };
        match payload.date_span() {
            Some((min, max)) => cursor.instant_ms >= min as f64 && cursor.instant_ms <= max as f64,
            None => false,
        }
    }

    fn update_placement(&mut self) {
        if !self.tooltip_visible() {
            self.placement = TooltipPlacement::default();
            return;
        }
        let (x, y) = self.pointer;
        self.placement = TooltipPlacement {
            on_left: x + TOOLTIP_OFFSET + self.tooltip_size.width > self.viewport.width,
            above: y + TOOLTIP_OFFSET + self.tooltip_size.height > self.viewport.height,
        };
    }

    /// Nearest recorded value per series at the cursor. Series without a
    /// value are left out; no tooltip when none has one.
    pub fn tooltip(&self) -> Option<Tooltip> {
        if !self.tooltip_visible() {
            return None;
        }
        let cursor = self.cursor?;
        let payload = self.hovered_payload()?;
        let values = payload.nearest_values(cursor.instant_ms);
        let units = payload.meta.units.as_deref();

        let entries: Vec<TooltipEntry> = payload
            .series_keys()
            .enumerate()
            .filter_map(|(i, key)| {
                let value = values.get(key).copied().flatten()?;
                Some(TooltipEntry {
                    label: payload.series_label(key).to_string(),
                    value: format_tooltip_value(value, units),
                    color: series_color(i),
                })
            })
            .collect();
        if entries.is_empty() {
            return None;
        }

        let (x, y) = self.pointer;
        let Size { width, height } = self.tooltip_size;
        Some(Tooltip {
            heading: format_for_status(cursor.instant_ms),
            entries,
            left: if self.placement.on_left {
                x - TOOLTIP_OFFSET - width
            } else {
                x + TOOLTIP_OFFSET
            },
            top: if self.placement.above {
                y - TOOLTIP_OFFSET - height
            } else {
                y + TOOLTIP_OFFSET
            },
        })
    }

    /// `YYYY-Qn` under the pointer while hovering
    pub fn status_text(&self) -> Option<String> {
        match (self.is_hovering, self.cursor) {
            (true, Some(c)) => Some(format_for_status(c.instant_ms)),
            _ => None,
        }
    }

    pub fn hairline_left(&self) -> Option<f64> {
        if self.is_hovering {
            self.cursor.map(|c| c.left_px)
        } else {
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::application::registry::tests::catalogue;
    use crate::domain::payload::{TileDataMeta, TileDataRow};
    use crate::domain::time_scale::parse_date;
    use pretty_assertions::assert_eq;

    pub(crate) fn track(tile_id: &str) -> Track {
        Track {
            id: format!("track-{}", tile_id),
            model_id: "m".to_string(),
            model_name: "Model".to_string(),
            tile_id: tile_id.to_string(),
            tile_name: tile_id.to_string(),
        }
    }

    pub(crate) fn sample_payload() -> TileDataPayload {
        TileDataPayload {
            meta: TileDataMeta {
                units: Some("$".to_string()),
                frequency: None,
                series: [("v", "Value"), ("w", "Other")]
                    .iter()
                    .map(|(k, l)| (k.to_string(), l.to_string()))
                    .collect(),
            },
            data: vec![
                TileDataRow::new("2000-01-01").with("v", Some(1234567.0)).with("w", None),
                TileDataRow::new("2010-01-01").with("v", Some(10.0)).with("w", None),
            ],
        }
    }

    /// Chart column spans client x 100..1100 and the domain is 1985..2025.
    fn canvas_with(tile: &str, result: Result<TileDataPayload, TileFetchError>) -> CanvasState {
        let mut canvas = CanvasState::new(Arc::new(catalogue()));
        canvas.set_chart_area(ChartArea {
            client_left: 100.0,
            width: 1000.0,
            offset_left: 90.0,
        });
        canvas.set_viewport(1400.0, 900.0);
        canvas.sync_tracks(&[track(tile)]);
        canvas.apply_fetch_result(tile, result);
        canvas
    }

    fn x_for(canvas: &CanvasState, date: &str) -> f64 {
        let area = canvas.chart_area();
        LinearScale::for_domain(canvas.domain(), 0.0, area.width).to_pixel(parse_date(date) as f64)
            + area.client_left
    }

    fn hover_at(canvas: &mut CanvasState, tile: &str, date: &str) {
        let x = x_for(canvas, date);
        canvas.pointer_move(x, 300.0);
        canvas.animation_frame();
        canvas.hover_track(Some(&format!("track-{}", tile)));
    }

    #[test]
    fn test_each_tile_fetched_once_while_visible() {
        let mut canvas = CanvasState::new(Arc::new(catalogue()));
        let tiles = [track("wealth-distribution"), track("income-concentration-top")];

        assert_eq!(
            canvas.sync_tracks(&tiles),
            vec!["wealth-distribution", "income-concentration-top"]
        );
        assert!(canvas.sync_tracks(&tiles).is_empty());
        assert_eq!(
            canvas.data_state("wealth-distribution"),
            Some(&TileDataState::Loading)
        );
    }

    #[test]
    fn test_readding_failed_tile_fetches_again() {
        let mut canvas = CanvasState::new(Arc::new(catalogue()));
        let t = track("income-concentration-top");

        assert_eq!(canvas.sync_tracks(&[t.clone()]).len(), 1);
        canvas.apply_fetch_result("income-concentration-top", Err(TileFetchError::Status(502)));
        assert!(canvas.sync_tracks(&[t.clone()]).is_empty());
        assert_eq!(canvas.track_chart(&t).placeholder(), Some("Data unavailable"));

        canvas.sync_tracks(&[]);
        assert!(!canvas.is_started("income-concentration-top"));
        assert_eq!(canvas.sync_tracks(&[t.clone()]), vec!["income-concentration-top"]);
        assert_eq!(canvas.track_chart(&t), TrackChart::Loading);
    }

    #[test]
    fn test_unknown_tiles_are_fetched() {
        let mut canvas = CanvasState::new(Arc::new(catalogue()));
        assert_eq!(canvas.sync_tracks(&[track("not-in-catalogue")]), vec!["not-in-catalogue"]);
    }

    #[test]
    fn test_tiles_without_source_are_not_fetched() {
        let registry = Registry::from_toml_str(
            r#"
            [[tiles]]
            id = "placeholder"
            label = "Placeholder"
            description = "Not wired up"
            source = { provider = "none" }
            fetch = { kind = "none" }
            "#,
        )
        .unwrap();
        let mut canvas = CanvasState::new(Arc::new(registry));
        let t = track("placeholder");

        assert!(canvas.sync_tracks(&[t.clone()]).is_empty());
        assert_eq!(canvas.track_chart(&t), TrackChart::NotAvailable);
        assert_eq!(canvas.track_chart(&t).placeholder(), Some("Data not yet available"));
    }

    #[test]
    fn test_placeholders() {
        let mut canvas = CanvasState::new(Arc::new(catalogue()));
        let stub = track("inheritance-intergenerational-transfers");
        canvas.sync_tracks(&[stub.clone()]);
        assert_eq!(canvas.track_chart(&stub).placeholder(), Some("Loading data…"));

        canvas.apply_fetch_result(&stub.tile_id, Ok(TileDataPayload::empty()));
        assert_eq!(canvas.track_chart(&stub).placeholder(), Some("No data yet"));
    }

    #[test]
    fn test_pointer_moves_coalesce_per_frame() {
        let mut canvas = canvas_with("wealth-distribution", Ok(sample_payload()));

        assert!(canvas.pointer_move(200.0, 10.0));
        assert!(!canvas.pointer_move(300.0, 10.0));
        assert!(!canvas.pointer_move(600.0, 10.0));
        assert!(canvas.cursor().is_none());

        canvas.animation_frame();
        let cursor = canvas.cursor().unwrap();
        assert_eq!(cursor.left_px, 590.0);
        assert!(canvas.pointer_move(610.0, 10.0));
    }

    #[test]
    fn test_pointer_outside_chart_column_clears_cursor() {
        let mut canvas = canvas_with("wealth-distribution", Ok(sample_payload()));
        canvas.pointer_move(50.0, 10.0);
        canvas.animation_frame();
        assert!(canvas.cursor().is_none());
        assert!(!canvas.is_hovering());
        assert_eq!(canvas.status_text(), None);
    }

    #[test]
    fn test_tooltip_suppressed_outside_data_span() {
        let tile = "wealth-distribution";
        let mut canvas = canvas_with(tile, Ok(sample_payload()));

        hover_at(&mut canvas, tile, "1990-01-01");
        assert!(canvas.is_hovering());
        assert!(!canvas.tooltip_visible());

        hover_at(&mut canvas, tile, "2020-01-01");
        assert!(!canvas.tooltip_visible());

        hover_at(&mut canvas, tile, "2004-06-01");
        assert!(canvas.tooltip_visible());
        assert_eq!(canvas.status_text().as_deref(), Some("2004-Q2"));
    }

    #[test]
    fn test_tooltip_lists_nearest_values_with_values_only() {
        let tile = "wealth-distribution";
        let mut canvas = canvas_with(tile, Ok(sample_payload()));
        hover_at(&mut canvas, tile, "2002-01-01");

        let tooltip = canvas.tooltip().unwrap();
        assert_eq!(
            tooltip.entries,
            vec![TooltipEntry {
                label: "Value".to_string(),
                value: "$1,234,567".to_string(),
                color: "#4f7cff",
            }]
        );
    }

    #[test]
    fn test_tooltip_hidden_over_buttons_and_on_error() {
        let tile = "wealth-distribution";
        let mut canvas = canvas_with(tile, Ok(sample_payload()));
        hover_at(&mut canvas, tile, "2004-06-01");
        canvas.set_hovering_buttons(true);
        assert!(canvas.tooltip().is_none());

        let mut failed = canvas_with(tile, Err(TileFetchError::Transport("reset".into())));
        hover_at(&mut failed, tile, "2004-06-01");
        assert!(!failed.tooltip_visible());
    }

    #[test]
    fn test_tooltip_flips_near_viewport_edges() {
        let tile = "wealth-distribution";
        let mut canvas = canvas_with(tile, Ok(sample_payload()));
        canvas.measure_tooltip(200.0, 120.0);
        hover_at(&mut canvas, tile, "2004-06-01");
        assert_eq!(canvas.placement(), TooltipPlacement::default());

        canvas.set_viewport(x_for(&canvas, "2004-06-01") + 100.0, 350.0);
        assert_eq!(
            canvas.placement(),
            TooltipPlacement {
                on_left: true,
                above: true
            }
        );
        let tooltip = canvas.tooltip().unwrap();
        assert_eq!(tooltip.top, 300.0 - 16.0 - 120.0);
    }

    #[test]
    fn test_pointer_leave_resets_hover() {
        let tile = "wealth-distribution";
        let mut canvas = canvas_with(tile, Ok(sample_payload()));
        hover_at(&mut canvas, tile, "2004-06-01");
        canvas.pointer_leave();
        assert!(canvas.hovered_track().is_none());
        assert!(canvas.hairline_left().is_none());
        assert!(!canvas.tooltip_visible());
    }

    #[test]
    fn test_info_panel_toggles() {
        let tile = "wealth-distribution";
        let mut canvas = canvas_with(tile, Ok(sample_payload()));
        let id = format!("track-{}", tile);
        assert!(canvas.info_text(&id).is_none());
        canvas.toggle_info(&id);
        assert!(canvas.info_text(&id).is_some());
        canvas.toggle_info(&id);
        assert!(canvas.info_text(&id).is_none());
    }
}
