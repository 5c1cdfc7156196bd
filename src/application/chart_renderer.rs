// Chart renderer - Draws the canvas state as a standalone SVG document
use crate::application::canvas::{series_color, CanvasState, ChartArea, TrackChart};
use crate::domain::format::format_axis_label;
use crate::domain::payload::TileDataPayload;
use crate::domain::time_scale::{decade_ticks, parse_date, year_of, LinearScale, TimeDomain};

// Per-track chart viewBox
const VIEWBOX_WIDTH: f64 = 100.0;
const CHART_HEIGHT: f64 = 160.0;
const CHART_PADDING: f64 = 8.0;
const VIEWBOX_X_PADDING: f64 = 4.0;
const GRID_FRACTIONS: [f64; 3] = [0.25, 0.5, 0.75];

// Canvas layout, in pixels
const LEGEND_WIDTH: f64 = 72.0;
const SIDE_PADDING: f64 = 16.0;
const TIMELINE_HEIGHT: f64 = 32.0;
const TRACK_HEADER_HEIGHT: f64 = 28.0;
const INFO_PANEL_HEIGHT: f64 = 40.0;
const LEGEND_ROW_HEIGHT: f64 = 24.0;
const TRACK_PADDING: f64 = 16.0;
const STATUS_BAR_HEIGHT: f64 = 28.0;
const EMPTY_CANVAS_HEIGHT: f64 = 200.0;
const TOOLTIP_WIDTH: f64 = 180.0;
const TOOLTIP_ROW_HEIGHT: f64 = 18.0;

pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Geometry of the shared chart column for a canvas `width` pixels wide.
pub fn chart_area_for_width(width: f64) -> ChartArea {
    let left = SIDE_PADDING + LEGEND_WIDTH;
    ChartArea {
        client_left: left,
        width: (width - left - SIDE_PADDING).max(1.0),
        offset_left: left,
    }
}

/// Rough tooltip box size so placement can be resolved server side.
pub fn estimated_tooltip_size(entry_count: usize) -> (f64, f64) {
    (TOOLTIP_WIDTH, 28.0 + entry_count as f64 * TOOLTIP_ROW_HEIGHT)
}

/// Vertical map for one track: min at the bottom of the plot, max at the top.
fn y_for(value: f64, (min, max): (f64, f64)) -> f64 {
    CHART_PADDING + CHART_HEIGHT - ((value - min) / (max - min)) * CHART_HEIGHT
}

fn series_points(payload: &TileDataPayload, key: &str, x_scale: &LinearScale, range: (f64, f64)) -> Vec<(f64, f64)> {
    payload
        .data
        .iter()
        .filter_map(|row| {
            let v = row.value(key)?;
            Some((x_scale.to_pixel(parse_date(&row.date) as f64), y_for(v, range)))
        })
        .collect()
}

fn area_path(points: &[(f64, f64)]) -> Option<String> {
    if points.len() < 2 {
        return None;
    }
    let bottom = CHART_PADDING + CHART_HEIGHT;
    let (first_x, _) = points[0];
    let (last_x, _) = points[points.len() - 1];
    let mut d = format!("M {:.3},{}", first_x, bottom);
    for (x, y) in points {
        d.push_str(&format!(" L {:.3},{:.3}", x, y));
    }
    d.push_str(&format!(" L {:.3},{} Z", last_x, bottom));
    Some(d)
}

/// Chart body for one payload inside a `0 0 100 176` viewBox: gradients,
/// gridlines, one filled area and one polyline per series.
pub fn render_chart(payload: &TileDataPayload, domain: TimeDomain, chart_id: &str) -> String {
    let x_scale = LinearScale::for_domain(domain, VIEWBOX_X_PADDING, VIEWBOX_WIDTH - VIEWBOX_X_PADDING);
    let range = payload.value_range();
    let keys: Vec<&str> = payload.series_keys().collect();
    let mut svg = String::new();

    svg.push_str("<defs>");
    for (i, _) in keys.iter().enumerate() {
        svg.push_str(&format!(
            r#"<linearGradient id="{id}-grad-{i}" x1="0" y1="{top}" x2="0" y2="{bottom}" gradientUnits="userSpaceOnUse"><stop offset="0%" stop-color="{c}" stop-opacity="0.18"/><stop offset="100%" stop-color="{c}" stop-opacity="0"/></linearGradient>"#,
            id = chart_id,
            i = i,
            top = CHART_PADDING,
            bottom = CHART_PADDING + CHART_HEIGHT,
            c = series_color(i),
        ));
    }
    svg.push_str("</defs>");

    for frac in GRID_FRACTIONS {
        let y = CHART_PADDING + frac * CHART_HEIGHT;
        svg.push_str(&format!(
            r#"<line x1="0" y1="{y}" x2="{w}" y2="{y}" stroke="rgba(255,255,255,0.05)" stroke-width="0.4" vector-effect="non-scaling-stroke"/>"#,
            y = y,
            w = VIEWBOX_WIDTH,
        ));
    }

    let all_points: Vec<Vec<(f64, f64)>> = keys
        .iter()
        .map(|key| series_points(payload, key, &x_scale, range))
        .collect();

    for (i, points) in all_points.iter().enumerate() {
        if let Some(d) = area_path(points) {
            svg.push_str(&format!(r#"<path d="{}" fill="url(#{}-grad-{})"/>"#, d, chart_id, i));
        }
    }
    for (i, points) in all_points.iter().enumerate() {
        let pts: Vec<String> = points.iter().map(|(x, y)| format!("{:.3},{:.3}", x, y)).collect();
        svg.push_str(&format!(
            r#"<polyline fill="none" stroke="{}" stroke-width="1.5" points="{}" vector-effect="non-scaling-stroke" stroke-linejoin="round" stroke-linecap="round"/>"#,
            series_color(i),
            pts.join(" ")
        ));
    }
    svg
}

fn text(x: f64, y: f64, size: u32, fill: &str, anchor: &str, body: &str) -> String {
    format!(
        r#"<text x="{:.1}" y="{:.1}" font-size="{}" fill="{}" text-anchor="{}">{}</text>"#,
        x,
        y,
        size,
        fill,
        anchor,
        escape_xml(body)
    )
}

fn render_timeline(state: &CanvasState, area: ChartArea) -> String {
    let scale = LinearScale::for_domain(state.domain(), 0.0, area.width);
    let mut svg = text(SIDE_PADDING, TIMELINE_HEIGHT - 10.0, 10, "#6b7280", "start", "YEAR");
    for tick in decade_ticks(state.domain()) {
        let x = area.offset_left + scale.to_pixel(tick as f64);
        svg.push_str(&text(x, TIMELINE_HEIGHT - 10.0, 10, "#9ca3af", "middle", &year_of(tick).to_string()));
    }
    svg
}

fn track_height(state: &CanvasState, track_id: &str) -> f64 {
    let info = if state.info_text(track_id).is_some() {
        INFO_PANEL_HEIGHT
    } else {
        0.0
    };
    TRACK_PADDING * 2.0 + TRACK_HEADER_HEIGHT + info + CHART_HEIGHT + LEGEND_ROW_HEIGHT
}

fn render_placeholder(area: ChartArea, top: f64, message: &str) -> String {
    format!(
        r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{}" rx="4" fill="rgba(255,255,255,0.02)" stroke="rgba(255,255,255,0.08)"/>{}"#,
        area.offset_left,
        top,
        area.width,
        CHART_HEIGHT,
        text(
            area.offset_left + area.width / 2.0,
            top + CHART_HEIGHT / 2.0,
            13,
            "#9ca3af",
            "middle",
            message
        )
    )
}

fn render_data_chart(payload: &TileDataPayload, state: &CanvasState, area: ChartArea, top: f64, chart_id: &str) -> String {
    let (min, max) = payload.value_range();
    let units = payload.meta.units.as_deref();
    let label_x = area.offset_left - 8.0;
    let mut svg = String::new();

    svg.push_str(&text(label_x, top + CHART_PADDING + 4.0, 10, "#9ca3af", "end", &format_axis_label(max, units)));
    svg.push_str(&text(
        label_x,
        top + CHART_HEIGHT - CHART_PADDING + 4.0,
        10,
        "#9ca3af",
        "end",
        &format_axis_label(min, units),
    ));

    svg.push_str(&format!(
        r#"<svg x="{:.1}" y="{:.1}" width="{:.1}" height="{}" viewBox="0 0 {} {}" preserveAspectRatio="none" overflow="visible">{}</svg>"#,
        area.offset_left,
        top,
        area.width,
        CHART_HEIGHT,
        VIEWBOX_WIDTH,
        CHART_PADDING * 2.0 + CHART_HEIGHT,
        render_chart(payload, state.domain(), chart_id)
    ));

    let legend_y = top + CHART_HEIGHT + 16.0;
    let mut x = area.offset_left;
    for (i, key) in payload.series_keys().enumerate() {
        let label = payload.series_label(key);
        svg.push_str(&format!(
            r#"<rect x="{:.1}" y="{:.1}" width="10" height="10" rx="2" fill="{}"/>"#,
            x,
            legend_y - 9.0,
            series_color(i)
        ));
        svg.push_str(&text(x + 16.0, legend_y, 11, "#9ca3af", "start", label));
        x += 28.0 + label.chars().count() as f64 * 6.0;
    }
    svg
}

fn render_tooltip(state: &CanvasState) -> String {
    let Some(tooltip) = state.tooltip() else {
        return String::new();
    };
    let (w, h) = estimated_tooltip_size(tooltip.entries.len());
    let mut svg = format!(
        r##"<g class="tooltip" transform="translate({:.1},{:.1})"><rect width="{}" height="{}" rx="6" fill="#1f2937" stroke="rgba(255,255,255,0.12)"/>"##,
        tooltip.left, tooltip.top, w, h
    );
    svg.push_str(&text(10.0, 18.0, 11, "#9ca3af", "start", &tooltip.heading));
    for (i, entry) in tooltip.entries.iter().enumerate() {
        let y = 18.0 + (i + 1) as f64 * TOOLTIP_ROW_HEIGHT;
        svg.push_str(&format!(
            r#"<rect x="10" y="{:.1}" width="8" height="8" rx="2" fill="{}"/>"#,
            y - 8.0,
            entry.color
        ));
        svg.push_str(&text(24.0, y, 12, "#9ca3af", "start", &entry.label));
        svg.push_str(&text(w - 10.0, y, 12, "#f3f4f6", "end", &entry.value));
    }
    svg.push_str("</g>");
    svg
}

fn render_status_bar(state: &CanvasState, width: f64, top: f64) -> String {
    let baseline = top + STATUS_BAR_HEIGHT / 2.0 + 4.0;
    let mut svg = text(SIDE_PADDING, baseline, 12, "#6b7280", "start", "Ready");
    if let Some(status) = state.status_text() {
        svg.push_str(&text(width - SIDE_PADDING, baseline, 12, "#9ca3af", "end", &status));
    }
    svg
}

/// Whole canvas: year axis, one stacked chart per track, cursor hairline,
/// tooltip and status bar.
pub fn render_canvas(state: &CanvasState, width: f64) -> String {
    let area = state.chart_area();
    let tracks = state.tracks();

    let body_height = if tracks.is_empty() {
        EMPTY_CANVAS_HEIGHT
    } else {
        TIMELINE_HEIGHT + tracks.iter().map(|t| track_height(state, &t.id)).sum::<f64>()
    };
    let height = body_height + STATUS_BAR_HEIGHT;

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="ui-sans-serif, system-ui">"#,
        w = width,
        h = height
    );
    svg.push_str(&format!(r##"<rect width="{}" height="{}" fill="#0b0d12"/>"##, width, height));

    if tracks.is_empty() {
        svg.push_str(&text(
            width / 2.0,
            EMPTY_CANVAS_HEIGHT / 2.0,
            13,
            "#9ca3af",
            "middle",
            "No tracks yet. Add data from a model.",
        ));
    } else {
        svg.push_str(&render_timeline(state, area));

        let mut top = TIMELINE_HEIGHT;
        for (i, track) in tracks.iter().enumerate() {
            let block = track_height(state, &track.id);
            if state.hovered_track() == Some(track.id.as_str()) {
                svg.push_str(&format!(
                    r#"<rect y="{:.1}" width="{}" height="{:.1}" fill="rgba(255,255,255,0.015)"/>"#,
                    top, width, block
                ));
            }

            let mut y = top + TRACK_PADDING;
            svg.push_str(&text(SIDE_PADDING, y + 14.0, 13, "#f3f4f6", "start", &track.tile_name));
            svg.push_str(&text(
                SIDE_PADDING + 8.0 + track.tile_name.chars().count() as f64 * 7.0,
                y + 14.0,
                11,
                "#6b7280",
                "start",
                &track.model_name,
            ));
            y += TRACK_HEADER_HEIGHT;

            if let Some(info) = state.info_text(&track.id) {
                svg.push_str(&text(SIDE_PADDING, y + 20.0, 12, "#9ca3af", "start", info));
                y += INFO_PANEL_HEIGHT;
            }

            match state.track_chart(track) {
                TrackChart::Data(payload) => {
                    svg.push_str(&render_data_chart(payload, state, area, y, &format!("chart-{}", i)));
                }
                other => {
                    let message = other.placeholder().unwrap_or_default();
                    svg.push_str(&render_placeholder(area, y, message));
                }
            }
            svg.push_str(&format!(
                r#"<line x1="0" y1="{y:.1}" x2="{w}" y2="{y:.1}" stroke="rgba(255,255,255,0.08)"/>"#,
                y = top + block,
                w = width
            ));
            top += block;
        }

        if let Some(left) = state.hairline_left() {
            svg.push_str(&format!(
                r##"<line class="cursor" x1="{x:.1}" y1="0" x2="{x:.1}" y2="{b:.1}" stroke="#4f7cff" stroke-opacity="0.5"/>"##,
                x = left,
                b = body_height
            ));
        }
        svg.push_str(&render_tooltip(state));
    }

    svg.push_str(&render_status_bar(state, width, body_height));
    svg.push_str("</svg>");
    svg
}
