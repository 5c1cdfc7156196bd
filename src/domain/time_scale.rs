// Calendar dates on the shared timeline and the affine maps onto pixels
use chrono::{DateTime, Datelike, Days, NaiveDate};

pub const TIMELINE_START_YEAR: i32 = 1985;
pub const TIMELINE_END_YEAR: i32 = 2025;
pub const TIMELINE_START_DATE: &str = "1985-01-01";
pub const TIMELINE_END_DATE: &str = "2025-12-31";

/// Start/end instants (ms) every chart on the canvas scales against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeDomain {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl TimeDomain {
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        Self { start_ms, end_ms }
    }

    pub fn contains(&self, instant_ms: f64) -> bool {
        instant_ms >= self.start_ms as f64 && instant_ms <= self.end_ms as f64
    }
}

impl Default for TimeDomain {
    fn default() -> Self {
        Self {
            start_ms: parse_date(TIMELINE_START_DATE),
            end_ms: calendar_ms(TIMELINE_END_YEAR, 11, 31),
        }
    }
}

/// Parse `YYYY`, `YYYY-MM` or `YYYY-MM-DD` into milliseconds at midnight.
///
/// A bare year lands on December 31 and a year-month on the last day of that
/// month, so annual and monthly points sit at the right edge of their period.
/// A non-numeric year yields 0.
pub fn parse_date(text: &str) -> i64 {
    let trimmed = text.trim();
    let Some(year) = leading_int(slice_chars(trimmed, 0, 4)) else {
        return 0;
    };
    let len = trimmed.chars().count();
    if len <= 4 {
        return calendar_ms(year as i32, 11, 31);
    }

    let month = match leading_int(slice_chars(trimmed, 5, 7)) {
        Some(m) if m != 0 => m,
        _ => 1,
    };
    let day = leading_int(slice_chars(trimmed, 8, 10));

    match day {
        Some(d) if len != 7 => calendar_ms(year as i32, month - 1, d),
        // Day 0 of the following month is the last day of this one
        _ => calendar_ms(year as i32, month, 0),
    }
}

/// Midnight of `year`/`month0`/`day` where month and day may overflow into
/// neighbouring months and years, the way calendar arithmetic rolls over.
fn calendar_ms(year: i32, month0: i64, day: i64) -> i64 {
    let total_months = year as i64 * 12 + month0;
    let y = total_months.div_euclid(12);
    let m = total_months.rem_euclid(12) as u32 + 1;

    let Ok(y) = i32::try_from(y) else {
        return 0;
    };
    let Some(first) = NaiveDate::from_ymd_opt(y, m, 1) else {
        return 0;
    };
    let offset = day - 1;
    let date = if offset >= 0 {
        first.checked_add_days(Days::new(offset as u64))
    } else {
        first.checked_sub_days(Days::new(offset.unsigned_abs()))
    };

    date.and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or(0)
}

fn slice_chars(text: &str, start: usize, end: usize) -> String {
    text.chars().skip(start).take(end.saturating_sub(start)).collect()
}

/// Leading decimal integer of `text` (optional sign), ignoring trailing junk.
fn leading_int(text: String) -> Option<i64> {
    let text = text.trim_start();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, text.strip_prefix('+').unwrap_or(text)),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    digits[..end].parse::<i64>().ok().map(|v| v * sign)
}

/// Clamped affine map between a time domain (ms) and a pixel range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain_start: f64,
    domain_end: f64,
    range_start: f64,
    range_end: f64,
}

impl LinearScale {
    pub fn new(domain_start: f64, domain_end: f64, range_start: f64, range_end: f64) -> Self {
        Self {
            domain_start,
            domain_end,
            range_start,
            range_end,
        }
    }

    pub fn for_domain(domain: TimeDomain, range_start: f64, range_end: f64) -> Self {
        Self::new(domain.start_ms as f64, domain.end_ms as f64, range_start, range_end)
    }

    fn degenerate(&self) -> bool {
        self.domain_end - self.domain_start <= 0.0 || self.range_end - self.range_start <= 0.0
    }

    /// Instants outside the domain collapse onto the nearest edge pixel.
    pub fn to_pixel(&self, instant_ms: f64) -> f64 {
        if self.degenerate() {
            return self.range_start;
        }
        let t = (instant_ms - self.domain_start) / (self.domain_end - self.domain_start);
        self.range_start + t.clamp(0.0, 1.0) * (self.range_end - self.range_start)
    }

    pub fn to_instant(&self, pixel: f64) -> f64 {
        if self.degenerate() {
            return self.domain_start;
        }
        let t = (pixel - self.range_start) / (self.range_end - self.range_start);
        self.domain_start + t.clamp(0.0, 1.0) * (self.domain_end - self.domain_start)
    }
}

/// `YYYY-Qn` label for the status bar and tooltip header.
pub fn format_for_status(instant_ms: f64) -> String {
    match DateTime::from_timestamp_millis(instant_ms as i64) {
        Some(dt) => format!("{}-Q{}", dt.year(), dt.month0() / 3 + 1),
        None => String::new(),
    }
}

pub fn year_of(instant_ms: i64) -> i32 {
    DateTime::from_timestamp_millis(instant_ms)
        .map(|dt| dt.year())
        .unwrap_or(1970)
}

/// January 1 of every decade year inside the domain.
pub fn decade_ticks(domain: TimeDomain) -> Vec<i64> {
    let start_year = year_of(domain.start_ms);
    let end_year = year_of(domain.end_ms);
    let first = (start_year as f64 / 10.0).ceil() as i32 * 10;

    (first..=end_year)
        .step_by(10)
        .map(|y| calendar_ms(y, 0, 1))
        .collect()
}
