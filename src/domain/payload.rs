// Normalized tile data: dated rows with one optional value per series key
use crate::domain::time_scale::parse_date;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DATE_KEY: &str = "date";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TileDataMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    /// Series key -> legend label, in display order
    #[serde(default)]
    pub series: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileDataRow {
    pub date: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, Option<f64>>,
}

impl TileDataRow {
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: Option<f64>) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    /// Finite value for `key`, if any
    pub fn value(&self, key: &str) -> Option<f64> {
        self.values
            .get(key)
            .copied()
            .flatten()
            .filter(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TileDataPayload {
    pub meta: TileDataMeta,
    pub data: Vec<TileDataRow>,
}

/// A single observation of one series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub instant_ms: i64,
    pub value: f64,
}

impl TileDataPayload {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn series_keys(&self) -> impl Iterator<Item = &str> {
        self.meta
            .series
            .keys()
            .map(String::as_str)
            .filter(|k| *k != DATE_KEY)
    }

    pub fn series_label<'a>(&'a self, key: &'a str) -> &'a str {
        self.meta.series.get(key).map(String::as_str).unwrap_or(key)
    }

    /// Min/max over every numeric value. Defaults to `[0, 1]` and never
    /// returns an empty span.
    pub fn value_range(&self) -> (f64, f64) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for row in &self.data {
            for key in self.series_keys() {
                if let Some(v) = row.value(key) {
                    min = min.min(v);
                    max = max.max(v);
                }
            }
        }
        if min == f64::INFINITY {
            min = 0.0;
        }
        if max <= min {
            max = min + 1.0;
        }
        (min, max)
    }

    /// Earliest and latest row instants. Rows are not assumed to be sorted.
    pub fn date_span(&self) -> Option<(i64, i64)> {
        let mut dates = self.data.iter().map(|row| parse_date(&row.date));
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }

    pub fn observations(&self, key: &str) -> Vec<Observation> {
        self.data
            .iter()
            .filter_map(|row| {
                row.value(key).map(|value| Observation {
                    instant_ms: parse_date(&row.date),
                    value,
                })
            })
            .collect()
    }

    /// Per series, the value of the observation closest in time to
    /// `instant_ms`. Ties keep the earlier row; no interpolation.
    pub fn nearest_values(&self, instant_ms: f64) -> IndexMap<String, Option<f64>> {
        self.series_keys()
            .map(|key| {
                let nearest = self
                    .observations(key)
                    .into_iter()
                    .fold(None::<(f64, f64)>, |best, obs| {
                        let dist = (obs.instant_ms as f64 - instant_ms).abs();
                        match best {
                            Some((best_dist, _)) if best_dist <= dist => best,
                            _ => Some((dist, obs.value)),
                        }
                    })
                    .map(|(_, value)| value);
                (key.to_string(), nearest)
            })
            .collect()
    }
}

/// Aligns several dated series into rows keyed by date, every row carrying
/// every series key.
#[derive(Debug, Default)]
pub struct PayloadBuilder {
    keys: Vec<String>,
    rows: BTreeMap<String, BTreeMap<String, Option<f64>>>,
}

impl PayloadBuilder {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            rows: BTreeMap::new(),
        }
    }

    fn row_mut(&mut self, date: &str) -> &mut BTreeMap<String, Option<f64>> {
        let keys = &self.keys;
        self.rows.entry(date.to_string()).or_insert_with(|| {
            keys.iter().map(|k| (k.clone(), None)).collect()
        })
    }

    pub fn set(&mut self, date: &str, key: &str, value: Option<f64>) {
        self.row_mut(date).insert(key.to_string(), value);
    }

    pub fn get(&self, date: &str, key: &str) -> Option<f64> {
        self.rows.get(date).and_then(|r| r.get(key).copied().flatten())
    }

    /// Ensure a row exists for `date` without touching its values
    pub fn touch(&mut self, date: &str) {
        self.row_mut(date);
    }

    /// Rows sorted by date, keeping only those inside `[start, end]`
    /// (string comparison) that carry at least one value.
    pub fn build(self, meta: TileDataMeta, start: &str, end: &str) -> TileDataPayload {
        let data = self
            .rows
            .into_iter()
            .filter(|(date, values)| {
                date.as_str() >= start
                    && date.as_str() <= end
                    && values.values().any(Option::is_some)
            })
            .map(|(date, values)| TileDataRow { date, values })
            .collect();
        TileDataPayload { meta, data }
    }
}
