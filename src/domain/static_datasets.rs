// Curated tables for sources without a machine-readable feed
use crate::domain::payload::{TileDataMeta, TileDataPayload, TileDataRow};
use crate::domain::time_scale::{TIMELINE_END_YEAR, TIMELINE_START_YEAR};
use indexmap::IndexMap;

fn meta(units: Option<&str>, frequency: Option<&str>, series: &[(&str, &str)]) -> TileDataMeta {
    TileDataMeta {
        units: units.map(str::to_string),
        frequency: frequency.map(str::to_string),
        series: series
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<IndexMap<_, _>>(),
    }
}

fn single_series(rows: &[(i32, f64)], key: &str, date_suffix: &str) -> Vec<TileDataRow> {
    rows.iter()
        .map(|(year, v)| TileDataRow::new(format!("{}{}", year, date_suffix)).with(key, Some(*v)))
        .collect()
}

fn table(years: &[i32], keys: &[&str], values: &[&[f64]], date_suffix: &str) -> Vec<TileDataRow> {
    years
        .iter()
        .zip(values)
        .map(|(year, row)| {
            keys.iter()
                .zip(row.iter())
                .fold(TileDataRow::new(format!("{}{}", year, date_suffix)), |acc, (k, v)| {
                    acc.with(k, Some(*v))
                })
        })
        .collect()
}

const SCF_YEARS: [i32; 12] = [1989, 1992, 1995, 1998, 2001, 2004, 2007, 2010, 2013, 2016, 2019, 2022];

// Median net worth by age class, thousands of 2022 dollars
const SCF_MEDIAN_NET_WORTH: [&[f64]; 12] = [
    &[11.0, 61.0, 99.0, 131.0, 122.0, 95.0],
    &[10.0, 54.0, 100.0, 131.0, 117.0, 99.0],
    &[9.0, 62.0, 104.0, 138.0, 128.0, 108.0],
    &[12.0, 79.0, 125.0, 167.0, 152.0, 132.0],
    &[11.0, 82.0, 120.0, 179.0, 164.0, 143.0],
    &[10.0, 69.0, 114.0, 198.0, 178.0, 159.0],
    &[12.0, 69.0, 128.0, 216.0, 194.0, 168.0],
    &[4.0, 35.0, 96.0, 195.0, 170.0, 152.0],
    &[6.0, 42.0, 91.0, 168.0, 179.0, 162.0],
    &[6.0, 47.0, 105.0, 194.0, 216.0, 195.0],
    &[10.0, 59.0, 126.0, 252.0, 266.0, 255.0],
    &[14.0, 90.0, 170.0, 364.0, 410.0, 336.0],
];

pub fn scf_wealth_by_cohort() -> TileDataPayload {
    let series = [
        ("under35", "Under 35"),
        ("age35_44", "35-44"),
        ("age45_54", "45-54"),
        ("age55_64", "55-64"),
        ("age65_74", "65-74"),
        ("age75plus", "75+"),
    ];
    let keys: Vec<&str> = series.iter().map(|(k, _)| *k).collect();
    TileDataPayload {
        meta: meta(Some("thousands of 2022 dollars"), Some("triennial"), &series),
        data: table(&SCF_YEARS, &keys, &SCF_MEDIAN_NET_WORTH, "-06-01"),
    }
}

const GSS_YEARS: [i32; 22] = [
    1985, 1987, 1988, 1989, 1990, 1991, 1993, 1994, 1996, 1998, 2000, 2002, 2004, 2006, 2008,
    2010, 2012, 2014, 2016, 2018, 2021, 2022,
];

// Confidence in Congress %, in banks %, "most people can be trusted" %
const GSS_TRUST: [&[f64]; 22] = [
    &[32.0, 42.0, 46.0],
    &[28.0, 38.0, 44.0],
    &[26.0, 35.0, 43.0],
    &[24.0, 38.0, 42.0],
    &[22.0, 36.0, 41.0],
    &[20.0, 34.0, 40.0],
    &[18.0, 32.0, 39.0],
    &[19.0, 30.0, 38.0],
    &[22.0, 35.0, 37.0],
    &[20.0, 38.0, 36.0],
    &[18.0, 36.0, 35.0],
    &[16.0, 34.0, 35.0],
    &[14.0, 32.0, 34.0],
    &[12.0, 28.0, 33.0],
    &[13.0, 22.0, 32.0],
    &[11.0, 25.0, 32.0],
    &[10.0, 26.0, 31.0],
    &[9.0, 30.0, 31.0],
    &[8.0, 32.0, 30.0],
    &[8.0, 30.0, 30.0],
    &[7.0, 27.0, 29.0],
    &[8.0, 26.0, 28.0],
];

pub fn gss_institutional_trust() -> TileDataPayload {
    let series = [
        ("congress", "Confidence in Congress %"),
        ("banks", "Confidence in banks %"),
        ("trust", "Most people can be trusted %"),
    ];
    TileDataPayload {
        meta: meta(Some("percent"), Some("biennial (GSS)"), &series),
        data: table(&GSS_YEARS, &["congress", "banks", "trust"], &GSS_TRUST, "-06-01"),
    }
}

/// Turning phase per year: 1 High, 2 Awakening, 3 Unraveling, 4 Crisis
fn turning_phase(year: i32) -> u8 {
    const BOUNDARIES: [(i32, u8); 4] = [(1946, 1), (1964, 2), (1984, 3), (2008, 4)];
    BOUNDARIES
        .iter()
        .filter(|(start, _)| year >= *start)
        .map(|(_, phase)| *phase)
        .last()
        .unwrap_or(1)
}

/// Each phase is its own series, non-zero only while active, so the chart
/// draws distinct bands.
pub fn turning_timeline() -> TileDataPayload {
    let series = [
        ("high", "High"),
        ("awakening", "Awakening"),
        ("unraveling", "Unraveling"),
        ("crisis", "Crisis"),
    ];
    let data = (TIMELINE_START_YEAR..=TIMELINE_END_YEAR)
        .map(|year| {
            let phase = turning_phase(year);
            series
                .iter()
                .zip(1u8..)
                .fold(TileDataRow::new(format!("{}-06-01", year)), |row, ((key, _), p)| {
                    let v = if phase == p { p as f64 } else { 0.0 };
                    row.with(key, Some(v))
                })
        })
        .collect();
    TileDataPayload {
        meta: meta(Some("phase"), Some("annual"), &series),
        data,
    }
}

// Reference year (birth cohort + 30) -> share of children out-earning parents
const ABSOLUTE_MOBILITY: [(i32, f64); 6] = [
    (1985, 72.0),
    (1990, 62.0),
    (1995, 61.0),
    (2000, 61.0),
    (2005, 52.0),
    (2010, 50.0),
];

pub fn absolute_mobility() -> TileDataPayload {
    TileDataPayload {
        meta: meta(Some("%"), None, &[("pct", "Absolute mobility (%)")]),
        data: single_series(&ABSOLUTE_MOBILITY, "pct", "-01-01"),
    }
}

// DW-NOMINATE party mean distance
const POLARIZATION: [(i32, f64); 7] = [
    (1985, 0.52),
    (1990, 0.58),
    (1995, 0.63),
    (2000, 0.71),
    (2005, 0.78),
    (2010, 0.86),
    (2014, 0.90),
];

pub fn polarization() -> TileDataPayload {
    TileDataPayload {
        meta: meta(
            Some("index (0–1)"),
            None,
            &[("distance", "Party mean distance (DW-NOMINATE)")],
        ),
        data: single_series(&POLARIZATION, "distance", "-01-01"),
    }
}

// Approximate annual ACLED event counts
const UNREST_EVENTS: [(i32, f64); 7] = [
    (2018, 3200.0),
    (2019, 3800.0),
    (2020, 22900.0),
    (2021, 8500.0),
    (2022, 5200.0),
    (2023, 4800.0),
    (2024, 4500.0),
];

pub fn unrest() -> TileDataPayload {
    TileDataPayload {
        meta: meta(
            Some("count"),
            None,
            &[("events", "Political unrest events (demonstrations, protests, violence)")],
        ),
        data: single_series(&UNREST_EVENTS, "events", "-01-01"),
    }
}

// Battle-related deaths, thousands (UCDP)
const BATTLE_DEATHS: [(i32, f64); 17] = [
    (1985, 180.0),
    (1988, 200.0),
    (1990, 220.0),
    (1992, 120.0),
    (1995, 85.0),
    (1998, 70.0),
    (2000, 65.0),
    (2003, 95.0),
    (2005, 95.0),
    (2008, 80.0),
    (2010, 75.0),
    (2013, 130.0),
    (2015, 165.0),
    (2018, 95.0),
    (2020, 85.0),
    (2022, 75.0),
    (2024, 70.0),
];

pub fn violence_war() -> TileDataPayload {
    TileDataPayload {
        meta: meta(
            Some("thousands"),
            None,
            &[("deaths", "Battle-related deaths (thousands)")],
        ),
        data: single_series(&BATTLE_DEATHS, "deaths", "-01-01"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turning_phases_form_bands() {
        let payload = turning_timeline();
        assert_eq!(payload.data.len(), 41);

        let first = &payload.data[0];
        assert_eq!(first.date, "1985-06-01");
        assert_eq!(first.value("unraveling"), Some(3.0));
        assert_eq!(first.value("crisis"), Some(0.0));

        let crisis = payload.data.iter().find(|r| r.date == "2008-06-01").unwrap();
        assert_eq!(crisis.value("crisis"), Some(4.0));
        assert_eq!(crisis.value("unraveling"), Some(0.0));
    }

    #[test]
    fn test_tables_carry_every_series_key() {
        for payload in [scf_wealth_by_cohort(), gss_institutional_trust(), turning_timeline()] {
            let keys: Vec<&str> = payload.series_keys().collect();
            for row in &payload.data {
                let row_keys: Vec<&str> = row.values.keys().map(String::as_str).collect();
                let mut expected = keys.clone();
                expected.sort();
                assert_eq!(row_keys, expected, "row {} in {:?}", row.date, payload.meta.units);
            }
        }
    }

    #[test]
    fn test_scf_last_survey() {
        let payload = scf_wealth_by_cohort();
        let last = payload.data.last().unwrap();
        assert_eq!(last.date, "2022-06-01");
        assert_eq!(last.value("age65_74"), Some(410.0));
    }
}
