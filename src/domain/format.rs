// Number formatting for tooltips and axis labels

/// Units such as "$/wk" or "thousands of 2022 dollars" are rendered as money.
pub fn is_currency_unit(units: Option<&str>) -> bool {
    units
        .map(|u| u.contains('$') || u.to_lowercase().contains("dollar"))
        .unwrap_or(false)
}

/// Tooltip value: thousands separators, integers without decimals and other
/// values with up to two. Currency gets a `$` prefix and is rounded to whole
/// units from one million up.
pub fn format_tooltip_value(value: f64, units: Option<&str>) -> String {
    if is_currency_unit(units) {
        let v = if value.abs() >= 1e6 { value.round() } else { value };
        return format!("${}", group_thousands(v, 2));
    }
    if value.fract() == 0.0 {
        group_thousands(value, 0)
    } else {
        group_thousands(value, 2)
    }
}

/// Compact axis label: one decimal with K/M/B/T suffixes.
pub fn format_axis_label(value: f64, units: Option<&str>) -> String {
    let prefix = if is_currency_unit(units) { "$" } else { "" };
    let abs = value.abs();
    let body = if abs >= 1e12 {
        format!("{:.1}T", value / 1e12)
    } else if abs >= 1e9 {
        format!("{:.1}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("{:.1}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("{:.1}K", value / 1e3)
    } else if value.fract() != 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    };
    format!("{}{}", prefix, body)
}

/// `1234567.891` -> `1,234,567.89` with at most `max_fraction` digits and
/// trailing zeros dropped.
fn group_thousands(value: f64, max_fraction: usize) -> String {
    let fixed = format!("{:.*}", max_fraction, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i.to_string(), f.trim_end_matches('0').to_string()),
        None => (fixed, String::new()),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let negative = value < 0.0 && (int_part != "0" || !frac_part.is_empty());
    let sign = if negative { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac_part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_values() {
        assert_eq!(format_tooltip_value(1234567.0, Some("$")), "$1,234,567");
        assert_eq!(format_tooltip_value(1234567.4, Some("dollars")), "$1,234,567");
        assert_eq!(format_tooltip_value(512.346, Some("$/wk")), "$512.35");
        assert_eq!(format_tooltip_value(99.5, Some("Thousands of Dollars")), "$99.5");
    }

    #[test]
    #[allow(clippy::approx_constant)]
    fn test_plain_values() {
        assert_eq!(format_tooltip_value(3.14159, None), "3.14");
        assert_eq!(format_tooltip_value(22900.0, Some("count")), "22,900");
        assert_eq!(format_tooltip_value(1234.5, Some("percent")), "1,234.5");
        assert_eq!(format_tooltip_value(-1500.25, None), "-1,500.25");
        assert_eq!(format_tooltip_value(0.0, None), "0");
    }

    #[test]
    fn test_axis_labels() {
        assert_eq!(format_axis_label(2.5e12, None), "2.5T");
        assert_eq!(format_axis_label(1.26e6, Some("dollars")), "$1.3M");
        assert_eq!(format_axis_label(1500.0, None), "1.5K");
        assert_eq!(format_axis_label(0.52, None), "0.5");
        assert_eq!(format_axis_label(42.0, None), "42");
    }
}
