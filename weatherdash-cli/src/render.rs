//! Plain-text cards and charts.

use std::fmt::Write as _;

use chrono::{DateTime, TimeZone, Utc};
use weatherdash_core::{
    ComparisonRow, CurrentConditions, DailyBucket, GeocodeCandidate, HourlyRow, Selection, Theme,
    Unit, WeeklyRow,
};

const BAR_WIDTH: usize = 24;

pub const NO_DATA: &str = "No data available for the selected location.";

fn bar_glyph(theme: Theme) -> char {
    match theme {
        Theme::Dark => '█',
        Theme::Light => '▓',
    }
}

fn clock<Tz: TimeZone>(time: Option<DateTime<Utc>>, zone: &Tz) -> String {
    time.map(|t| t.with_timezone(zone).naive_local().format("%I:%M %p").to_string())
        .unwrap_or_else(|| "--".to_string())
}

pub fn candidates(list: &[GeocodeCandidate]) -> String {
    if list.is_empty() {
        return "No matching locations.\n".to_string();
    }

    let mut out = String::new();
    for (i, c) in list.iter().enumerate() {
        let _ = writeln!(out, "{:>2}. {}  ({:.4}, {:.4})", i + 1, c.label, c.value.lat, c.value.lon);
    }
    out
}

pub fn current_card<Tz: TimeZone>(
    address: &str,
    current: &CurrentConditions,
    unit: Unit,
    zone: &Tz,
) -> String {
    let deg = unit.symbol();
    let mut out = String::new();

    let _ = writeln!(out, "{address}");
    let _ = writeln!(
        out,
        "  {:.1}{deg}  {}",
        current.temp,
        current.description.as_deref().or(current.condition.as_deref()).unwrap_or("")
    );
    let _ = writeln!(out, "  Feels like {:.1}{deg}", current.feels_like);
    let _ = writeln!(out, "  Low {:.1}{deg} / High {:.1}{deg}", current.temp_min, current.temp_max);
    let _ = writeln!(out, "  Sunrise {}  Sunset {}", clock(current.sunrise, zone), clock(current.sunset, zone));
    let _ = writeln!(out, "  Humidity   {:.0}%", current.humidity);
    let _ = writeln!(out, "  Pressure   {:.0} hPa", current.pressure);
    let _ = writeln!(out, "  Wind       {:.1} {}", current.wind_speed, unit.wind_unit());
    let _ = writeln!(out, "  Clouds     {:.0}%", current.clouds);
    if let Some(visibility) = current.visibility {
        let _ = writeln!(out, "  Visibility {visibility:.0} m");
    }
    out
}

/// Min..max temperature bars on a shared scale, one line per day.
pub fn weekly_chart(rows: &[WeeklyRow], unit: Unit, theme: Theme) -> String {
    let lo = rows.iter().map(|r| r.min).fold(f64::INFINITY, f64::min);
    let hi = rows.iter().map(|r| r.max).fold(f64::NEG_INFINITY, f64::max);
    let span = (hi - lo).max(f64::EPSILON);
    let scale = |t: f64| (((t - lo) / span) * BAR_WIDTH as f64).round() as usize;

    let deg = unit.symbol();
    let glyph = bar_glyph(theme);
    let mut out = String::new();

    for r in rows {
        let start = scale(r.min).min(BAR_WIDTH);
        let end = scale(r.max).clamp(start, BAR_WIDTH);
        let bar: String = (0..BAR_WIDTH)
            .map(|i| if i >= start && i <= end { glyph } else { ' ' })
            .collect();

        let _ = writeln!(
            out,
            "{} {}  {:>6.1}{deg} |{bar}| {:>6.1}{deg}  avg {:>5.1}  rain {:>3}%  hum {:>3}%  wind {:>4.1}",
            r.day, r.date, r.min, r.max, r.avg, r.precipitation, r.humidity, r.wind,
        );
    }
    out
}

pub fn day_header(bucket: &DailyBucket) -> String {
    format!(
        "{}, {} - {}{}\n",
        bucket.day_name,
        bucket.date_formatted,
        bucket.dominant_weather.as_deref().unwrap_or("Unknown"),
        bucket.icon.as_deref().map(|i| format!(" ({i})")).unwrap_or_default(),
    )
}

pub fn hourly_table(rows: impl Iterator<Item = HourlyRow>, unit: Unit) -> String {
    let deg = unit.symbol();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{:<9} {:>8} {:>8} {:>5} {:>6} {:>5} {:>6} {:>6}  {}",
        "Time", "Temp", "Feels", "Hum", "Wind", "Rain", "hPa", "Cloud", "Weather"
    );
    for r in rows {
        let _ = writeln!(
            out,
            "{:<9} {:>6.1}{deg} {:>6.1}{deg} {:>4.0}% {:>6.1} {:>4.0}% {:>6.0} {:>5.0}%  {}",
            r.time_formatted,
            r.temp,
            r.feels_like,
            r.humidity,
            r.wind,
            r.precipitation,
            r.pressure,
            r.clouds,
            r.weather.as_deref().unwrap_or("-"),
        );
    }
    out
}

pub fn comparison_table(rows: &[ComparisonRow], unit: Unit) -> String {
    let deg = unit.symbol();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{:<18} {:>8} {:>8} {:>8} {:>8} {:>5} {:>6} {:>6} {:>6}",
        "Location", "Temp", "Feels", "Min", "Max", "Hum", "Wind", "hPa", "Cloud"
    );
    for r in rows {
        let _ = writeln!(
            out,
            "{:<18} {:>6.1}{deg} {:>6.1}{deg} {:>6.1}{deg} {:>6.1}{deg} {:>4.0}% {:>6.1} {:>6.0} {:>5.0}%",
            r.name, r.temp, r.feels_like, r.min, r.max, r.humidity, r.wind, r.pressure, r.clouds,
        );
    }
    out
}

/// One line per part of the selection that differs between `before` and `after`.
pub fn changes(before: &Selection, after: &Selection) -> String {
    let mut out = String::new();
    if after.location != before.location {
        let _ = writeln!(out, "Selected {}", after.location.address);
    }
    if after.unit != before.unit {
        let _ = writeln!(out, "Unit set to {}", after.unit.symbol());
    }
    if after.theme != before.theme {
        let _ = writeln!(out, "Theme set to {}", after.theme);
    }
    out
}
