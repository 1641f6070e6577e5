//! Plain-text rendering of weather results and history entries.

use chrono::Local;
use skylog_weather::{HistoryEntry, TemperatureUnit, WeatherResult};

fn unit_suffix(unit: TemperatureUnit) -> &'static str {
    match unit {
        TemperatureUnit::Celsius => "°C",
        TemperatureUnit::Fahrenheit => "°F",
    }
}

fn metric(value: Option<f64>, suffix: &str) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{}{}", v, suffix))
}

/// Multi-line summary of the current conditions.
pub fn weather_card(result: &WeatherResult, unit: TemperatureUnit) -> String {
    let mut lines = vec![result.place()];
    if let Some(condition) = result.condition() {
        lines.push(format!("  {}", condition));
    }
    lines.push(format!(
        "  Temperature:   {}",
        metric(result.temperature(unit), unit_suffix(unit))
    ));
    lines.push(format!("  Humidity:      {}", metric(result.humidity(), "%")));
    lines.push(format!("  Wind:          {}", metric(result.wind_kph(), " km/h")));
    lines.push(format!("  Visibility:    {}", metric(result.visibility_km(), " km")));
    lines.push(format!(
        "  Precipitation: {}",
        metric(result.precipitation_mm(), " mm")
    ));
    lines.join("\n")
}

/// One line per history entry: id, local time, search, place.
pub fn history_line(entry: &HistoryEntry) -> String {
    format!(
        "{:>14}  {}  {:<40}  {}",
        entry.id,
        entry.captured_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
        entry.params.to_string(),
        entry.result.place()
    )
}
