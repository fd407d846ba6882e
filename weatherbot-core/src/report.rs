use chrono::DateTime;
use chrono_tz::Tz;
use serde_json::Value;
use thiserror::Error;

use crate::{
    config::{ReportOptions, WeatherQuery},
    model::{CurrentConditions, ForecastPoint, WeatherReport},
};

/// Hours covered by one forecast entry (the provider's fixed step).
const FORECAST_STEP_HOURS: usize = 3;

/// Shown when a timestamp falls outside the representable range.
const MISSING_TIME: &str = "--:--";

/// The provider response decoded, but a field the report needs was absent
/// or of the wrong type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("missing field `{0}` in provider response")]
    MissingField(String),
}

/// Build the typed report from the two raw trees and render it in one go.
pub fn format_report(
    current_raw: &Value,
    forecast_raw: &Value,
    query: &WeatherQuery,
    options: &ReportOptions,
) -> Result<String, FormatError> {
    let report = build_report(current_raw, forecast_raw, options.max_forecast_points)?;
    Ok(render_report(&report, query, options))
}

/// Project the raw provider trees into a [`WeatherReport`].
///
/// This is where the provider schema is actually checked: every required
/// field is extracted explicitly, and the first absent or wrongly-typed one
/// aborts with its dotted path in the error. The forecast keeps provider
/// order and is cut to `max_forecast_points`.
pub fn build_report(
    current_raw: &Value,
    forecast_raw: &Value,
    max_forecast_points: usize,
) -> Result<WeatherReport, FormatError> {
    let current = build_current(current_raw)?;
    let upcoming = build_upcoming(forecast_raw, max_forecast_points)?;

    Ok(WeatherReport { current, upcoming })
}

fn build_current(raw: &Value) -> Result<CurrentConditions, FormatError> {
    let humidity = required_u64(raw, "/main/humidity")?;
    let humidity = u8::try_from(humidity).map_err(|_| missing("/main/humidity"))?;

    let pressure = raw
        .pointer("/main/pressure")
        .and_then(Value::as_u64)
        .and_then(|p| u32::try_from(p).ok());

    Ok(CurrentConditions {
        temperature: required_f64(raw, "/main/temp")?,
        description: required_str(raw, "/weather/0/description")?.to_string(),
        humidity,
        pressure,
        sunrise: required_i64(raw, "/sys/sunrise")?,
        sunset: required_i64(raw, "/sys/sunset")?,
    })
}

fn build_upcoming(
    raw: &Value,
    max_forecast_points: usize,
) -> Result<Vec<ForecastPoint>, FormatError> {
    let list = raw
        .pointer("/list")
        .and_then(Value::as_array)
        .ok_or_else(|| missing("/list"))?;

    (0..list.len().min(max_forecast_points))
        .map(|index| {
            Ok(ForecastPoint {
                timestamp: required_i64(raw, &format!("/list/{index}/dt"))?,
                temperature: required_f64(raw, &format!("/list/{index}/main/temp"))?,
                description: required_str(raw, &format!("/list/{index}/weather/0/description"))?
                    .to_string(),
            })
        })
        .collect()
}

/// Render a report as the multi-line reply text.
///
/// Pure function of its inputs: timestamps print as zero-padded 24-hour
/// `HH:MM` in the configured zone regardless of host locale, temperatures
/// follow the configured precision, and the current description gets its
/// first letter capitalized. Forecast lines keep the provider's casing.
pub fn render_report(
    report: &WeatherReport,
    query: &WeatherQuery,
    options: &ReportOptions,
) -> String {
    let suffix = query.units.temperature_suffix();
    let current = &report.current;

    let mut lines = vec![
        format!("🏙️ Weather in {}", query.city),
        String::new(),
        format!("🌡️ Now: {}{}", options.precision.format(current.temperature), suffix),
        format!("☁️ {}", capitalize_first(&current.description)),
        format!("💧 Humidity: {}%", current.humidity),
    ];

    if let Some(pressure) = current.pressure {
        lines.push(format!("📊 Pressure: {pressure} hPa"));
    }

    lines.push(format!(
        "🌅 Sunrise: {} | 🌇 Sunset: {}",
        wall_clock(current.sunrise, options.timezone),
        wall_clock(current.sunset, options.timezone),
    ));
    lines.push(String::new());
    lines.push(format!(
        "📅 Forecast for the next {} hours:",
        report.upcoming.len() * FORECAST_STEP_HOURS
    ));

    for point in &report.upcoming {
        lines.push(format!(
            "{}:   {}{}, {}",
            wall_clock(point.timestamp, options.timezone),
            options.precision.format(point.temperature),
            suffix,
            point.description,
        ));
    }

    lines.join("\n")
}

fn required<'a>(raw: &'a Value, pointer: &str) -> Result<&'a Value, FormatError> {
    raw.pointer(pointer).ok_or_else(|| missing(pointer))
}

fn required_f64(raw: &Value, pointer: &str) -> Result<f64, FormatError> {
    required(raw, pointer)?.as_f64().ok_or_else(|| missing(pointer))
}

fn required_i64(raw: &Value, pointer: &str) -> Result<i64, FormatError> {
    required(raw, pointer)?.as_i64().ok_or_else(|| missing(pointer))
}

fn required_u64(raw: &Value, pointer: &str) -> Result<u64, FormatError> {
    required(raw, pointer)?.as_u64().ok_or_else(|| missing(pointer))
}

fn required_str<'a>(raw: &'a Value, pointer: &str) -> Result<&'a str, FormatError> {
    required(raw, pointer)?.as_str().ok_or_else(|| missing(pointer))
}

/// JSON pointer -> the dotted path reported in error messages.
fn missing(pointer: &str) -> FormatError {
    FormatError::MissingField(pointer.trim_start_matches('/').replace('/', "."))
}

/// Epoch seconds as a zero-padded 24-hour wall clock in the given zone.
fn wall_clock(timestamp: i64, tz: Tz) -> String {
    match DateTime::from_timestamp(timestamp, 0) {
        Some(utc) => utc.with_timezone(&tz).format("%H:%M").to_string(),
        None => MISSING_TIME.to_string(),
    }
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();

    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Precision, Units};
    use serde_json::json;

    // 2023-11-15 01:00:00 UTC, which is 06:00 in Yekaterinburg (UTC+5).
    const FORECAST_START: i64 = 1_700_010_000;
    const FORECAST_STEP: i64 = 10_800;

    fn query() -> WeatherQuery {
        WeatherQuery {
            city: "Yekaterinburg".to_string(),
            units: Units::Metric,
            language: "en".to_string(),
            api_key: "TEST_KEY".to_string(),
        }
    }

    fn options(precision: Precision) -> ReportOptions {
        ReportOptions {
            timezone: chrono_tz::Asia::Yekaterinburg,
            max_forecast_points: 8,
            precision,
        }
    }

    fn current_fixture() -> Value {
        json!({
            "main": { "temp": 15.4, "humidity": 40, "pressure": 1012 },
            "weather": [ { "description": "clear sky" } ],
            "sys": { "sunrise": 1_700_000_000, "sunset": 1_700_030_000 }
        })
    }

    fn forecast_fixture(entries: &[(f64, &str)]) -> Value {
        let list: Vec<Value> = entries
            .iter()
            .enumerate()
            .map(|(i, (temp, description))| {
                json!({
                    "dt": FORECAST_START + FORECAST_STEP * i as i64,
                    "main": { "temp": temp },
                    "weather": [ { "description": description } ]
                })
            })
            .collect();

        json!({ "list": list })
    }

    fn ten_point_forecast() -> Value {
        forecast_fixture(&[
            (14.8, "clear sky"),
            (13.2, "few clouds"),
            (12.9, "scattered clouds"),
            (12.1, "broken clouds"),
            (11.4, "light rain"),
            (10.8, "light rain"),
            (10.1, "overcast clouds"),
            (9.6, "overcast clouds"),
            (9.0, "overcast clouds"),
            (8.7, "mist"),
        ])
    }

    #[test]
    fn full_report_renders_expected_layout() {
        let text = format_report(
            &current_fixture(),
            &ten_point_forecast(),
            &query(),
            &options(Precision::Tenths),
        )
        .expect("report must format");

        let expected = [
            "🏙️ Weather in Yekaterinburg",
            "",
            "🌡️ Now: 15.4°C",
            "☁️ Clear sky",
            "💧 Humidity: 40%",
            "📊 Pressure: 1012 hPa",
            "🌅 Sunrise: 03:13 | 🌇 Sunset: 11:33",
            "",
            "📅 Forecast for the next 24 hours:",
            "06:00:   14.8°C, clear sky",
            "09:00:   13.2°C, few clouds",
            "12:00:   12.9°C, scattered clouds",
            "15:00:   12.1°C, broken clouds",
            "18:00:   11.4°C, light rain",
            "21:00:   10.8°C, light rain",
            "00:00:   10.1°C, overcast clouds",
            "03:00:   9.6°C, overcast clouds",
        ]
        .join("\n");

        assert_eq!(text, expected);
    }

    #[test]
    fn whole_precision_drops_the_decimal() {
        let text = format_report(
            &current_fixture(),
            &ten_point_forecast(),
            &query(),
            &options(Precision::Whole),
        )
        .expect("report must format");

        assert!(text.contains("🌡️ Now: 15°C"));
        assert!(text.contains("06:00:   15°C, clear sky"));
    }

    #[test]
    fn forecast_is_truncated_to_the_configured_maximum() {
        let report = build_report(&current_fixture(), &ten_point_forecast(), 8)
            .expect("report must build");

        assert_eq!(report.upcoming.len(), 8);
        for (i, point) in report.upcoming.iter().enumerate() {
            assert_eq!(point.timestamp, FORECAST_START + FORECAST_STEP * i as i64);
        }
    }

    #[test]
    fn short_forecast_is_not_padded() {
        let forecast = forecast_fixture(&[
            (14.8, "clear sky"),
            (13.2, "few clouds"),
            (12.9, "scattered clouds"),
        ]);

        let text =
            format_report(&current_fixture(), &forecast, &query(), &options(Precision::Tenths))
                .expect("report must format");

        assert!(text.contains("📅 Forecast for the next 9 hours:"));
        assert_eq!(text.lines().count(), 12);
    }

    #[test]
    fn build_report_extracts_typed_fields() {
        let report = build_report(&current_fixture(), &ten_point_forecast(), 8)
            .expect("report must build");

        assert_eq!(report.current.temperature, 15.4);
        assert_eq!(report.current.description, "clear sky");
        assert_eq!(report.current.humidity, 40);
        assert_eq!(report.current.pressure, Some(1012));
        assert_eq!(report.current.sunrise, 1_700_000_000);
        assert_eq!(report.current.sunset, 1_700_030_000);
    }

    #[test]
    fn missing_temperature_is_reported_by_name() {
        let current = json!({
            "main": { "humidity": 40 },
            "weather": [ { "description": "clear sky" } ],
            "sys": { "sunrise": 1_700_000_000, "sunset": 1_700_030_000 }
        });

        let err = build_report(&current, &ten_point_forecast(), 8).unwrap_err();
        assert_eq!(err, FormatError::MissingField("main.temp".to_string()));
    }

    #[test]
    fn empty_weather_array_is_reported_by_name() {
        let current = json!({
            "main": { "temp": 15.4, "humidity": 40 },
            "weather": [],
            "sys": { "sunrise": 1_700_000_000, "sunset": 1_700_030_000 }
        });

        let err = build_report(&current, &ten_point_forecast(), 8).unwrap_err();
        assert_eq!(err, FormatError::MissingField("weather.0.description".to_string()));
    }

    #[test]
    fn wrongly_typed_humidity_counts_as_missing() {
        let current = json!({
            "main": { "temp": 15.4, "humidity": "40" },
            "weather": [ { "description": "clear sky" } ],
            "sys": { "sunrise": 1_700_000_000, "sunset": 1_700_030_000 }
        });

        let err = build_report(&current, &ten_point_forecast(), 8).unwrap_err();
        assert_eq!(err, FormatError::MissingField("main.humidity".to_string()));
    }

    #[test]
    fn missing_forecast_entry_field_names_its_index() {
        let mut forecast = ten_point_forecast();
        forecast["list"][2]
            .as_object_mut()
            .expect("entry must be an object")
            .remove("dt");

        let err = build_report(&current_fixture(), &forecast, 8).unwrap_err();
        assert_eq!(err, FormatError::MissingField("list.2.dt".to_string()));
    }

    #[test]
    fn missing_forecast_list_is_reported() {
        let err = build_report(&current_fixture(), &json!({}), 8).unwrap_err();
        assert_eq!(err, FormatError::MissingField("list".to_string()));
    }

    #[test]
    fn pressure_line_is_omitted_when_absent() {
        let current = json!({
            "main": { "temp": 15.4, "humidity": 40 },
            "weather": [ { "description": "clear sky" } ],
            "sys": { "sunrise": 1_700_000_000, "sunset": 1_700_030_000 }
        });

        let text =
            format_report(&current, &ten_point_forecast(), &query(), &options(Precision::Tenths))
                .expect("report must format");

        assert!(!text.contains("Pressure"));
        assert!(text.contains("💧 Humidity: 40%"));
    }

    #[test]
    fn non_ascii_description_is_capitalized() {
        let current = json!({
            "main": { "temp": 15.4, "humidity": 40 },
            "weather": [ { "description": "ясно" } ],
            "sys": { "sunrise": 1_700_000_000, "sunset": 1_700_030_000 }
        });

        let text =
            format_report(&current, &ten_point_forecast(), &query(), &options(Precision::Tenths))
                .expect("report must format");

        assert!(text.contains("☁️ Ясно"));
    }

    #[test]
    fn out_of_range_timestamps_render_as_placeholder() {
        assert_eq!(wall_clock(i64::MAX, chrono_tz::Asia::Yekaterinburg), "--:--");
    }

    #[test]
    fn capitalize_first_handles_edge_cases() {
        assert_eq!(capitalize_first("clear sky"), "Clear sky");
        assert_eq!(capitalize_first("ясно"), "Ясно");
        assert_eq!(capitalize_first(""), "");
    }
}
