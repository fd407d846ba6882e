use anyhow::{Context, Result, anyhow, bail};
use chrono_tz::Tz;
use std::env;

const DEFAULT_CITY: &str = "Yekaterinburg";
const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Yekaterinburg;
const DEFAULT_FORECAST_POINTS: usize = 8;

/// Unit system passed to the provider, e.g. "metric" or "imperial".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    /// Kelvin, the provider default when no units are requested.
    Standard,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Standard => "standard",
        }
    }

    pub const fn all() -> &'static [Units] {
        &[Units::Metric, Units::Imperial, Units::Standard]
    }

    /// Suffix printed after temperatures in this unit system.
    pub fn temperature_suffix(&self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
            Units::Standard => "K",
        }
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Units {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            "standard" => Ok(Units::Standard),
            _ => Err(anyhow!(
                "Unknown units '{value}'. Supported units: metric, imperial, standard."
            )),
        }
    }
}

/// How many digits of the temperature make it into the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Precision {
    /// Nearest whole degree, e.g. "15".
    Whole,
    /// One decimal place, e.g. "15.4".
    #[default]
    Tenths,
}

impl Precision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Whole => "whole",
            Precision::Tenths => "tenths",
        }
    }

    pub const fn all() -> &'static [Precision] {
        &[Precision::Whole, Precision::Tenths]
    }

    /// Round a temperature to this precision and render it. Values that
    /// round to zero print without a sign.
    pub fn format(&self, value: f64) -> String {
        match self {
            Precision::Whole => {
                let rounded = value.round();
                let rounded = if rounded == 0.0 { 0.0 } else { rounded };
                format!("{rounded:.0}")
            }
            Precision::Tenths => {
                let rounded = (value * 10.0).round() / 10.0;
                let rounded = if rounded == 0.0 { 0.0 } else { rounded };
                format!("{rounded:.1}")
            }
        }
    }
}

impl std::fmt::Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Precision {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "whole" => Ok(Precision::Whole),
            "tenths" => Ok(Precision::Tenths),
            _ => Err(anyhow!(
                "Unknown precision '{value}'. Supported precisions: whole, tenths."
            )),
        }
    }
}

/// Lookup parameters sent with every provider request. Built once at
/// startup and passed by reference afterwards.
#[derive(Debug, Clone)]
pub struct WeatherQuery {
    pub city: String,
    pub units: Units,
    /// Language code for provider-side condition descriptions.
    pub language: String,
    pub api_key: String,
}

/// How reports are rendered: which wall clock, how many forecast points,
/// how many temperature digits.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub timezone: Tz,
    pub max_forecast_points: usize,
    pub precision: Precision,
}

/// Top-level configuration, sourced from the environment.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub telegram_token: String,
    pub query: WeatherQuery,
    pub report: ReportOptions,
}

impl BotConfig {
    /// Read the full configuration from environment variables.
    ///
    /// `TELEGRAM_BOT_TOKEN` and `OPENWEATHER_API_KEY` are required;
    /// everything else falls back to a default. Errors name the offending
    /// variable so a misconfigured deployment fails before any network
    /// activity.
    pub fn from_env() -> Result<Self> {
        let telegram_token = required_var("TELEGRAM_BOT_TOKEN")?;
        let api_key = required_var("OPENWEATHER_API_KEY")?;

        let city = optional_var("WEATHER_CITY").unwrap_or_else(|| DEFAULT_CITY.to_string());

        let units = match optional_var("WEATHER_UNITS") {
            Some(raw) => Units::try_from(raw.as_str()).context("Invalid WEATHER_UNITS")?,
            None => Units::default(),
        };

        let language =
            optional_var("WEATHER_LANG").unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        let timezone = match optional_var("WEATHER_TIMEZONE") {
            Some(raw) => raw
                .parse::<Tz>()
                .map_err(|e| anyhow!("Invalid WEATHER_TIMEZONE '{raw}': {e}"))?,
            None => DEFAULT_TIMEZONE,
        };

        let max_forecast_points = match optional_var("WEATHER_FORECAST_POINTS") {
            Some(raw) => raw.parse::<usize>().with_context(|| {
                format!("Invalid WEATHER_FORECAST_POINTS '{raw}': expected a number")
            })?,
            None => DEFAULT_FORECAST_POINTS,
        };

        let precision = match optional_var("WEATHER_PRECISION") {
            Some(raw) => Precision::try_from(raw.as_str()).context("Invalid WEATHER_PRECISION")?,
            None => Precision::default(),
        };

        Ok(Self {
            telegram_token,
            query: WeatherQuery { city, units, language, api_key },
            report: ReportOptions { timezone, max_forecast_points, precision },
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    let value = env::var(name)
        .with_context(|| format!("Missing required environment variable {name}"))?;

    if value.trim().is_empty() {
        bail!("Environment variable {name} is set but empty");
    }

    Ok(value)
}

/// Unset and empty are both treated as "use the default".
fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
