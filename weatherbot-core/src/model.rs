use serde::{Deserialize, Serialize};

/// Snapshot of the conditions at request time, projected out of the raw
/// provider tree. Timestamps are epoch seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature: f64,
    pub description: String,
    /// Relative humidity, percent.
    pub humidity: u8,
    /// Atmospheric pressure in hPa; not every provider payload carries it.
    pub pressure: Option<u32>,
    pub sunrise: i64,
    pub sunset: i64,
}

/// One step of the provider forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: i64,
    pub temperature: f64,
    pub description: String,
}

/// Everything a single reply is rendered from. Built fresh per request,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub current: CurrentConditions,
    /// Upcoming points in provider order, already truncated to the
    /// configured window.
    pub upcoming: Vec<ForecastPoint>,
}
