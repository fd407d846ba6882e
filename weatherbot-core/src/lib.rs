//! Core library for the weather bot.
//!
//! This crate defines:
//! - Environment-sourced configuration (city, units, time zone, precision)
//! - The weather provider HTTP client with typed fetch errors
//! - Report building & rendering from raw provider JSON
//!
//! It is used by the `weatherbot` binary, but can also be reused by other
//! binaries or services.

pub mod client;
pub mod config;
pub mod model;
pub mod report;

pub use client::{Endpoint, FetchError, WeatherClient};
pub use config::{BotConfig, Precision, ReportOptions, Units, WeatherQuery};
pub use model::{CurrentConditions, ForecastPoint, WeatherReport};
pub use report::{FormatError, build_report, format_report, render_report};
