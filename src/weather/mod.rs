//! Grid weather forecasts and the rain report.
//!
//! Talks to a QWeather-style HTTPS API authenticated with an EdDSA JWT.
//! All key material (token subject, key id, API host, coordinate list)
//! comes from the credential store under the `rain_report` service.

pub mod client;
pub mod jwt;
pub mod rain;

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use crate::secrets::SecretsError;

pub use client::GridWeatherClient;
pub use rain::RainReport;

/// Errors from the weather client and rain report.
#[derive(Error, Debug)]
pub enum WeatherError {
    #[error(transparent)]
    Secrets(#[from] SecretsError),

    #[error(transparent)]
    Token(#[from] jwt::JwtError),

    #[error("failed to read signing key {}: {source}", .path.display())]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("weather request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("weather API returned status {status} for location '{location}'")]
    BadStatus {
        status: reqwest::StatusCode,
        location: String,
    },

    #[error("weather API returned error code {code} for location '{location}'")]
    ApiCode { code: String, location: String },

    #[error("failed to push rain notification: {0}")]
    Notify(#[from] crate::notify::NotifyError),

    #[error("no forecast locations configured")]
    NoLocations,
}

/// Hourly forecast response, `/v7/grid-weather/24h` shape.
#[derive(Debug, Clone, Deserialize)]
pub struct GridWeatherResponse {
    /// API status code; "200" on success.
    pub code: String,
    #[serde(default)]
    pub hourly: Vec<HourlyForecast>,
}

/// One hour of forecast data.
#[derive(Debug, Clone, Deserialize)]
pub struct HourlyForecast {
    /// Forecast time with offset, e.g. `2026-08-29T16:00+08:00`.
    #[serde(rename = "fxTime")]
    pub fx_time: String,
    #[serde(default)]
    pub temp: String,
    #[serde(default)]
    pub icon: String,
    /// Human-readable condition, e.g. `小雨`.
    #[serde(default)]
    pub text: String,
}
