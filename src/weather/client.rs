//! HTTP client for the grid weather API.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::constants;
use crate::secrets::SecretStore;

use super::{jwt, GridWeatherResponse, WeatherError};

/// Request timeout for forecast calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Credential service name for all weather secrets.
const SERVICE: &str = "rain_report";

/// Client for the 24-hour grid forecast endpoint.
///
/// Resolves its host and signing material from the credential store on
/// each call; tokens are short-lived, so there is nothing worth caching
/// beyond the store's own table.
pub struct GridWeatherClient {
    http: reqwest::Client,
    secrets: Arc<SecretStore>,
}

impl GridWeatherClient {
    pub fn new(secrets: Arc<SecretStore>) -> Self {
        Self {
            http: reqwest::Client::new(),
            secrets,
        }
    }

    /// Fetch the 24-hour hourly forecast for one `lon,lat` coordinate.
    pub async fn grid_weather_24h(
        &self,
        location: &str,
    ) -> Result<GridWeatherResponse, WeatherError> {
        let scope = self.secrets.scoped("grid_weather_24h");
        let host = scope.get(SERVICE, "api_host")?;
        let kid = scope.get(SERVICE, "kid")?;
        let sub = scope.get(SERVICE, "sub")?;
        let key_path = PathBuf::from(
            scope
                .get(SERVICE, "private_key_file")
                .unwrap_or_else(|_| constants::DEFAULT_WEATHER_KEY_FILE.to_string()),
        );

        let pem = std::fs::read_to_string(&key_path).map_err(|source| WeatherError::KeyFile {
            path: key_path,
            source,
        })?;
        let token = jwt::generate_token(&pem, &kid, &sub)?;

        let url = format!("https://{host}/v7/grid-weather/24h");
        let response = self
            .http
            .get(&url)
            .query(&[("location", location)])
            .bearer_auth(token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WeatherError::BadStatus {
                status: response.status(),
                location: location.to_string(),
            });
        }

        let body: GridWeatherResponse = response.json().await?;
        if body.code != "200" {
            return Err(WeatherError::ApiCode {
                code: body.code,
                location: location.to_string(),
            });
        }
        Ok(body)
    }

    /// The coordinate list from the `rain_report.location_list` entry,
    /// `/`-separated (commas are taken by the `lon,lat` pairs).
    pub fn location_list(&self) -> Result<Vec<String>, WeatherError> {
        let raw = self
            .secrets
            .scoped("location_list")
            .get(SERVICE, "location_list")?;
        Ok(raw
            .split('/')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect())
    }
}
