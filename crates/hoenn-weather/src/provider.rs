//! Observation fetching.
//!
//! [`ObservationFetcher`] is the seam the engine depends on;
//! [`OpenWeatherProvider`] implements it against the OpenWeatherMap
//! current-weather endpoint.

use async_trait::async_trait;
use hoenn_core::error::ReqwestErrorExt;
use hoenn_core::{NetworkError, WeatherConfig};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::retry::{with_retry, RetryConfig};
use crate::types::{Coordinates, FetchError, Observation};

const CURRENT_WEATHER_PATH: &str = "/data/2.5/weather";
const USER_AGENT: &str = concat!("hoenn-map/", env!("CARGO_PKG_VERSION"));

/// Source of real-world observations for a coordinate
#[async_trait]
pub trait ObservationFetcher: Send + Sync {
    async fn fetch(&self, coords: Coordinates) -> Result<Observation, FetchError>;
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    weather: Vec<WeatherEntry>,
    main: MainReadings,
    wind: WindReadings,
}

#[derive(Debug, Deserialize)]
struct WeatherEntry {
    main: String,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct WindReadings {
    speed: f64,
}

impl TryFrom<CurrentWeatherResponse> for Observation {
    type Error = FetchError;

    fn try_from(body: CurrentWeatherResponse) -> Result<Self, Self::Error> {
        let entry = body
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::Parse("response has no weather entries".into()))?;

        Ok(Observation {
            condition_class: entry.main,
            humidity: body.main.humidity.clamp(0.0, 100.0),
            wind_speed: body.wind.speed.max(0.0),
            temperature_c: body.main.temp,
        })
    }
}

/// OpenWeatherMap client (metric units)
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
    retry: RetryConfig,
}

impl OpenWeatherProvider {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Network(e.into_network_error()))?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            retry,
        })
    }

    pub fn from_config(config: &WeatherConfig, retry: RetryConfig) -> Result<Self, FetchError> {
        if !config.has_api_key() {
            return Err(FetchError::MissingApiKey);
        }
        Self::new(
            &config.base_url,
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
            retry,
        )
    }
}

#[async_trait]
impl ObservationFetcher for OpenWeatherProvider {
    async fn fetch(&self, coords: Coordinates) -> Result<Observation, FetchError> {
        if self.api_key.is_empty() {
            return Err(FetchError::MissingApiKey);
        }

        let url = format!("{}{}", self.base_url, CURRENT_WEATHER_PATH);
        let lat = coords.lat.to_string();
        let lon = coords.lon.to_string();

        let response = with_retry(&self.retry, || {
            self.client
                .get(&url)
                .query(&[
                    ("lat", lat.as_str()),
                    ("lon", lon.as_str()),
                    ("appid", self.api_key.as_str()),
                    ("units", "metric"),
                ])
                .send()
        })
        .await
        .map_err(|e| FetchError::Network(e.into_network_error()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Network(NetworkError::ServerError {
                status: status.as_u16(),
                message,
            }));
        }

        let body: CurrentWeatherResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        let observation = Observation::try_from(body)?;
        tracing::debug!(
            "Observed {} at ({}, {}): {}% humidity, {} m/s wind, {} °C",
            observation.condition_class,
            coords.lat,
            coords.lon,
            observation.humidity,
            observation.wind_speed,
            observation.temperature_c
        );
        Ok(observation)
    }
}
