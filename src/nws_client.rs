//! US National Weather Service client (alerts, grid points and forecasts).

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::debug;

use crate::errors::AppError;

const GEO_JSON: &str = "application/geo+json";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertFeature {
    #[serde(default)]
    pub properties: AlertProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertProperties {
    pub event: Option<String>,
    #[serde(rename = "areaDesc")]
    pub area_desc: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
    pub headline: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastPeriod {
    pub name: Option<String>,
    /// Plain number on the legacy schema, `{ "value": n }` on the quantitative one.
    pub temperature: Option<Value>,
    #[serde(rename = "temperatureUnit")]
    pub temperature_unit: Option<String>,
    #[serde(rename = "windSpeed")]
    pub wind_speed: Option<String>,
    #[serde(rename = "windDirection")]
    pub wind_direction: Option<String>,
    #[serde(rename = "shortForecast")]
    pub short_forecast: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlertsResponse {
    #[serde(default)]
    features: Vec<AlertFeature>,
}

#[derive(Debug, Deserialize)]
struct PointsResponse {
    #[serde(default)]
    properties: Option<PointsProperties>,
}

#[derive(Debug, Deserialize)]
struct PointsProperties {
    forecast: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    properties: Option<ForecastProperties>,
}

#[derive(Debug, Deserialize)]
struct ForecastProperties {
    #[serde(default)]
    periods: Vec<ForecastPeriod>,
}

#[async_trait]
pub trait NwsProvider: Send + Sync {
    async fn active_alerts(&self, state_code: &str) -> Result<Vec<AlertFeature>, AppError>;
    /// `Ok(None)` when the grid point exists but carries no forecast link.
    async fn forecast_url(&self, latitude: f64, longitude: f64)
        -> Result<Option<String>, AppError>;
    async fn forecast_periods(&self, forecast_url: &str) -> Result<Vec<ForecastPeriod>, AppError>;
}

pub struct NwsClient {
    client: Client,
    base_url: String,
    user_agent: String,
}

impl NwsClient {
    pub fn new(client: Client, base_url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_agent: user_agent.into(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, AppError> {
        debug!(url = %url, "nws request");
        let response = self
            .client
            .get(url)
            .header(header::USER_AGENT, &self.user_agent)
            .header(header::ACCEPT, GEO_JSON)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::upstream(format!("NWS request failed: {status}")));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl NwsProvider for NwsClient {
    async fn active_alerts(&self, state_code: &str) -> Result<Vec<AlertFeature>, AppError> {
        let url = format!("{}/alerts?area={}", self.base_url, state_code);
        let response: AlertsResponse = self.get_json(&url).await?;
        Ok(response.features)
    }

    async fn forecast_url(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<String>, AppError> {
        let url = points_url(&self.base_url, latitude, longitude);
        let response: PointsResponse = self.get_json(&url).await?;
        Ok(response
            .properties
            .and_then(|properties| properties.forecast)
            .filter(|forecast| !forecast.is_empty()))
    }

    async fn forecast_periods(&self, forecast_url: &str) -> Result<Vec<ForecastPeriod>, AppError> {
        let response: ForecastResponse = self.get_json(forecast_url).await?;
        Ok(response
            .properties
            .map(|properties| properties.periods)
            .unwrap_or_default())
    }
}

pub fn points_url(base_url: &str, latitude: f64, longitude: f64) -> String {
    format!("{base_url}/points/{latitude:.4},{longitude:.4}")
}
