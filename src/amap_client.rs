//! AMap (Gaode) REST client for geocoding and city weather forecasts.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocationReport {
    pub formatted_address: String,
    pub country: String,
    pub province: String,
    pub city: String,
    pub district: String,
    pub adcode: String,
    pub location: String,
    pub level: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WeatherReport {
    pub city: String,
    pub province: String,
    pub reporttime: String,
    pub weather: Vec<DailyCast>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyCast {
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub week: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dayweather: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub nightweather: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub daytemp: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub nighttemp: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub daywind: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub nightwind: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub daypower: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub nightpower: String,
}

#[async_trait]
pub trait AmapProvider: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<LocationReport, AppError>;
    async fn weather_by_adcode(&self, adcode: &str) -> Result<WeatherReport, AppError>;
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodeResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    status: String,
    #[serde(default, deserialize_with = "lenient_string")]
    info: String,
    #[serde(default)]
    geocodes: Vec<RawGeocode>,
}

#[derive(Debug, Deserialize)]
struct RawGeocode {
    #[serde(default, deserialize_with = "lenient_string")]
    formatted_address: String,
    #[serde(default, deserialize_with = "lenient_string")]
    country: String,
    #[serde(default, deserialize_with = "lenient_string")]
    province: String,
    #[serde(default, deserialize_with = "lenient_string")]
    city: String,
    #[serde(default, deserialize_with = "lenient_string")]
    district: String,
    #[serde(default, deserialize_with = "lenient_string")]
    adcode: String,
    #[serde(default, deserialize_with = "lenient_string")]
    location: String,
    #[serde(default, deserialize_with = "lenient_string")]
    level: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WeatherInfoResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    status: String,
    #[serde(default, deserialize_with = "lenient_string")]
    info: String,
    #[serde(default)]
    forecasts: Vec<RawForecast>,
}

#[derive(Debug, Deserialize)]
struct RawForecast {
    #[serde(default, deserialize_with = "lenient_string")]
    city: String,
    #[serde(default, deserialize_with = "lenient_string")]
    province: String,
    #[serde(default, deserialize_with = "lenient_string")]
    reporttime: String,
    #[serde(default)]
    casts: Vec<DailyCast>,
}

pub struct AmapClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl AmapClient {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    async fn get_json<T>(&self, path: &str, query: &[(&str, &str)], label: &str) -> Result<T, AppError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.base_url, path);
        // The query string carries the API key, so reqwest errors never reach callers as-is.
        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|err| request_failure(label, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::upstream(format!(
                "{label} request failed: {status}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|err| request_failure(label, err))
    }
}

#[async_trait]
impl AmapProvider for AmapClient {
    async fn geocode(&self, address: &str) -> Result<LocationReport, AppError> {
        debug!(address = %address, "amap geocode request");
        let response: GeocodeResponse = self
            .get_json("/v3/geocode/geo", &[("address", address)], "Geo API")
            .await?;
        location_from_response(response)
    }

    async fn weather_by_adcode(&self, adcode: &str) -> Result<WeatherReport, AppError> {
        debug!(adcode = %adcode, "amap weather request");
        let response: WeatherInfoResponse = self
            .get_json(
                "/v3/weather/weatherInfo",
                &[("city", adcode), ("extensions", "all")],
                "Weather API",
            )
            .await?;
        weather_from_response(response)
    }
}

fn request_failure(label: &str, err: reqwest::Error) -> AppError {
    warn!(api = %label, error = %err.without_url(), "amap request failed");
    AppError::upstream(format!("{label} request failed"))
}

pub(crate) fn location_from_response(response: GeocodeResponse) -> Result<LocationReport, AppError> {
    if response.status != "1" {
        return Err(AppError::upstream(format!(
            "No location data found: {}",
            response.info
        )));
    }

    let geocode = response
        .geocodes
        .into_iter()
        .next()
        .ok_or_else(|| AppError::upstream("No location data found"))?;

    Ok(LocationReport {
        formatted_address: geocode.formatted_address,
        country: geocode.country,
        province: geocode.province,
        city: geocode.city,
        district: geocode.district,
        adcode: geocode.adcode,
        location: geocode.location,
        level: geocode.level,
    })
}

pub(crate) fn weather_from_response(
    response: WeatherInfoResponse,
) -> Result<WeatherReport, AppError> {
    if response.status != "1" {
        return Err(AppError::upstream(format!(
            "Weather data unavailable: {}",
            response.info
        )));
    }

    let forecast = response
        .forecasts
        .into_iter()
        .next()
        .ok_or_else(|| AppError::upstream("No weather data found"))?;

    Ok(WeatherReport {
        city: forecast.city,
        province: forecast.province,
        reporttime: forecast.reporttime,
        weather: forecast.casts,
    })
}

/// AMap encodes empty text fields as `[]` and occasionally numbers as JSON numbers.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(","),
        Value::Null | Value::Object(_) => String::new(),
    })
}
