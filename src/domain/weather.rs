//! AMap-backed lookups: geocode-then-weather for a city, and plain geocoding.

use tracing::warn;

use crate::amap_client::{AmapProvider, LocationReport, WeatherReport};
use crate::domain::fallback::FallbackTable;
use crate::errors::AppError;

pub async fn lookup_city_weather(
    provider: &dyn AmapProvider,
    fallback: Option<&FallbackTable>,
    city: &str,
) -> Result<WeatherReport, AppError> {
    match fetch_city_weather(provider, city).await {
        Ok(report) => Ok(report),
        Err(err @ AppError::Upstream { .. }) => match fallback {
            Some(table) => {
                warn!(city = %city, error = %err, "weather lookup failed, serving fallback data");
                Ok(table.report_now(city))
            }
            None => Err(err),
        },
        Err(err) => Err(err),
    }
}

async fn fetch_city_weather(provider: &dyn AmapProvider, city: &str) -> Result<WeatherReport, AppError> {
    let location = provider
        .geocode(city)
        .await
        .map_err(|err| match err {
            AppError::Upstream { message } => {
                AppError::upstream(format!("Failed to get city geocode: {message}"))
            }
            other => other,
        })?;

    if location.adcode.is_empty() {
        return Err(AppError::upstream("Failed to get city geocode: missing adcode"));
    }

    provider.weather_by_adcode(&location.adcode).await
}

pub async fn lookup_location(
    provider: &dyn AmapProvider,
    address: &str,
) -> Result<LocationReport, AppError> {
    provider.geocode(address).await
}

pub fn normalize_place(value: &str, field: &'static str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::bad_request(
            "invalid_argument",
            format!("{field} must not be empty"),
        ));
    }

    Ok(trimmed.to_string())
}
