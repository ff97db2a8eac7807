//! NWS alert and forecast lookups rendered as plain-text blocks.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::errors::AppError;
use crate::nws_client::{AlertFeature, ForecastPeriod, NwsProvider};

static STATE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[A-Za-z]{2}$").expect("static state code pattern"));

/// Accepts exactly two ASCII letters, a subset of the schema's two-character bound.
pub fn normalize_state_code(state: &str) -> Result<String, AppError> {
    if !STATE_CODE.is_match(state) {
        return Err(AppError::bad_request(
            "invalid_state",
            "state must be a two-letter state code (e.g. CA, NY)",
        ));
    }

    Ok(state.to_ascii_uppercase())
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), AppError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(AppError::bad_request(
            "invalid_latitude",
            "latitude must be between -90 and 90",
        ));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::bad_request(
            "invalid_longitude",
            "longitude must be between -180 and 180",
        ));
    }

    Ok(())
}

pub async fn alerts_text(provider: &dyn NwsProvider, state_code: &str) -> Result<String, AppError> {
    let features = provider.active_alerts(state_code).await.map_err(|err| {
        warn!(state = %state_code, error = %err, "alerts lookup failed");
        AppError::upstream("Failed to retrieve alerts data")
    })?;

    if features.is_empty() {
        return Ok(format!("No active alerts for {state_code}"));
    }

    let formatted = features.iter().map(format_alert).collect::<Vec<_>>();
    Ok(format!(
        "Active alerts for {state_code}:\n\n{}",
        formatted.join("\n")
    ))
}

pub async fn forecast_text(
    provider: &dyn NwsProvider,
    latitude: f64,
    longitude: f64,
) -> Result<String, AppError> {
    let forecast_url = provider
        .forecast_url(latitude, longitude)
        .await
        .map_err(|err| {
            warn!(latitude, longitude, error = %err, "grid point lookup failed");
            AppError::upstream(format!(
                "Failed to retrieve grid point data for coordinates: {latitude}, {longitude}. \
                 This location may not be supported by the NWS API (only US locations are supported)."
            ))
        })?
        .ok_or_else(|| AppError::upstream("Failed to get forecast URL from grid point data"))?;

    let periods = provider
        .forecast_periods(&forecast_url)
        .await
        .map_err(|err| {
            warn!(url = %forecast_url, error = %err, "forecast lookup failed");
            AppError::upstream("Failed to retrieve forecast data")
        })?;

    if periods.is_empty() {
        return Ok("No forecast periods available".to_string());
    }

    let formatted = periods.iter().map(format_period).collect::<Vec<_>>();
    Ok(format!(
        "Forecast for {latitude}, {longitude}:\n\n{}",
        formatted.join("\n")
    ))
}

pub fn format_alert(feature: &AlertFeature) -> String {
    let props = &feature.properties;
    [
        format!("Event: {}", props.event.as_deref().unwrap_or("Unknown")),
        format!("Area: {}", props.area_desc.as_deref().unwrap_or("Unknown")),
        format!("Severity: {}", props.severity.as_deref().unwrap_or("Unknown")),
        format!("Status: {}", props.status.as_deref().unwrap_or("Unknown")),
        format!("Headline: {}", props.headline.as_deref().unwrap_or("No headline")),
        "---".to_string(),
    ]
    .join("\n")
}

pub fn format_period(period: &ForecastPeriod) -> String {
    [
        format!("{}:", period.name.as_deref().unwrap_or("Unknown")),
        format!(
            "Temperature: {}°{}",
            temperature_text(period.temperature.as_ref()),
            period.temperature_unit.as_deref().unwrap_or("F")
        ),
        format!(
            "Wind: {} {}",
            period.wind_speed.as_deref().unwrap_or("Unknown"),
            period.wind_direction.as_deref().unwrap_or("")
        ),
        period
            .short_forecast
            .clone()
            .unwrap_or_else(|| "No forecast available".to_string()),
        "---".to_string(),
    ]
    .join("\n")
}

fn temperature_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Object(map)) => match map.get("value") {
            Some(Value::Number(number)) => number.to_string(),
            _ => "Unknown".to_string(),
        },
        Some(Value::String(text)) if !text.is_empty() => text.clone(),
        _ => "Unknown".to_string(),
    }
}
