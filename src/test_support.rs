//! Canned providers shared by unit and router tests.

use async_trait::async_trait;
use serde_json::json;

use crate::amap_client::{AmapProvider, DailyCast, LocationReport, WeatherReport};
use crate::errors::AppError;
use crate::nws_client::{AlertFeature, AlertProperties, ForecastPeriod, NwsProvider};

/// Answers every lookup with fixed data.
pub struct MockProvider;

/// Fails every lookup as if the network were down.
pub struct OfflineProvider;

pub fn beijing_location() -> LocationReport {
    LocationReport {
        formatted_address: "北京市".to_string(),
        country: "中国".to_string(),
        province: "北京市".to_string(),
        city: "北京市".to_string(),
        district: String::new(),
        adcode: "110000".to_string(),
        location: "116.407387,39.904179".to_string(),
        level: "省".to_string(),
    }
}

#[async_trait]
impl AmapProvider for MockProvider {
    async fn geocode(&self, address: &str) -> Result<LocationReport, AppError> {
        Ok(LocationReport {
            formatted_address: address.to_string(),
            ..beijing_location()
        })
    }

    async fn weather_by_adcode(&self, _adcode: &str) -> Result<WeatherReport, AppError> {
        Ok(WeatherReport {
            city: "北京市".to_string(),
            province: "北京".to_string(),
            reporttime: "2026-10-19 08:00:00".to_string(),
            weather: vec![DailyCast {
                date: "2026-10-19".to_string(),
                week: "1".to_string(),
                dayweather: "晴".to_string(),
                nightweather: "晴".to_string(),
                daytemp: "18".to_string(),
                nighttemp: "6".to_string(),
                daywind: "北".to_string(),
                nightwind: "北".to_string(),
                daypower: "1-3".to_string(),
                nightpower: "1-3".to_string(),
            }],
        })
    }
}

#[async_trait]
impl NwsProvider for MockProvider {
    async fn active_alerts(&self, state_code: &str) -> Result<Vec<AlertFeature>, AppError> {
        if state_code != "CA" {
            return Ok(vec![]);
        }
        Ok(vec![AlertFeature {
            properties: AlertProperties {
                event: Some("Wind Advisory".to_string()),
                area_desc: Some("San Francisco".to_string()),
                severity: Some("Moderate".to_string()),
                status: Some("Actual".to_string()),
                headline: Some("Wind Advisory issued".to_string()),
            },
        }])
    }

    async fn forecast_url(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<String>, AppError> {
        Ok(Some(format!(
            "https://nws.test/gridpoints/{latitude:.2}/{longitude:.2}/forecast"
        )))
    }

    async fn forecast_periods(&self, _forecast_url: &str) -> Result<Vec<ForecastPeriod>, AppError> {
        Ok(vec![
            ForecastPeriod {
                name: Some("This Afternoon".to_string()),
                temperature: Some(json!(64)),
                temperature_unit: Some("F".to_string()),
                wind_speed: Some("15 mph".to_string()),
                wind_direction: Some("WSW".to_string()),
                short_forecast: Some("Sunny".to_string()),
            },
            ForecastPeriod {
                name: Some("Tonight".to_string()),
                temperature: Some(json!(52)),
                temperature_unit: Some("F".to_string()),
                wind_speed: Some("10 mph".to_string()),
                wind_direction: Some("W".to_string()),
                short_forecast: Some("Patchy Fog".to_string()),
            },
        ])
    }
}

#[async_trait]
impl AmapProvider for OfflineProvider {
    async fn geocode(&self, _address: &str) -> Result<LocationReport, AppError> {
        Err(AppError::upstream("Geo API request failed: connection refused"))
    }

    async fn weather_by_adcode(&self, _adcode: &str) -> Result<WeatherReport, AppError> {
        Err(AppError::upstream("Weather API request failed: connection refused"))
    }
}

#[async_trait]
impl NwsProvider for OfflineProvider {
    async fn active_alerts(&self, _state_code: &str) -> Result<Vec<AlertFeature>, AppError> {
        Err(AppError::upstream("connection refused"))
    }

    async fn forecast_url(
        &self,
        _latitude: f64,
        _longitude: f64,
    ) -> Result<Option<String>, AppError> {
        Err(AppError::upstream("connection refused"))
    }

    async fn forecast_periods(&self, _forecast_url: &str) -> Result<Vec<ForecastPeriod>, AppError> {
        Err(AppError::upstream("connection refused"))
    }
}
