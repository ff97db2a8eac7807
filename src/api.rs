//! Plain REST weather endpoints sharing the AMap lookup and fallback policy with the MCP tools.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::amap_client::WeatherReport;
use crate::domain::weather::{lookup_city_weather, normalize_place};
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WeatherRequest {
    #[serde(default)]
    pub city: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WeatherEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<WeatherReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub async fn weather_by_body(
    State(state): State<AppState>,
    request: Result<Json<WeatherRequest>, JsonRejection>,
) -> Response {
    match request {
        Ok(Json(request)) => respond(&state, request.city.as_deref().unwrap_or_default()).await,
        Err(rejection) => failure(StatusCode::BAD_REQUEST, rejection.body_text()),
    }
}

pub async fn weather_by_path(State(state): State<AppState>, Path(city): Path<String>) -> Response {
    respond(&state, &city).await
}

async fn respond(state: &AppState, city: &str) -> Response {
    match weather_for(state, city).await {
        Ok(report) => (
            StatusCode::OK,
            Json(WeatherEnvelope {
                success: true,
                data: Some(report),
                message: None,
            }),
        )
            .into_response(),
        Err(err) => {
            let (status, message) = match err {
                AppError::BadRequest { message, .. } => (StatusCode::BAD_REQUEST, message),
                AppError::Upstream { message } => (StatusCode::BAD_GATEWAY, message),
                other => return other.into_response(),
            };
            failure(status, message)
        }
    }
}

fn failure(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(WeatherEnvelope {
            success: false,
            data: None,
            message: Some(message),
        }),
    )
        .into_response()
}

async fn weather_for(state: &AppState, city: &str) -> Result<WeatherReport, AppError> {
    let city = normalize_place(city, "city")?;
    info!(city = %city, "rest weather request");
    lookup_city_weather(
        state.backends.amap.as_ref(),
        state.backends.weather_fallback.as_deref(),
        &city,
    )
    .await
}
