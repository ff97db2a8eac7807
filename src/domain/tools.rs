//! Tool registry and invocation
//!
//! Declares the four weather/geocoding tools with their fixed input schemas and
//! routes `tools/call` invocations to the AMap and NWS providers.

use std::sync::Arc;

use rust_mcp_sdk::schema::{CallToolResult, ContentBlock, TextContent};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::amap_client::AmapProvider;
use crate::domain::{
    fallback::FallbackTable,
    forecast::{alerts_text, forecast_text, normalize_state_code, validate_coordinates},
    weather::{lookup_city_weather, lookup_location, normalize_place},
};
use crate::errors::AppError;
use crate::nws_client::NwsProvider;

pub const GET_WEATHER: &str = "get_weather";
pub const GET_LOCATION: &str = "get_location";
pub const GET_ALERTS: &str = "get-alerts";
pub const GET_FORECAST: &str = "get-forecast";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Upstream collaborators a dispatcher needs to execute tools.
#[derive(Clone)]
pub struct ToolBackends {
    pub amap: Arc<dyn AmapProvider>,
    pub nws: Arc<dyn NwsProvider>,
    pub weather_fallback: Option<Arc<FallbackTable>>,
}

#[derive(Debug, Deserialize)]
struct WeatherArgs {
    city: String,
}

#[derive(Debug, Deserialize)]
struct LocationArgs {
    address: String,
}

#[derive(Debug, Deserialize)]
struct AlertsArgs {
    state: String,
}

#[derive(Debug, Deserialize)]
struct ForecastArgs {
    latitude: f64,
    longitude: f64,
}

pub fn build_tools_list() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: GET_WEATHER,
            description: "获取指定城市的天气预报信息",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "city": {
                        "type": "string",
                        "description": "要查询天气的城市名称，例如：北京、上海、广州"
                    }
                },
                "required": ["city"]
            }),
        },
        ToolDescriptor {
            name: GET_LOCATION,
            description: "获取指定地址的地理编码信息",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "address": {
                        "type": "string",
                        "description": "要查询的地址，例如：北京市朝阳区"
                    }
                },
                "required": ["address"]
            }),
        },
        ToolDescriptor {
            name: GET_ALERTS,
            description: "Get weather alerts for a state",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "state": {
                        "type": "string",
                        "minLength": 2,
                        "maxLength": 2,
                        "description": "Two-letter state code (e.g. CA, NY)"
                    }
                },
                "required": ["state"],
                "additionalProperties": false
            }),
        },
        ToolDescriptor {
            name: GET_FORECAST,
            description: "Get weather forecast for a location",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "latitude": {
                        "type": "number",
                        "minimum": -90,
                        "maximum": 90,
                        "description": "Latitude of the location"
                    },
                    "longitude": {
                        "type": "number",
                        "minimum": -180,
                        "maximum": 180,
                        "description": "Longitude of the location"
                    }
                },
                "required": ["latitude", "longitude"],
                "additionalProperties": false
            }),
        },
    ]
}

pub fn tool_names() -> Vec<&'static str> {
    build_tools_list().into_iter().map(|tool| tool.name).collect()
}

/// Runs one tool. Upstream failures and unknown names come back as `isError`
/// results; only argument and internal faults are `Err`.
pub async fn call_tool(
    backends: &ToolBackends,
    name: &str,
    arguments: Map<String, Value>,
) -> Result<CallToolResult, AppError> {
    match name {
        GET_WEATHER => {
            let args: WeatherArgs = parse_arguments(arguments)?;
            let city = normalize_place(&args.city, "city")?;
            let outcome = lookup_city_weather(
                backends.amap.as_ref(),
                backends.weather_fallback.as_deref(),
                &city,
            )
            .await;
            json_outcome(name, outcome)
        }
        GET_LOCATION => {
            let args: LocationArgs = parse_arguments(arguments)?;
            let address = normalize_place(&args.address, "address")?;
            let outcome = lookup_location(backends.amap.as_ref(), &address).await;
            json_outcome(name, outcome)
        }
        GET_ALERTS => {
            let args: AlertsArgs = parse_arguments(arguments)?;
            let state_code = normalize_state_code(&args.state)?;
            text_outcome(name, alerts_text(backends.nws.as_ref(), &state_code).await)
        }
        GET_FORECAST => {
            let args: ForecastArgs = parse_arguments(arguments)?;
            validate_coordinates(args.latitude, args.longitude)?;
            text_outcome(
                name,
                forecast_text(backends.nws.as_ref(), args.latitude, args.longitude).await,
            )
        }
        _ => Ok(text_result(format!("Unknown tool: {name}"), true, None)),
    }
}

fn parse_arguments<T: DeserializeOwned>(arguments: Map<String, Value>) -> Result<T, AppError> {
    serde_json::from_value(Value::Object(arguments))
        .map_err(|err| AppError::bad_request("invalid_arguments", err.to_string()))
}

fn json_outcome<T: Serialize>(
    tool: &str,
    outcome: Result<T, AppError>,
) -> Result<CallToolResult, AppError> {
    match outcome {
        Ok(payload) => {
            let text = serde_json::to_string_pretty(&payload)?;
            let structured = serde_json::to_value(&payload)?.as_object().cloned();
            Ok(text_result(text, false, structured))
        }
        Err(err) => upstream_failure(tool, err),
    }
}

fn text_outcome(tool: &str, outcome: Result<String, AppError>) -> Result<CallToolResult, AppError> {
    match outcome {
        Ok(text) => Ok(text_result(text, false, None)),
        Err(err) => upstream_failure(tool, err),
    }
}

fn upstream_failure(tool: &str, err: AppError) -> Result<CallToolResult, AppError> {
    match err {
        AppError::Upstream { message } => {
            warn!(tool = %tool, error = %message, "tool call failed upstream");
            Ok(text_result(message, true, None))
        }
        other => Err(other),
    }
}

pub fn text_result(
    text: String,
    is_error: bool,
    structured_content: Option<Map<String, Value>>,
) -> CallToolResult {
    CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(text, None, None))],
        is_error: Some(is_error),
        meta: None,
        structured_content,
    }
}
