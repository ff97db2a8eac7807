//! The central Model Context Protocol engine
//!
//! Provides the JSON-RPC decoding, method routing, capabilities negotiation
//! (`initialize`) and tool routing shared by both transports.

use rust_mcp_sdk::schema::{
    CallToolRequestParams, Implementation, InitializeResult, JsonrpcMessage, ServerCapabilities,
    ServerCapabilitiesTools,
};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::domain::tools::{build_tools_list, call_tool, ToolBackends};
use crate::errors::AppError;
use crate::mcp::rpc::{
    app_error_to_json_rpc, is_json_rpc_error, json_rpc_error, json_rpc_notification,
    json_rpc_result, request_id_to_value, INTERNAL_ERROR, INVALID_REQUEST, SERVER_ERROR,
};

pub const LATEST_PROTOCOL_VERSION: &str = "2025-03-26";
pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 2] = [LATEST_PROTOCOL_VERSION, "2024-11-05"];
pub const SERVER_NAME: &str = "weather-mcp-server";

/// Routes JSON-RPC messages to the tool layer. Holds no per-call state, so a
/// fresh instance per request and a long-lived one per session behave the same.
pub struct Dispatcher {
    backends: ToolBackends,
}

impl Dispatcher {
    pub fn new(backends: ToolBackends) -> Self {
        Self { backends }
    }

    /// Handles one request object or a batch. `None` means nothing is owed to
    /// the client (notifications only).
    pub async fn handle_json_rpc_value(&self, payload: Value) -> Option<Value> {
        if let Some(batch) = payload.as_array() {
            if batch.is_empty() {
                return Some(Value::Array(vec![json_rpc_error(
                    None,
                    INVALID_REQUEST,
                    "Invalid Request",
                )]));
            }

            let mut responses = Vec::new();
            for item in batch {
                if let Some(response) = self.handle_single(item.clone()).await {
                    responses.push(response);
                }
            }

            return (!responses.is_empty()).then_some(Value::Array(responses));
        }

        self.handle_single(payload).await
    }

    async fn handle_single(&self, payload: Value) -> Option<Value> {
        if !payload.is_object() {
            return Some(json_rpc_error(None, INVALID_REQUEST, "Invalid Request"));
        }

        let request_id = payload.get("id").cloned();
        let parsed: JsonrpcMessage = match serde_json::from_value(payload) {
            Ok(message) => message,
            Err(_) => return Some(json_rpc_error(request_id, INVALID_REQUEST, "Invalid Request")),
        };

        match parsed {
            JsonrpcMessage::Request(request) => {
                let request_id = request_id_to_value(request.id);
                if request.method.trim().is_empty() {
                    return Some(json_rpc_error(
                        Some(request_id),
                        INVALID_REQUEST,
                        "Invalid Request",
                    ));
                }

                Some(
                    self.handle_json_rpc_request(
                        Some(request_id),
                        request.method,
                        request.params.map(Value::Object),
                    )
                    .await,
                )
            }
            JsonrpcMessage::Notification(notification) => {
                debug!(method = %notification.method, "notification received");
                None
            }
            JsonrpcMessage::ResultResponse(_) | JsonrpcMessage::ErrorResponse(_) => {
                Some(json_rpc_error(request_id, INVALID_REQUEST, "Invalid Request"))
            }
        }
    }

    pub async fn handle_json_rpc_request(
        &self,
        id: Option<Value>,
        method: String,
        params: Option<Value>,
    ) -> Value {
        let audit_params = redact_audit_params(params.as_ref());

        let response = match self.route(id.clone(), &method, params).await {
            Ok(response) => response,
            Err(err) => app_error_to_json_rpc(id, err),
        };

        info!(
            method = %method,
            params = %audit_params,
            outcome = if is_json_rpc_error(&response) { "failure" } else { "success" },
            "mcp action audited"
        );

        response
    }

    async fn route(
        &self,
        id: Option<Value>,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, AppError> {
        let response = match method {
            "initialize" => {
                let version = negotiate_protocol_version(params.as_ref())?;
                json_rpc_result(id, serde_json::to_value(initialize_result(version))?)
            }
            "ping" => json_rpc_result(id, json!({})),
            "tools/list" => json_rpc_result(id, json!({ "tools": build_tools_list() })),
            "tools/call" => {
                let Some(raw_params) = params else {
                    return Err(AppError::bad_request(
                        "invalid_params",
                        "tools/call requires params",
                    ));
                };
                let tool_call: CallToolRequestParams = serde_json::from_value(raw_params)
                    .map_err(|err| AppError::bad_request("invalid_params", err.to_string()))?;

                let result = call_tool(
                    &self.backends,
                    &tool_call.name,
                    tool_call.arguments.unwrap_or_default(),
                )
                .await?;
                json_rpc_result(id, serde_json::to_value(result)?)
            }
            _ => json_rpc_error(id, SERVER_ERROR, &format!("Unknown method: {method}")),
        };

        Ok(response)
    }
}

pub fn initialize_result(protocol_version: &str) -> InitializeResult {
    InitializeResult {
        server_info: Implementation {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: None,
            description: None,
            icons: vec![],
            website_url: None,
        },
        capabilities: ServerCapabilities {
            tools: Some(ServerCapabilitiesTools {
                list_changed: Some(false),
            }),
            ..Default::default()
        },
        protocol_version: protocol_version.to_string(),
        instructions: None,
        meta: None,
    }
}

/// The first event pushed on a stateful channel; carries the id the client
/// must echo in the `Mcp-Session-Id` header.
pub fn initialize_notification(session_id: &str) -> Result<Value, AppError> {
    let mut params = serde_json::to_value(initialize_result(LATEST_PROTOCOL_VERSION))?;
    if let Some(object) = params.as_object_mut() {
        object.insert("sessionId".to_string(), Value::String(session_id.to_string()));
    }

    Ok(json_rpc_notification("initialize", params))
}

pub fn negotiate_protocol_version(params: Option<&Value>) -> Result<&'static str, AppError> {
    let offered = params
        .and_then(Value::as_object)
        .and_then(|object| object.get("protocolVersion"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|version| !version.is_empty());

    let Some(offered) = offered else {
        return Ok(LATEST_PROTOCOL_VERSION);
    };

    SUPPORTED_PROTOCOL_VERSIONS
        .into_iter()
        .find(|supported| *supported == offered)
        .ok_or_else(|| {
            AppError::bad_request(
                "unsupported_protocol_version",
                "unsupported initialize protocolVersion",
            )
        })
}

/// True when the response, or any entry of a batch response, is a `-32603` fault.
pub fn is_internal_error(value: &Value) -> bool {
    if let Some(batch) = value.as_array() {
        return batch.iter().any(is_internal_error);
    }

    value
        .get("error")
        .and_then(|error| error.get("code"))
        .and_then(Value::as_i64)
        == Some(i64::from(INTERNAL_ERROR))
}

pub fn redact_audit_params(params: Option<&Value>) -> Value {
    params.map(redact_audit_value).unwrap_or(Value::Null)
}

pub fn redact_audit_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String("[REDACTED]".to_string()))
                    } else {
                        (key.clone(), redact_audit_value(item))
                    }
                })
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_audit_value).collect()),
        _ => value.clone(),
    }
}

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase();
    matches!(
        normalized.as_str(),
        "key" | "api_key" | "apikey" | "authorization" | "password"
    ) || normalized.contains("token")
        || normalized.contains("secret")
        || normalized.contains("credential")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::domain::tools::tool_names;
    use crate::test_support::OfflineProvider;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(ToolBackends {
            amap: Arc::new(OfflineProvider),
            nws: Arc::new(OfflineProvider),
            weather_fallback: None,
        })
    }

    #[test]
    fn redacts_sensitive_fields_in_audit_params() {
        let params = json!({
            "name": "get_weather",
            "arguments": {
                "city": "北京",
                "key": "should-not-appear",
                "api_key": "should-not-appear",
                "nested": {
                    "secret": "should-not-appear"
                }
            }
        });

        let redacted = redact_audit_params(Some(&params));

        assert_eq!(redacted["name"], json!("get_weather"));
        assert_eq!(redacted["arguments"]["city"], json!("北京"));
        assert_eq!(redacted["arguments"]["key"], json!("[REDACTED]"));
        assert_eq!(redacted["arguments"]["api_key"], json!("[REDACTED]"));
        assert_eq!(
            redacted["arguments"]["nested"]["secret"],
            json!("[REDACTED]")
        );
    }

    #[test]
    fn negotiate_protocol_version_echoes_supported_versions() {
        for version in SUPPORTED_PROTOCOL_VERSIONS {
            let params = json!({ "protocolVersion": version });
            assert_eq!(
                negotiate_protocol_version(Some(&params)).expect("supported version"),
                version
            );
        }
        assert_eq!(
            negotiate_protocol_version(None).expect("default version"),
            LATEST_PROTOCOL_VERSION
        );
    }

    #[test]
    fn negotiate_protocol_version_rejects_unsupported_version() {
        let params = json!({ "protocolVersion": "2023-01-01" });

        let error =
            negotiate_protocol_version(Some(&params)).expect_err("unsupported version must fail");
        assert!(error.to_string().contains("bad request"));
    }

    #[tokio::test]
    async fn tools_list_matches_registry() {
        let response = dispatcher()
            .handle_json_rpc_value(json!({"jsonrpc":"2.0","id":4,"method":"tools/list"}))
            .await
            .expect("response");

        let names = response["result"]["tools"]
            .as_array()
            .expect("tools array")
            .iter()
            .map(|tool| tool["name"].as_str().expect("name").to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, tool_names());
        assert_eq!(response["id"], 4);
    }

    #[tokio::test]
    async fn unknown_tool_is_error_result_with_same_id() {
        let response = dispatcher()
            .handle_json_rpc_value(json!({
                "jsonrpc": "2.0",
                "id": "call-9",
                "method": "tools/call",
                "params": { "name": "get_horoscope", "arguments": {} }
            }))
            .await
            .expect("response");

        assert_eq!(response["id"], "call-9");
        assert!(response.get("error").is_none());
        assert_eq!(response["result"]["isError"], true);
        assert_eq!(response["result"]["content"][0]["text"], "Unknown tool: get_horoscope");
    }

    #[tokio::test]
    async fn unknown_method_is_server_error() {
        let response = dispatcher()
            .handle_json_rpc_value(json!({"jsonrpc":"2.0","id":1,"method":"resources/list"}))
            .await
            .expect("response");

        assert_eq!(response["error"]["code"], SERVER_ERROR);
        assert_eq!(response["error"]["message"], "Unknown method: resources/list");
        assert_eq!(response["id"], 1);
    }

    #[tokio::test]
    async fn upstream_failure_is_error_result_not_fault() {
        let response = dispatcher()
            .handle_json_rpc_value(json!({
                "jsonrpc": "2.0",
                "id": 2,
                "method": "tools/call",
                "params": { "name": "get_weather", "arguments": { "city": "北京" } }
            }))
            .await
            .expect("response");

        assert_eq!(response["result"]["isError"], true);
        assert!(response["result"]["content"][0]["text"]
            .as_str()
            .expect("text")
            .starts_with("Failed to get city geocode"));
    }

    #[tokio::test]
    async fn invalid_arguments_are_invalid_params() {
        let response = dispatcher()
            .handle_json_rpc_value(json!({
                "jsonrpc": "2.0",
                "id": 3,
                "method": "tools/call",
                "params": { "name": "get-forecast", "arguments": { "latitude": 95.0, "longitude": 0.0 } }
            }))
            .await
            .expect("response");

        assert_eq!(response["error"]["code"], -32602);
        assert_eq!(response["error"]["data"]["code"], "invalid_latitude");
    }

    #[tokio::test]
    async fn notifications_and_batches() {
        let dispatcher = dispatcher();

        let none = dispatcher
            .handle_json_rpc_value(json!({"jsonrpc":"2.0","method":"notifications/initialized"}))
            .await;
        assert!(none.is_none());

        let batch = dispatcher
            .handle_json_rpc_value(json!([
                {"jsonrpc":"2.0","id":1,"method":"ping"},
                {"jsonrpc":"2.0","method":"notifications/initialized"},
                {"jsonrpc":"2.0","id":2,"method":"tools/list"}
            ]))
            .await
            .expect("batch response");
        let batch = batch.as_array().expect("array");
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0]["id"], 1);
        assert_eq!(batch[1]["id"], 2);

        let empty = dispatcher
            .handle_json_rpc_value(json!([]))
            .await
            .expect("error response");
        assert_eq!(empty[0]["error"]["code"], INVALID_REQUEST);
    }

    #[test]
    fn internal_error_detection_covers_batches() {
        let fault = json_rpc_error(Some(json!(2)), INTERNAL_ERROR, "Internal error");
        let ok = json_rpc_result(Some(json!(1)), json!({}));

        assert!(is_internal_error(&fault));
        assert!(!is_internal_error(&ok));
        assert!(is_internal_error(&Value::Array(vec![ok.clone(), fault])));
        assert!(!is_internal_error(&Value::Array(vec![ok])));
    }

    #[test]
    fn initialize_notification_carries_session_id() {
        let value = initialize_notification("abc-123").expect("notification");
        assert_eq!(value["method"], "initialize");
        assert_eq!(value["params"]["sessionId"], "abc-123");
        assert_eq!(value["params"]["protocolVersion"], LATEST_PROTOCOL_VERSION);
        assert_eq!(value["params"]["serverInfo"]["name"], SERVER_NAME);
        assert!(value.get("id").is_none());
    }
}
