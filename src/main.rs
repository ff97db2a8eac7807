use std::sync::Arc;

use tracing::{error, info};
use weather_mcp_gateway::{
    amap_client::AmapClient,
    build_app,
    config::Config,
    domain::{fallback::FallbackTable, tools::ToolBackends},
    logging,
    mcp::session::InMemorySessionStore,
    nws_client::NwsClient,
    AppState,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env().inspect_err(|err| error!(error = %err, "invalid configuration"))?;

    let http = reqwest::Client::builder()
        .timeout(config.upstream_timeout)
        .build()?;
    let backends = ToolBackends {
        amap: Arc::new(AmapClient::new(
            http.clone(),
            &config.amap_base_url,
            &config.amap_api_key,
        )),
        nws: Arc::new(NwsClient::new(http, &config.nws_base_url, &config.user_agent)),
        weather_fallback: config
            .weather_fallback
            .then(|| Arc::new(FallbackTable::default())),
    };

    let bind_socket = config.bind_socket()?;
    let state = AppState::new(
        config.transport,
        config.api_token.clone(),
        backends,
        Arc::new(InMemorySessionStore::new()),
        config.keep_alive,
    );
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        mode = %config.transport,
        weather_fallback = config.weather_fallback,
        "server starting"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
