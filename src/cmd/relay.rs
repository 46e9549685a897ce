//! File relay command: `boardcard relay`.

use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use boardcard::board::api::MondayClient;
use boardcard::config::Settings;
use boardcard::relay::{RelayState, ServerConfig, start_server};

pub async fn cmd_relay(settings: Settings, port: Option<u16>) -> Result<()> {
    if settings.api_key.is_none() {
        // Requests are still served; each one reports the missing key.
        warn!("MONDAY_API_KEY is not set; downloads will fail until it is configured");
    }

    let platform = MondayClient::new(settings.api_key.clone().unwrap_or_default())
        .with_api_url(&settings.api_url)
        .with_api_version(&settings.api_version);

    let state = Arc::new(RelayState {
        platform: Arc::new(platform),
        http: reqwest::Client::new(),
        api_key: settings.api_key.clone(),
    });

    let config = ServerConfig {
        port: port.unwrap_or(settings.relay.port),
        client_url: settings.relay.client_url.clone(),
    };
    start_server(config, state).await
}
