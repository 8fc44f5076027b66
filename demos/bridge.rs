use std::time::Duration;

use serde_json::json;
use webhook_bridge::{Bridge, BridgeConfig, DomainEvent};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let mut config = BridgeConfig::from_env()?;
    config.sweep_interval = Duration::from_secs(30);
    let bridge = Bridge::new(config).await?;

    bridge.listeners().add("http://127.0.0.1:8080/webhook").await?;

    let id = bridge.media().save_upload(b"hello", "text/plain").await?;
    tracing::info!(media_id = %id, "uploaded outgoing media");

    let event = DomainEvent::new("message", json!({ "id": "1", "body": "hi" }));
    let report = bridge.publish(&event).await?;
    tracing::info!(
        delivered = report.delivered.len(),
        failed = report.failed.len(),
        "dispatch finished"
    );

    bridge.media().consume(id.as_str()).await;
    bridge.shutdown().await;
    Ok(())
}
