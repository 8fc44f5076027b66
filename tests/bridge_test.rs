mod common;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use webhook_bridge::{
    Bridge, BridgeConfig, ChatSummary, DispatchError, DomainEvent, DownloadedMedia, HasMedia,
    MediaConfig, MediaMarker,
};

use common::ScriptedTransport;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct InboundMessage {
    id: String,
    body: String,
    has_media: bool,
    media: MediaMarker,
}

impl InboundMessage {
    fn with_media(id: &str) -> Self {
        Self {
            id: id.to_string(),
            body: String::new(),
            has_media: true,
            media: MediaMarker::unsaved(),
        }
    }
}

impl HasMedia for InboundMessage {
    fn media_marker_mut(&mut self) -> &mut MediaMarker {
        &mut self.media
    }
}

async fn start_bridge(dir: &tempfile::TempDir) -> (Bridge, Arc<ScriptedTransport>) {
    let config = BridgeConfig {
        media: MediaConfig::new(dir.path()),
        sweep_interval: Duration::from_secs(3600),
        ..Default::default()
    };
    let transport = Arc::new(ScriptedTransport::new());
    let bridge = Bridge::with_transport(config, transport.clone()).await.unwrap();
    (bridge, transport)
}

#[tokio::test]
async fn test_media_is_stored_before_listeners_see_the_event() {
    let dir = tempfile::tempdir().unwrap();
    let (bridge, transport) = start_bridge(&dir).await;
    bridge.listeners().add("http://x/hook").await.unwrap();

    let download = async {
        Ok::<_, String>(Some(DownloadedMedia::new(b"jpeg-bytes".to_vec(), "image/jpeg")))
    };
    let report = bridge
        .publish_with_media("message", InboundMessage::with_media("m1"), download)
        .await
        .unwrap();
    assert_eq!(report.delivered.len(), 1);

    let deliveries = transport.deliveries();
    let (_, envelope) = &deliveries[0];
    assert_eq!(envelope["type"], "message");
    let media = &envelope["data"]["media"];
    assert_eq!(media["saved"], true);
    assert_eq!(media["mimeType"], "image/jpeg");

    let file_name = media["fileName"].as_str().unwrap();
    let path = bridge.media().resolve_file_name(file_name).await.unwrap();
    assert_eq!(std::fs::read(path).unwrap(), b"jpeg-bytes");

    bridge.shutdown().await;
}

#[tokio::test]
async fn test_failed_download_delivers_unsaved_marker() {
    let dir = tempfile::tempdir().unwrap();
    let (bridge, transport) = start_bridge(&dir).await;
    bridge.listeners().add("http://x/hook").await.unwrap();

    let mut message = InboundMessage::with_media("m2");
    // A marker claiming to be saved is reset before download.
    message.media.saved = true;

    let download = async { Err::<Option<DownloadedMedia>, _>("download interrupted") };
    bridge
        .publish_with_media("message", message, download)
        .await
        .unwrap();

    let deliveries = transport.deliveries();
    let (_, envelope) = &deliveries[0];
    assert_eq!(
        envelope["data"]["media"],
        json!({ "saved": false, "id": null, "fileName": null, "mimeType": null })
    );
    assert!(bridge.media().is_empty().await);

    bridge.shutdown().await;
}

#[tokio::test]
async fn test_publish_after_shutdown_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (bridge, transport) = start_bridge(&dir).await;
    bridge.listeners().add("http://x/hook").await.unwrap();

    bridge.shutdown().await;

    let result = bridge
        .publish(&DomainEvent::new("ready", json!({})))
        .await;
    assert_eq!(result, Err(DispatchError::Shutdown));
    assert!(transport.deliveries().is_empty());
}

#[tokio::test]
async fn test_chat_cache_is_shared_through_the_bridge() {
    let dir = tempfile::tempdir().unwrap();
    let (bridge, _transport) = start_bridge(&dir).await;

    let chat = ChatSummary {
        id: "123@g.us".to_string(),
        name: "Team".to_string(),
        is_group: true,
        unread_count: 2,
    };
    let resolved = bridge
        .chats()
        .get_or_try_insert_with("123@g.us", || async { Ok::<_, String>(chat.clone()) })
        .await
        .unwrap();

    assert_eq!(resolved, chat);
    assert_eq!(bridge.chats().get("123@g.us").await, Some(chat));
    assert!(bridge.contacts().is_empty().await);

    bridge.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_background_sweep_evicts_idle_media() {
    let dir = tempfile::tempdir().unwrap();
    let config = BridgeConfig {
        media: MediaConfig::new(dir.path()).with_max_idle(Duration::from_secs(2)),
        sweep_interval: Duration::from_secs(1),
        ..Default::default()
    };
    let bridge = Bridge::with_transport(config, Arc::new(ScriptedTransport::new()))
        .await
        .unwrap();

    let id = bridge.media().save_upload(b"png-bytes", "image/png").await.unwrap();
    let path = bridge.media().resolve(id.as_str()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(bridge.media().resolve(id.as_str()).await.is_some());

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(bridge.media().resolve(id.as_str()).await, None);
    assert!(!path.exists());

    bridge.shutdown().await;
}

#[tokio::test]
async fn test_registry_uses_configured_failure_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = BridgeConfig {
        media: MediaConfig::new(dir.path()),
        ..Default::default()
    };
    config.dispatcher.failure_threshold = 5;
    let bridge = Bridge::with_transport(config, Arc::new(ScriptedTransport::new()))
        .await
        .unwrap();

    assert_eq!(bridge.listeners().failure_threshold(), 5);

    bridge.shutdown().await;
}
