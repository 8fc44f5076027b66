use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::cache::LookupCache;
use crate::config::BridgeConfig;
use crate::dispatcher::{DispatchReport, EventDispatcher};
use crate::error::{DispatchError, MediaError};
use crate::media::MediaStore;
use crate::registry::ListenerRegistry;
use crate::sweeper::{Sweep, Sweeper, SweeperHandle};
use crate::transport::{HttpTransport, Transport};
use crate::types::{ChatSummary, Contact, DomainEvent, DownloadedMedia, MediaMarker};

/// Event payloads that point at a downloaded attachment.
pub trait HasMedia {
    fn media_marker_mut(&mut self) -> &mut MediaMarker;
}

/// The components of one bridge process, constructed once and shared by
/// handle.
///
/// Owns the listener registry, dispatcher, media store and lookup caches,
/// plus the background sweep over the TTL-indexed stores.
pub struct Bridge {
    registry: Arc<ListenerRegistry>,
    dispatcher: Arc<EventDispatcher>,
    media: Arc<MediaStore>,
    contacts: Arc<LookupCache<Contact>>,
    chats: Arc<LookupCache<ChatSummary>>,
    sweeper: Mutex<Option<SweeperHandle>>,
}

impl Bridge {
    /// Build a bridge delivering webhooks over HTTP.
    pub async fn new(config: BridgeConfig) -> Result<Self, MediaError> {
        let transport = Arc::new(HttpTransport::new(config.dispatcher.delivery_timeout));
        Self::with_transport(config, transport).await
    }

    pub async fn with_transport(
        config: BridgeConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, MediaError> {
        let media = Arc::new(MediaStore::open(config.media.clone()).await?);
        let registry = Arc::new(ListenerRegistry::new(config.dispatcher.failure_threshold));
        let dispatcher = Arc::new(EventDispatcher::new(
            registry.clone(),
            transport,
            config.dispatcher.clone(),
        ));
        let contacts = Arc::new(LookupCache::new("contacts", config.cache.ttl));
        let chats = Arc::new(LookupCache::new("chats", config.cache.ttl));

        let targets: Vec<Arc<dyn Sweep>> = vec![media.clone(), contacts.clone(), chats.clone()];
        let sweeper = Sweeper::spawn(targets, config.sweep_interval);

        info!(
            media_dir = %config.media.root_dir.display(),
            sweep_interval_secs = config.sweep_interval.as_secs(),
            "bridge started"
        );

        Ok(Self {
            registry,
            dispatcher,
            media,
            contacts,
            chats,
            sweeper: Mutex::new(Some(sweeper)),
        })
    }

    pub fn listeners(&self) -> &Arc<ListenerRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    pub fn media(&self) -> &Arc<MediaStore> {
        &self.media
    }

    pub fn contacts(&self) -> &Arc<LookupCache<Contact>> {
        &self.contacts
    }

    pub fn chats(&self) -> &Arc<LookupCache<ChatSummary>> {
        &self.chats
    }

    /// Deliver an event that carries no media.
    pub async fn publish<T: Serialize>(
        &self,
        event: &DomainEvent<T>,
    ) -> Result<DispatchReport, DispatchError> {
        self.dispatcher.dispatch(event).await
    }

    /// Deliver an event whose media must be downloaded first.
    ///
    /// The payload's marker starts unsaved and is finalized before the event
    /// reaches any listener; a failed download is logged and the event is
    /// delivered with the marker left unsaved.
    pub async fn publish_with_media<T, F, E>(
        &self,
        kind: &str,
        mut payload: T,
        download: F,
    ) -> Result<DispatchReport, DispatchError>
    where
        T: Serialize + HasMedia,
        F: Future<Output = Result<Option<DownloadedMedia>, E>>,
        E: Display,
    {
        *payload.media_marker_mut() = MediaMarker::unsaved();

        let media = match download.await {
            Ok(media) => media,
            Err(err) => {
                warn!(kind, error = %err, "media download failed");
                None
            }
        };
        self.media
            .finalize_marker(payload.media_marker_mut(), media.as_ref())
            .await;

        self.dispatcher.dispatch(&DomainEvent::new(kind, payload)).await
    }

    /// Stop accepting events and tear down the background sweep.
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown();
        if let Some(sweeper) = self.sweeper.lock().await.take() {
            sweeper.shutdown().await;
        }
        info!("bridge stopped");
    }
}
