//! Short-lived attachment storage.
//!
//! Files live under `<root>/incoming` (pulled from chat messages) and
//! `<root>/outgoing` (uploaded for sending). Each file is addressed by an
//! opaque [`MediaId`] and is removed when consumed, deleted, or once it has
//! been idle longer than the configured interval.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::MediaConfig;
use crate::error::MediaError;
use crate::sweeper::Sweep;
use crate::telemetry::{metric_add, metric_inc};
use crate::ttl::TtlIndex;
use crate::types::{DownloadedMedia, MediaDirection, MediaId, MediaMarker, MediaRecord, SavedMedia};

const INCOMING_DIR: &str = "incoming";
const OUTGOING_DIR: &str = "outgoing";

/// File extension for a supported content type.
///
/// Parameters such as `; codecs=opus` are ignored and matching is
/// case-insensitive.
pub fn media_extension(mime_type: &str) -> Option<&'static str> {
    let ext = match normalize_mime(mime_type).as_str() {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "video/mp4" => "mp4",
        "video/3gpp" => "3gp",
        "audio/ogg" => "ogg",
        "audio/mpeg" => "mp3",
        "audio/mp4" => "m4a",
        "audio/aac" => "aac",
        "application/pdf" => "pdf",
        "text/plain" => "txt",
        _ => return None,
    };
    Some(ext)
}

fn normalize_mime(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Filesystem-backed store of ephemeral attachments.
pub struct MediaStore {
    config: MediaConfig,
    incoming_dir: PathBuf,
    outgoing_dir: PathBuf,
    index: Mutex<TtlIndex<MediaRecord>>,
}

impl MediaStore {
    /// Create the media directories and clear files left by a previous run.
    pub async fn open(config: MediaConfig) -> Result<Self, MediaError> {
        let incoming_dir = config.root_dir.join(INCOMING_DIR);
        let outgoing_dir = config.root_dir.join(OUTGOING_DIR);

        for dir in [&incoming_dir, &outgoing_dir] {
            tokio::fs::create_dir_all(dir).await?;
            purge_dir(dir).await;
        }

        Ok(Self {
            config,
            incoming_dir,
            outgoing_dir,
            index: Mutex::new(TtlIndex::new()),
        })
    }

    pub fn incoming_dir(&self) -> &Path {
        &self.incoming_dir
    }

    pub fn outgoing_dir(&self) -> &Path {
        &self.outgoing_dir
    }

    /// Store an uploaded attachment for a later send.
    pub async fn save_upload(&self, bytes: &[u8], mime_type: &str) -> Result<MediaId, MediaError> {
        let record = self.store(bytes, mime_type, MediaDirection::Outgoing).await?;
        Ok(record.id)
    }

    /// Store an attachment pulled from an inbound message.
    pub async fn save_downloaded(
        &self,
        payload: Option<&[u8]>,
        mime_type: &str,
    ) -> Result<SavedMedia, MediaError> {
        let bytes = match payload {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => return Err(MediaError::EmptyPayload),
        };

        let record = self.store(bytes, mime_type, MediaDirection::Incoming).await?;
        Ok(SavedMedia {
            file_name: record.file_name(),
            id: record.id,
            mime_type: record.mime_type,
        })
    }

    /// Store a downloaded attachment and point `marker` at it.
    ///
    /// On failure the marker stays unsaved and the error is logged, so the
    /// event can still be delivered without media.
    pub async fn finalize_marker(
        &self,
        marker: &mut MediaMarker,
        media: Option<&DownloadedMedia>,
    ) -> bool {
        let result = match media {
            Some(media) => self.save_downloaded(Some(&media.data), &media.mime_type).await,
            None => Err(MediaError::EmptyPayload),
        };

        match result {
            Ok(saved) => {
                marker.mark_saved(saved);
                true
            }
            Err(err) => {
                warn!(error = %err, "failed to store downloaded media");
                false
            }
        }
    }

    async fn store(
        &self,
        bytes: &[u8],
        mime_type: &str,
        direction: MediaDirection,
    ) -> Result<MediaRecord, MediaError> {
        let Some(ext) = media_extension(mime_type) else {
            return Err(MediaError::UnsupportedMediaType {
                mime_type: mime_type.to_string(),
            });
        };
        if bytes.is_empty() {
            return Err(MediaError::EmptyPayload);
        }
        if bytes.len() > self.config.max_bytes {
            return Err(MediaError::TooLarge {
                size: bytes.len(),
                max: self.config.max_bytes,
            });
        }

        let id = MediaId::generate();
        let dir = match direction {
            MediaDirection::Incoming => &self.incoming_dir,
            MediaDirection::Outgoing => &self.outgoing_dir,
        };
        let path = dir.join(format!("{id}.{ext}"));
        tokio::fs::write(&path, bytes).await?;

        let record = MediaRecord {
            id: id.clone(),
            path,
            mime_type: normalize_mime(mime_type),
            direction,
        };
        self.index.lock().await.put(id.0.clone(), record.clone());

        metric_inc("bridge.media.saved");
        debug!(media_id = %id, mime_type = %record.mime_type, size = bytes.len(), "stored media");
        Ok(record)
    }

    /// Path of the file behind `id`, if it is still held.
    pub async fn resolve(&self, id: &str) -> Option<PathBuf> {
        self.index.lock().await.get(id).map(|record| record.path.clone())
    }

    /// Path of a held file addressed by its `<id>.<ext>` file name.
    pub async fn resolve_file_name(&self, file_name: &str) -> Option<PathBuf> {
        let (id, _) = file_name.split_once('.')?;
        let index = self.index.lock().await;
        let record = index.get(id)?;
        (record.file_name() == file_name).then(|| record.path.clone())
    }

    pub async fn record(&self, id: &str) -> Option<MediaRecord> {
        self.index.lock().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.index.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.index.lock().await.is_empty()
    }

    /// Delete the file and record behind `id`.
    ///
    /// Unknown ids are ignored. Filesystem errors are logged and the record
    /// is dropped regardless. Returns whether a record was removed.
    pub async fn consume(&self, id: &str) -> bool {
        let mut index = self.index.lock().await;
        let Some(record) = index.get(id) else {
            return false;
        };
        remove_media_file(record, "consumed").await;
        index.remove(id);
        true
    }

    /// Evict every record older than the configured idle interval at `now`.
    pub async fn sweep_at(&self, now: Instant) -> usize {
        let mut index = self.index.lock().await;
        let evicted = index.sweep(now, self.config.max_idle);
        for (_, record) in &evicted {
            remove_media_file(record, "expired").await;
        }

        if !evicted.is_empty() {
            metric_add("bridge.media.evicted", evicted.len() as u64);
        }
        evicted.len()
    }
}

#[async_trait]
impl Sweep for MediaStore {
    fn name(&self) -> &'static str {
        "media"
    }

    async fn sweep(&self) -> usize {
        self.sweep_at(Instant::now()).await
    }
}

async fn remove_media_file(record: &MediaRecord, reason: &'static str) {
    match tokio::fs::remove_file(&record.path).await {
        Ok(()) => {
            debug!(media_id = %record.id, reason, "removed media file");
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(media_id = %record.id, reason, "media file already gone");
        }
        Err(err) => {
            warn!(
                media_id = %record.id,
                path = %record.path.display(),
                reason,
                error = %err,
                "failed to remove media file"
            );
        }
    }
}

async fn purge_dir(dir: &Path) {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "failed to list media directory");
            return;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "failed to list media directory");
                break;
            }
        };

        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        if let Err(err) = tokio::fs::remove_file(entry.path()).await {
            warn!(path = %entry.path().display(), error = %err, "failed to remove stale media file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_ignores_parameters_and_case() {
        assert_eq!(media_extension("audio/ogg; codecs=opus"), Some("ogg"));
        assert_eq!(media_extension("IMAGE/PNG"), Some("png"));
        assert_eq!(media_extension(" image/jpeg "), Some("jpg"));
    }

    #[test]
    fn extension_rejects_unknown_types() {
        assert_eq!(media_extension("application/x-bogus"), None);
        assert_eq!(media_extension(""), None);
    }

    #[test]
    fn normalized_mime_drops_parameters() {
        assert_eq!(normalize_mime("Audio/Ogg; codecs=opus"), "audio/ogg");
    }
}
