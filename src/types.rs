use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Identifier assigned to a listener when it subscribes.
///
/// Identifiers are handed out in increasing order and never reused by the
/// registry that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A subscribed webhook endpoint and its delivery health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listener {
    pub id: ListenerId,

    /// Target URL; unique within a registry.
    pub url: String,

    /// Failed rounds since the last successful delivery.
    pub consecutive_failures: u32,
}

impl Listener {
    pub fn new(id: ListenerId, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            consecutive_failures: 0,
        }
    }
}

/// An event fanned out to every listener.
///
/// Serializes as the wire envelope `{ "type": kind, "data": payload }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent<T> {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(rename = "data")]
    pub payload: T,
}

impl<T> DomainEvent<T> {
    pub fn new(kind: impl Into<String>, payload: T) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }
}

/// Opaque identifier of a stored media file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(pub String);

impl MediaId {
    pub(crate) fn generate() -> Self {
        MediaId(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaId {
    fn from(id: &str) -> Self {
        MediaId(id.to_string())
    }
}

/// Which media directory a file lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaDirection {
    /// Pulled from an inbound chat message.
    Incoming,
    /// Uploaded by an API caller for sending.
    Outgoing,
}

/// Index entry for one file held by the media store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRecord {
    pub id: MediaId,
    pub path: PathBuf,
    pub mime_type: String,
    pub direction: MediaDirection,
}

impl MediaRecord {
    /// File name relative to the record's media directory.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Result of storing a downloaded attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedMedia {
    pub id: MediaId,
    pub file_name: String,
    pub mime_type: String,
}

/// Raw attachment as produced by the chat client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedMedia {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl DownloadedMedia {
    pub fn new(data: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// Media pointer embedded in event payloads.
///
/// Starts unsaved; once `saved` is true the id, file name and mime type are
/// all set and the id resolves in the media store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMarker {
    pub saved: bool,
    pub id: Option<MediaId>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

impl MediaMarker {
    pub fn unsaved() -> Self {
        Self::default()
    }

    pub(crate) fn mark_saved(&mut self, saved: SavedMedia) {
        self.saved = true;
        self.id = Some(saved.id);
        self.file_name = Some(saved.file_name);
        self.mime_type = Some(saved.mime_type);
    }
}

/// Contact details resolved from the chat client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub name: Option<String>,
    pub push_name: Option<String>,
    pub is_business: bool,
}

/// Chat metadata resolved from the chat client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub id: String,
    pub name: String,
    pub is_group: bool,
    pub unread_count: u32,
}
