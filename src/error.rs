use std::fmt;
use std::io;

use crate::types::ListenerId;

/// Errors returned by the listener registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The URL is not an absolute `http` or `https` URL.
    InvalidUrl {
        url: String,
    },

    /// A listener with the same URL is already subscribed.
    AlreadyRegistered {
        url: String,
        id: ListenerId,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::InvalidUrl { url } =>
                write!(f, "invalid webhook url: {url}"),
            RegistryError::AlreadyRegistered { url, id } =>
                write!(f, "webhook already registered as listener {id}: {url}"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Errors returned when storing media.
///
/// Validation variants are the caller's fault and map to a client-facing
/// rejection; `Io` means the store could not persist the payload.
#[derive(Debug)]
pub enum MediaError {
    /// The content type is not in the supported type table.
    UnsupportedMediaType {
        mime_type: String,
    },

    /// The payload was missing or had no bytes.
    EmptyPayload,

    /// The payload exceeds the configured size limit.
    TooLarge {
        size: usize,
        max: usize,
    },

    /// Writing to the media directory failed.
    Io(io::Error),
}

impl MediaError {
    /// Whether this error was caused by bad input rather than the store.
    pub fn is_validation(&self) -> bool {
        !matches!(self, MediaError::Io(_))
    }
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaError::UnsupportedMediaType { mime_type } =>
                write!(f, "unsupported media type: {mime_type}"),
            MediaError::EmptyPayload =>
                write!(f, "media payload is empty or missing"),
            MediaError::TooLarge { size, max } =>
                write!(f, "media payload too large ({size} bytes, max {max})"),
            MediaError::Io(err) =>
                write!(f, "media storage failed: {err}"),
        }
    }
}

impl std::error::Error for MediaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MediaError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for MediaError {
    fn from(err: io::Error) -> Self {
        MediaError::Io(err)
    }
}

/// Errors returned when a dispatch round cannot start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Dispatcher has been shut down.
    Shutdown,

    /// The event could not be serialized into an envelope.
    Serialization(String),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Shutdown =>
                write!(f, "dispatcher is shut down"),
            DispatchError::Serialization(msg) =>
                write!(f, "failed to serialize event: {msg}"),
        }
    }
}

impl std::error::Error for DispatchError {}

/// Reasons why a single delivery attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The round deadline fired before the listener answered.
    Timeout,
    Network,
    /// The listener answered with a non-success, non-4xx status.
    RemoteError,
    /// The listener answered with a 4xx status.
    ClientError,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Timeout =>
                write!(f, "request timed out"),
            FailureReason::Network =>
                write!(f, "network error"),
            FailureReason::RemoteError =>
                write!(f, "remote endpoint returned error"),
            FailureReason::ClientError =>
                write!(f, "endpoint rejected the request"),
        }
    }
}

/// Errors returned when loading configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Invalid {
        var: &'static str,
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid { var, value } =>
                write!(f, "invalid value for {var}: {value:?}"),
        }
    }
}

impl std::error::Error for ConfigError {}
