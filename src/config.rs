use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Webhook delivery settings.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Shared deadline for every delivery attempt in one round.
    pub delivery_timeout: Duration,

    /// Consecutive failed rounds after which a listener is deregistered.
    ///
    /// Enforced by the [`ListenerRegistry`](crate::ListenerRegistry) built
    /// from it; the dispatcher itself never reads this field.
    pub failure_threshold: u32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            delivery_timeout: Duration::from_secs(5),
            failure_threshold: 3,
        }
    }
}

/// Media store settings.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Directory holding the `incoming` and `outgoing` subdirectories.
    pub root_dir: PathBuf,

    /// Records older than this are removed by the next sweep.
    pub max_idle: Duration,

    /// Largest payload accepted by the store.
    pub max_bytes: usize,
}

impl MediaConfig {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_max_idle(mut self, max_idle: Duration) -> Self {
        self.max_idle = max_idle;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("./media"),
            max_idle: Duration::from_secs(10 * 60),
            max_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Contact and chat lookup cache settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
        }
    }
}

/// Settings for a whole [`Bridge`](crate::Bridge).
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub dispatcher: DispatcherConfig,
    pub media: MediaConfig,
    pub cache: CacheConfig,

    /// Period of the background sweep over media and lookup caches.
    pub sweep_interval: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            dispatcher: DispatcherConfig::default(),
            media: MediaConfig::default(),
            cache: CacheConfig::default(),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl BridgeConfig {
    /// Load settings from `BRIDGE_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = parse_nonzero::<u64, _>(&lookup, "BRIDGE_WEBHOOK_TIMEOUT_MS")? {
            config.dispatcher.delivery_timeout = Duration::from_millis(ms);
        }
        if let Some(threshold) = parse_nonzero::<u32, _>(&lookup, "BRIDGE_WEBHOOK_FAILURE_THRESHOLD")? {
            config.dispatcher.failure_threshold = threshold;
        }
        if let Some(dir) = lookup("BRIDGE_MEDIA_DIR").filter(|dir| !dir.trim().is_empty()) {
            config.media.root_dir = PathBuf::from(dir);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "BRIDGE_MEDIA_MAX_IDLE_SECS")? {
            config.media.max_idle = Duration::from_secs(secs);
        }
        if let Some(bytes) = parse_var::<usize, _>(&lookup, "BRIDGE_MEDIA_MAX_BYTES")? {
            config.media.max_bytes = bytes;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "BRIDGE_CACHE_TTL_SECS")? {
            config.cache.ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_nonzero::<u64, _>(&lookup, "BRIDGE_SWEEP_INTERVAL_SECS")? {
            config.sweep_interval = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::Invalid { var, value: raw })
}

/// Like [`parse_var`], but zero is rejected.
fn parse_nonzero<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr + Default + PartialEq + ToString,
    F: Fn(&str) -> Option<String>,
{
    match parse_var::<T, F>(lookup, var)? {
        Some(value) if value == T::default() => Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
        }),
        parsed => Ok(parsed),
    }
}
