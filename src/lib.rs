//! Webhook fan-out and ephemeral media storage for a chat client bridge.
//!
//! Inbound chat events are delivered to every subscribed webhook listener,
//! and attachments travelling in either direction are held in a short-lived,
//! identifier-addressed store on disk.
//!
//! ## Guarantees
//! - One delivery attempt per listener per event, bounded by a shared deadline
//! - Listeners are dropped after a fixed number of consecutive failed rounds
//! - Media files are removed once consumed or idle past their interval
//! - Listeners never see a saved media marker without a stored file
//!
//! ## Non-Guarantees
//! - Durability across restarts
//! - Retries within a round
//! - Authentication of webhook endpoints
//!
//! Start from [`Bridge`], which owns every component and the background
//! sweep; the components can also be wired individually.

mod bridge;
mod cache;
mod config;
mod dispatcher;
mod error;
mod media;
mod registry;
mod sweeper;
mod telemetry;
mod transport;
mod ttl;
mod types;

pub use bridge::{Bridge, HasMedia};
pub use cache::LookupCache;
pub use config::{BridgeConfig, CacheConfig, DispatcherConfig, MediaConfig};
pub use dispatcher::{DispatchReport, EventDispatcher};
pub use error::{
    ConfigError,
    DispatchError,
    FailureReason,
    MediaError,
    RegistryError,
};
pub use media::{media_extension, MediaStore};
pub use registry::ListenerRegistry;
pub use sweeper::{Sweep, Sweeper, SweeperHandle};
pub use transport::{HttpTransport, Transport};
pub use ttl::{is_idle, TtlIndex};
pub use types::{
    ChatSummary,
    Contact,
    DomainEvent,
    DownloadedMedia,
    Listener,
    ListenerId,
    MediaDirection,
    MediaId,
    MediaMarker,
    MediaRecord,
    SavedMedia,
};
