//! Omniplay Core - one command and event surface over embedded video backends
//!
//! This crate provides the provider adapter layer:
//! - Readiness gating of every command behind the backend's own ready signal
//! - Listener registry with newest-first dispatch and one-shot listeners
//! - Generic/native event name mapping per backend
//! - Synthesized `playbackProgress25/50/75` and `firstPlay` events
//! - Command translation with volume and seek unit normalisation
//! - A cross-document message channel variant for embedded documents
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Omniplay Core                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐        ┌──────────────┐                       │
//! │  │   Player     │───────▶│   Provider   │  youtube, vimeo,      │
//! │  │   Registry   │        │   (adapter)  │  dailymotion, iframe, │
//! │  └──────────────┘        └──────┬───────┘  flowplayer, test     │
//! │                                 │                               │
//! │         ┌───────────────┬───────┴───────┬───────────────┐       │
//! │         │               │               │               │       │
//! │  ┌──────┴──────┐ ┌──────┴──────┐ ┌──────┴──────┐ ┌──────┴─────┐ │
//! │  │  Readiness  │ │  Listener   │ │ Progress &  │ │   Event    │ │
//! │  │    Gate     │ │  Registry   │ │ First Play  │ │   Mapper   │ │
//! │  └──────┬──────┘ └─────────────┘ └─────────────┘ └────────────┘ │
//! │         │                                                       │
//! │  ┌──────┴──────┐  ┌──────────────┐                              │
//! │  │  SDK Cache  │──│  Host Page   │  dom, assets, globals,       │
//! │  └─────────────┘  └──────────────┘  message bus                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod listeners;
pub mod loader;
pub mod player;
pub mod provider;
pub mod readiness;
pub mod registry;
pub mod synth;
pub mod types;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{OmniplayConfig, PlayerDefaults, SdkUrls};
pub use error::{Error, Result};
pub use events::{EventMap, SYNTHETIC_EVENTS};
pub use host::{AssetHost, Dom, Globals, MemoryDom, MessageBus, Page, ScriptedAssets, WindowMessage};
pub use listeners::{ListenerRegistry, NativeEvents};
pub use loader::{AssetBundle, SdkCache};
pub use player::Player;
pub use provider::{create_provider, normalize_volume, VideoProvider};
pub use readiness::{ReadinessGate, ReadinessState};
pub use registry::PlayerRegistry;
pub use types::*;
pub use validation::ValidationResult;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library
pub fn init() {
    tracing::info!(version = VERSION, "Omniplay Core initialized");
}
