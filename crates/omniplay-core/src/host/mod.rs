//! Host page seams
//!
//! Adapters never touch a concrete document. Everything they need from the
//! host page goes through a [`Page`]:
//! - [`Dom`]: resolve mount targets, create and remove elements, post
//!   messages into embedded documents
//! - [`AssetHost`]: inject backend script and style assets
//! - [`Globals`]: the named globals those scripts install (backend SDKs)
//! - [`MessageBus`]: messages posted by embedded documents to the page
//! - [`SdkCache`]: the per-backend-type memoised SDK load

mod memory;

pub use memory::{MemoryDom, PostedMessage, ScriptedAssets};

use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::debug;
use url::Url;

use crate::{
    config::OmniplayConfig, loader::SdkCache, ElementId, MountTarget, ProviderKind, Result,
};

/// A new element to append to the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewElement {
    pub tag: String,
    pub id: ElementId,
    pub attributes: Vec<(String, String)>,
}

impl NewElement {
    pub fn new(tag: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: ElementId::new(id),
            attributes: Vec::new(),
        }
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }
}

/// Document operations used by adapters
pub trait Dom: Send + Sync {
    /// Resolve a mount target to an element
    fn resolve(&self, target: &MountTarget) -> Option<ElementId>;

    /// Append a new element under `parent`
    fn append_element(&self, parent: &ElementId, element: NewElement) -> Result<ElementId>;

    /// Remove every child of `parent`
    fn clear_children(&self, parent: &ElementId);

    /// Remove an element and its subtree; false if it did not exist
    fn remove_element(&self, id: &ElementId) -> bool;

    /// Whether the element is attached
    fn contains(&self, id: &ElementId) -> bool;

    /// Post a message to the document embedded in a frame element
    fn post_message(&self, frame: &ElementId, payload: &str, target_origin: &str) -> Result<()>;
}

/// Script and style injection
#[async_trait]
pub trait AssetHost: Send + Sync {
    /// Inject a script; once it runs it may install globals
    async fn load_script(&self, url: &Url, globals: &Globals) -> Result<()>;

    /// Inject a stylesheet
    async fn load_style(&self, url: &Url) -> Result<()>;
}

/// Named globals installed by backend scripts
#[derive(Default)]
pub struct Globals {
    values: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl Globals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install (or replace) a global
    pub fn install<T: Any + Send + Sync>(&self, name: impl Into<String>, value: T) {
        let name = name.into();
        debug!(global = %name, "Global installed");
        self.write().insert(name, Arc::new(value));
    }

    /// Typed lookup; `None` when missing or of another type
    pub fn get<T: Any + Clone>(&self, name: &str) -> Option<T> {
        self.read()
            .get(name)
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<dyn Any + Send + Sync>>> {
        self.values.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<dyn Any + Send + Sync>>> {
        self.values.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// A message posted to the page by an embedded document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowMessage {
    /// Frame element whose document posted the message
    pub source: ElementId,
    /// Raw payload
    pub data: String,
}

/// Page-wide inbound message channel
pub struct MessageBus {
    tx: broadcast::Sender<WindowMessage>,
}

impl Default for MessageBus {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }
}

impl MessageBus {
    pub fn subscribe(&self) -> broadcast::Receiver<WindowMessage> {
        self.tx.subscribe()
    }

    /// Deliver a message from `source`; returns how many listeners saw it
    pub fn post(&self, source: ElementId, data: impl Into<String>) -> usize {
        self.tx
            .send(WindowMessage {
                source,
                data: data.into(),
            })
            .unwrap_or(0)
    }
}

/// The host page shared by every adapter mounted on it
pub struct Page {
    dom: Arc<dyn Dom>,
    assets: Arc<dyn AssetHost>,
    globals: Globals,
    sdks: SdkCache,
    messages: MessageBus,
    config: OmniplayConfig,
}

impl Page {
    pub fn new(dom: Arc<dyn Dom>, assets: Arc<dyn AssetHost>) -> Arc<Self> {
        Self::with_config(dom, assets, OmniplayConfig::default())
    }

    pub fn with_config(
        dom: Arc<dyn Dom>,
        assets: Arc<dyn AssetHost>,
        config: OmniplayConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            dom,
            assets,
            globals: Globals::new(),
            sdks: SdkCache::new(),
            messages: MessageBus::default(),
            config,
        })
    }

    pub fn dom(&self) -> &Arc<dyn Dom> {
        &self.dom
    }

    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    pub fn messages(&self) -> &MessageBus {
        &self.messages
    }

    pub fn config(&self) -> &OmniplayConfig {
        &self.config
    }

    pub fn sdk_cache(&self) -> &SdkCache {
        &self.sdks
    }

    /// Load a backend's assets, at most once per backend type on this page
    pub async fn load_sdk(&self, kind: ProviderKind) -> Result<()> {
        let bundle = self.config.sdk_urls.bundle(kind)?;
        self.sdks
            .load(kind, &bundle, self.assets.as_ref(), &self.globals)
            .await
    }
}
