//! In-memory host page used by tests and the demo CLI

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use url::Url;

use super::{AssetHost, Dom, Globals, NewElement};
use crate::{ElementId, Error, MountTarget, Result};

/// A message posted into an embedded document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub payload: String,
    pub target_origin: String,
}

#[derive(Debug, Default)]
struct Node {
    tag: String,
    parent: Option<String>,
    children: Vec<String>,
    attributes: HashMap<String, String>,
    inbox: Vec<PostedMessage>,
}

/// Element tree keyed by element id
#[derive(Debug, Default)]
pub struct MemoryDom {
    nodes: Mutex<HashMap<String, Node>>,
}

impl MemoryDom {
    pub fn new() -> Self {
        Self::default()
    }

    /// A document holding one top-level `div` per id
    pub fn with_containers(ids: &[&str]) -> Self {
        let dom = Self::new();
        for id in ids {
            dom.add_container(id);
        }
        dom
    }

    /// Add a top-level `div`
    pub fn add_container(&self, id: &str) {
        self.nodes().insert(
            id.to_string(),
            Node {
                tag: "div".to_string(),
                ..Default::default()
            },
        );
    }

    pub fn children(&self, id: &ElementId) -> Vec<ElementId> {
        self.nodes()
            .get(id.as_str())
            .map(|n| n.children.iter().map(ElementId::new).collect())
            .unwrap_or_default()
    }

    pub fn tag(&self, id: &ElementId) -> Option<String> {
        self.nodes().get(id.as_str()).map(|n| n.tag.clone())
    }

    pub fn attribute(&self, id: &ElementId, name: &str) -> Option<String> {
        self.nodes()
            .get(id.as_str())
            .and_then(|n| n.attributes.get(name).cloned())
    }

    /// Messages posted into the frame `id`, oldest first
    pub fn posted_messages(&self, id: &ElementId) -> Vec<PostedMessage> {
        self.nodes()
            .get(id.as_str())
            .map(|n| n.inbox.clone())
            .unwrap_or_default()
    }

    fn nodes(&self) -> MutexGuard<'_, HashMap<String, Node>> {
        self.nodes.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn remove_subtree(nodes: &mut HashMap<String, Node>, id: &str) {
        if let Some(node) = nodes.remove(id) {
            for child in node.children {
                Self::remove_subtree(nodes, &child);
            }
        }
    }
}

impl Dom for MemoryDom {
    fn resolve(&self, target: &MountTarget) -> Option<ElementId> {
        let id = target.element_id()?;
        self.nodes().contains_key(id.as_str()).then_some(id)
    }

    fn append_element(&self, parent: &ElementId, element: NewElement) -> Result<ElementId> {
        let mut nodes = self.nodes();
        if !nodes.contains_key(parent.as_str()) {
            return Err(Error::MountNotFound(parent.to_string()));
        }
        if nodes.contains_key(element.id.as_str()) {
            return Err(Error::Internal(format!("duplicate element id {}", element.id)));
        }

        let id = element.id.clone();
        nodes.insert(
            id.0.clone(),
            Node {
                tag: element.tag,
                parent: Some(parent.0.clone()),
                attributes: element.attributes.into_iter().collect(),
                ..Default::default()
            },
        );
        if let Some(parent) = nodes.get_mut(parent.as_str()) {
            parent.children.push(id.0.clone());
        }
        Ok(id)
    }

    fn clear_children(&self, parent: &ElementId) {
        let mut nodes = self.nodes();
        let children = nodes
            .get_mut(parent.as_str())
            .map(|n| std::mem::take(&mut n.children))
            .unwrap_or_default();
        for child in children {
            Self::remove_subtree(&mut nodes, &child);
        }
    }

    fn remove_element(&self, id: &ElementId) -> bool {
        let mut nodes = self.nodes();
        let Some(parent) = nodes.get(id.as_str()).map(|n| n.parent.clone()) else {
            return false;
        };
        if let Some(parent) = parent.and_then(|p| nodes.get_mut(&p)) {
            parent.children.retain(|c| c != id.as_str());
        }
        Self::remove_subtree(&mut nodes, id.as_str());
        true
    }

    fn contains(&self, id: &ElementId) -> bool {
        self.nodes().contains_key(id.as_str())
    }

    fn post_message(&self, frame: &ElementId, payload: &str, target_origin: &str) -> Result<()> {
        let mut nodes = self.nodes();
        let node = nodes
            .get_mut(frame.as_str())
            .ok_or_else(|| Error::MountNotFound(frame.to_string()))?;
        node.inbox.push(PostedMessage {
            payload: payload.to_string(),
            target_origin: target_origin.to_string(),
        });
        Ok(())
    }
}

type ScriptEffect = Arc<dyn Fn(&Globals) + Send + Sync>;

/// Asset host whose scripts are closures run against the page globals
#[derive(Default)]
pub struct ScriptedAssets {
    scripts: HashMap<String, ScriptEffect>,
    styles: HashSet<String>,
    failing: HashSet<String>,
    injected: Mutex<Vec<String>>,
}

impl ScriptedAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `url`; running it applies `effect`
    pub fn with_script(
        mut self,
        url: impl Into<String>,
        effect: impl Fn(&Globals) + Send + Sync + 'static,
    ) -> Self {
        self.scripts.insert(url.into(), Arc::new(effect));
        self
    }

    pub fn with_style(mut self, url: impl Into<String>) -> Self {
        self.styles.insert(url.into());
        self
    }

    /// Make `url` fail to load
    pub fn with_failure(mut self, url: impl Into<String>) -> Self {
        self.failing.insert(url.into());
        self
    }

    /// Every url injected so far, in injection order
    pub fn injected(&self) -> Vec<String> {
        self.injected.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, url: &Url) {
        self.injected
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());
    }
}

#[async_trait]
impl AssetHost for ScriptedAssets {
    async fn load_script(&self, url: &Url, globals: &Globals) -> Result<()> {
        self.record(url);
        tokio::task::yield_now().await;

        if self.failing.contains(url.as_str()) {
            return Err(Error::load(format!("Failed to load: {}", url)));
        }
        let effect = self
            .scripts
            .get(url.as_str())
            .ok_or_else(|| Error::load(format!("Failed to load: {}", url)))?;
        effect(globals);
        debug!(url = %url, "Script loaded");
        Ok(())
    }

    async fn load_style(&self, url: &Url) -> Result<()> {
        self.record(url);
        tokio::task::yield_now().await;

        if self.failing.contains(url.as_str()) || !self.styles.contains(url.as_str()) {
            return Err(Error::load(format!("Failed to load: {}", url)));
        }
        debug!(url = %url, "Style loaded");
        Ok(())
    }
}
