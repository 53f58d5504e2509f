//! Core types for the adapter layer

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::Error;

/// Payload handed to every listener callback (`Null` when the backend sends none)
pub type EventPayload = Value;

/// Identifier of a DOM element (its `id` attribute)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(pub String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a player is mounted: an element handle or a selector string
///
/// Selectors starting with `#` are queried as CSS id selectors, anything else
/// is looked up as a plain element id.
///
/// Serialized form is always a selector string: `Element(id)` is written as
/// `"#id"` and reads back as `Selector("#id")`, which resolves to the same
/// element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MountTarget {
    Element(ElementId),
    Selector(String),
}

impl MountTarget {
    /// Element id this target refers to, if it can be derived without a DOM
    pub fn element_id(&self) -> Option<ElementId> {
        match self {
            MountTarget::Element(id) => Some(id.clone()),
            MountTarget::Selector(s) if s.trim().is_empty() => None,
            MountTarget::Selector(s) => Some(ElementId::new(s.strip_prefix('#').unwrap_or(s))),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            MountTarget::Element(id) => id.0.is_empty(),
            MountTarget::Selector(s) => s.trim().is_empty(),
        }
    }
}

impl Default for MountTarget {
    fn default() -> Self {
        MountTarget::Selector(String::new())
    }
}

impl From<String> for MountTarget {
    fn from(s: String) -> Self {
        MountTarget::Selector(s)
    }
}

impl From<&str> for MountTarget {
    fn from(s: &str) -> Self {
        MountTarget::Selector(s.to_string())
    }
}

impl From<ElementId> for MountTarget {
    fn from(id: ElementId) -> Self {
        MountTarget::Element(id)
    }
}

impl From<MountTarget> for String {
    fn from(target: MountTarget) -> Self {
        match target {
            MountTarget::Element(id) => format!("#{}", id.0),
            MountTarget::Selector(s) => s,
        }
    }
}

impl fmt::Display for MountTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountTarget::Element(id) => write!(f, "#{}", id),
            MountTarget::Selector(s) => write!(f, "{}", s),
        }
    }
}

/// Backend families an adapter can be built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Youtube,
    Vimeo,
    Dailymotion,
    Flowplayer,
    Iframe,
    Test,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 6] = [
        ProviderKind::Youtube,
        ProviderKind::Vimeo,
        ProviderKind::Dailymotion,
        ProviderKind::Flowplayer,
        ProviderKind::Iframe,
        ProviderKind::Test,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Youtube => "youtube",
            ProviderKind::Vimeo => "vimeo",
            ProviderKind::Dailymotion => "dailymotion",
            ProviderKind::Flowplayer => "flowplayer",
            ProviderKind::Iframe => "iframe",
            ProviderKind::Test => "test",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnsupportedBackend(s.to_string()))
    }
}

/// Options used to construct a player
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerOptions {
    /// Mount target (element or selector)
    pub dom_node: MountTarget,
    /// Backend key (`youtube`, `vimeo`, ...); falls back to the registry default
    #[serde(default)]
    pub provider: Option<String>,
    /// Backend video id (strings and numbers are accepted)
    #[serde(default, deserialize_with = "string_or_number")]
    pub video_id: Option<String>,
    /// Direct video url (iframe and flowplayer)
    #[serde(default)]
    pub url: Option<String>,
    /// Mime type of `url`
    #[serde(default)]
    pub mime: Option<String>,
    /// Forwarded verbatim to the backend constructor
    #[serde(default)]
    pub provider_options: Map<String, Value>,
    /// Listeners registered by the registry right after creation
    #[serde(skip)]
    pub events: HashMap<String, Listener>,
}

impl PlayerOptions {
    pub fn new(dom_node: impl Into<MountTarget>) -> Self {
        Self {
            dom_node: dom_node.into(),
            ..Default::default()
        }
    }

    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn video_id(mut self, video_id: impl Into<String>) -> Self {
        self.video_id = Some(video_id.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    pub fn provider_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.provider_options.insert(key.into(), value);
        self
    }

    pub fn event(mut self, event: impl Into<String>, callback: Listener) -> Self {
        self.events.insert(event.into(), callback);
        self
    }

    /// Backend init object: `{key: videoId}` overlaid with `provider_options`
    pub fn backend_init(&self, key: &str) -> Value {
        let mut init = Map::new();
        if let Some(video_id) = &self.video_id {
            init.insert(key.to_string(), Value::String(video_id.clone()));
        }
        for (k, v) in &self.provider_options {
            init.insert(k.clone(), v.clone());
        }
        Value::Object(init)
    }

    /// The video id, or the url when no id was given
    pub fn id_or_url(&self) -> Option<&str> {
        self.video_id.as_deref().or(self.url.as_deref())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(serde_json::Number),
    }

    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(|v| match v {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    }))
}

/// A listener callback
///
/// Cloning shares the underlying closure; two listeners are the same listener
/// when they share it, which is what `off` matches on.
#[derive(Clone)]
pub struct Listener(Arc<dyn Fn(&EventPayload) + Send + Sync>);

impl Listener {
    pub fn new(callback: impl Fn(&EventPayload) + Send + Sync + 'static) -> Self {
        Self(Arc::new(callback))
    }

    pub fn call(&self, data: &EventPayload) {
        (self.0)(data)
    }

    /// Identity comparison
    pub fn same(&self, other: &Listener) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.0) as *const (),
            Arc::as_ptr(&other.0) as *const (),
        )
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

/// A registered listener
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerRecord {
    pub callback: Listener,
    /// Removed right after its first invocation
    pub once: bool,
}

/// Listener records grouped by generic event name, newest first
pub type Listeners = HashMap<String, Vec<ListenerRecord>>;

/// Result of a download request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "url", rename_all = "snake_case")]
pub enum Download {
    /// The backend resolved a url for the video
    Url(String),
    /// The backend triggered the download (or watch-on-site) itself
    Triggered,
    /// The backend has no download capability
    Unsupported,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!("youtube".parse::<ProviderKind>().unwrap(), ProviderKind::Youtube);
        assert_eq!("Vimeo".parse::<ProviderKind>().unwrap(), ProviderKind::Vimeo);
        assert_eq!(
            "myinexistentvideoplayer".parse::<ProviderKind>(),
            Err(Error::UnsupportedBackend("myinexistentvideoplayer".into()))
        );
    }

    #[test]
    fn test_mount_target_element_id() {
        assert_eq!(MountTarget::from("#v").element_id(), Some(ElementId::new("v")));
        assert_eq!(MountTarget::from("video1").element_id(), Some(ElementId::new("video1")));
        assert_eq!(MountTarget::from("  ").element_id(), None);
    }

    #[test]
    fn test_mount_target_element_serializes_as_selector() {
        let target = MountTarget::Element(ElementId::new("v"));
        let text = serde_json::to_string(&target).unwrap();
        assert_eq!(text, r##""#v""##);

        let back: MountTarget = serde_json::from_str(&text).unwrap();
        assert_eq!(back, MountTarget::Selector("#v".into()));
        assert_eq!(back.element_id(), target.element_id());
    }

    #[test]
    fn test_options_deserialize_numeric_video_id() {
        let options: PlayerOptions = serde_json::from_str(
            r##"{"domNode": "#v", "videoId": 123, "provider": "test", "providerOptions": {"autoplay": true}}"##,
        )
        .unwrap();
        assert_eq!(options.video_id.as_deref(), Some("123"));
        assert_eq!(options.dom_node, MountTarget::Selector("#v".into()));
        assert_eq!(options.provider_options["autoplay"], Value::Bool(true));
    }

    #[test]
    fn test_backend_init_provider_options_win() {
        let options = PlayerOptions::new("#v")
            .video_id("abc")
            .provider_option("video", Value::String("override".into()))
            .provider_option("autoplay", Value::Bool(true));
        let init = options.backend_init("video");
        assert_eq!(init["video"], "override");
        assert_eq!(init["autoplay"], true);
    }

    #[test]
    fn test_listener_identity() {
        let a = Listener::new(|_| {});
        let b = a.clone();
        let c = Listener::new(|_| {});
        assert!(a.same(&b));
        assert!(!a.same(&c));
    }
}
