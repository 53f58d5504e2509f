//! Iframe adapter
//!
//! Drives a player page embedded in an `<iframe>` through cross-document
//! messages. Commands go out as `{method, data?}`; the embedded page answers
//! with `{event, ...}` messages, starting with `ready`.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use url::Url;

use super::{mount_element, normalize_volume, ProviderCore, VideoProvider};
use crate::{
    events::IFRAME_EVENTS,
    host::{Dom, NewElement, Page, WindowMessage},
    listeners::NativeEvents,
    readiness::ReadinessState,
    Download, ElementId, Error, EventPayload, Listener, Listeners, PlayerOptions, ProviderKind,
    Result,
};

/// Target origin used for every outbound message
const TARGET_ORIGIN: &str = "*";

/// An outbound command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameCommand {
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<f64>,
}

impl FrameCommand {
    pub fn new(method: &'static str) -> Self {
        Self { method, data: None }
    }

    pub fn with_data(method: &'static str, data: f64) -> Self {
        Self {
            method,
            data: Some(data),
        }
    }
}

/// Message channel to one embedded player page
///
/// Acts as the backend of the adapter: inbound events are routed to the
/// handlers registered per native event name.
pub struct FrameChannel {
    frame: ElementId,
    dom: Arc<dyn Dom>,
    routes: Mutex<HashMap<String, Vec<Listener>>>,
}

impl FrameChannel {
    pub fn new(frame: ElementId, dom: Arc<dyn Dom>) -> Self {
        Self {
            frame,
            dom,
            routes: Mutex::new(HashMap::new()),
        }
    }

    pub fn frame(&self) -> &ElementId {
        &self.frame
    }

    /// Post a command to the embedded page
    pub fn send(&self, command: &FrameCommand) -> Result<()> {
        let payload = serde_json::to_string(command)
            .map_err(|e| Error::Internal(format!("failed to encode command: {}", e)))?;
        debug!(frame = %self.frame, payload = %payload, "Posting frame command");
        self.dom.post_message(&self.frame, &payload, TARGET_ORIGIN)
    }

    /// Hand an inbound event to its handlers
    pub fn route(&self, event: &str, payload: &EventPayload) {
        let handlers = self
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .cloned()
            .unwrap_or_default();
        for handler in handlers {
            handler.call(payload);
        }
    }
}

impl NativeEvents for FrameChannel {
    fn add_listener(&self, event: &str, handler: Listener) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event.to_string())
            .or_default()
            .push(handler);
    }

    fn remove_listener(&self, event: &str, handler: &Listener) {
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handlers) = routes.get_mut(event) {
            handlers.retain(|h| !h.same(handler));
            if handlers.is_empty() {
                routes.remove(event);
            }
        }
    }
}

/// Parse an inbound payload into its event name and body
fn parse_inbound(data: &str) -> Result<(String, Value)> {
    let payload: Value = serde_json::from_str(data)?;
    let event = payload
        .get("event")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::MalformedMessage(format!("missing event field: {}", data)))?
        .to_string();
    Ok((event, payload))
}

/// Adapter for players embedded through an iframe
pub struct IframeProvider {
    core: Arc<ProviderCore<FrameChannel>>,
    page: Arc<Page>,
}

impl IframeProvider {
    pub fn new(options: &PlayerOptions, id: &str, page: Arc<Page>) -> Self {
        let core = ProviderCore::new(id, ProviderKind::Iframe, IFRAME_EVENTS);
        // subscribe before mounting so the ready message cannot be missed
        let inbound = page.messages().subscribe();

        match mount(&core, &page, options) {
            Ok(frame) => {
                core.track_task(tokio::spawn(pump(Arc::downgrade(&core), inbound, frame)));
            }
            Err(err) => core.fail(err),
        }
        Self { core, page }
    }

    async fn send(&self, command: FrameCommand) -> Result<()> {
        self.core.ready().await?.send(&command)
    }
}

fn mount(core: &ProviderCore<FrameChannel>, page: &Page, options: &PlayerOptions) -> Result<ElementId> {
    core.gate().constructing();
    let url = options
        .url
        .as_deref()
        .ok_or_else(|| Error::InvalidOptions("the iframe provider needs a url".into()))?;
    let url = Url::parse(url)?;

    let frame = mount_element(
        page.dom().as_ref(),
        &options.dom_node,
        NewElement::new("iframe", core.id()).attribute("src", url.as_str()),
        true,
    )?;
    let channel = FrameChannel::new(frame.clone(), Arc::clone(page.dom()));
    core.install(Arc::new(channel), frame.clone());
    debug!(id = %core.id(), url = %url, "Frame mounted");
    Ok(frame)
}

async fn pump(
    core: Weak<ProviderCore<FrameChannel>>,
    mut inbound: broadcast::Receiver<WindowMessage>,
    frame: ElementId,
) {
    loop {
        let message = match inbound.recv().await {
            Ok(message) => message,
            Err(RecvError::Lagged(skipped)) => {
                warn!(frame = %frame, skipped, "Inbound frame messages dropped");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        if message.source != frame {
            continue;
        }
        let Some(core) = core.upgrade() else { break };
        handle_inbound(&core, &message.data);
    }
}

fn handle_inbound(core: &ProviderCore<FrameChannel>, data: &str) {
    let (event, payload) = match parse_inbound(data) {
        Ok(parsed) => parsed,
        Err(err) => {
            if !core.gate().is_ready() {
                core.fail(err);
            } else {
                warn!(id = %core.id(), error = %err, "Dropped malformed frame message");
            }
            return;
        }
    };

    if event == "ready" {
        if core.gate().resolve() {
            info!(id = %core.id(), "Frame player ready");
        }
        return;
    }

    if event == IFRAME_EVENTS.native_name("playbackProgress") {
        let seconds = payload.get("seconds").and_then(Value::as_f64);
        let duration = payload.get("duration").and_then(Value::as_f64);
        if let (Some(seconds), Some(duration)) = (seconds, duration) {
            core.observe_progress(seconds, duration);
        }
    }
    if let Some(channel) = core.backend() {
        channel.route(&event, &payload);
    }
}

#[async_trait]
impl VideoProvider for IframeProvider {
    fn id(&self) -> &str {
        self.core.id()
    }

    fn kind(&self) -> ProviderKind {
        self.core.kind()
    }

    fn readiness(&self) -> ReadinessState {
        self.core.readiness()
    }

    async fn ready(&self) -> Result<()> {
        self.core.ready().await.map(|_| ())
    }

    async fn on(&self, event: &str, callback: Listener, once: bool) -> Result<()> {
        self.core.on(event, callback, once).await
    }

    async fn off(&self, event: &str, callback: &Listener) -> Result<()> {
        self.core.off(event, callback).await
    }

    fn get_listeners(&self) -> Listeners {
        self.core.listeners()
    }

    async fn play(&self) -> Result<()> {
        self.send(FrameCommand::new("play")).await
    }

    async fn pause(&self) -> Result<()> {
        self.send(FrameCommand::new("pause")).await
    }

    async fn stop(&self) -> Result<()> {
        self.send(FrameCommand::new("stop")).await
    }

    async fn mute(&self) -> Result<()> {
        self.send(FrameCommand::new("mute")).await
    }

    async fn unmute(&self) -> Result<()> {
        self.send(FrameCommand::new("unmute")).await
    }

    async fn toggle_mute(&self) -> Result<()> {
        self.send(FrameCommand::new("togglemute")).await
    }

    async fn toggle_full_screen(&self) -> Result<()> {
        self.send(FrameCommand::new("togglefullscreen")).await
    }

    async fn toggle_play(&self) -> Result<()> {
        self.send(FrameCommand::new("toggleplay")).await
    }

    async fn set_volume(&self, level: f64) -> Result<()> {
        self.send(FrameCommand::with_data("setvolume", normalize_volume(level)))
            .await
    }

    async fn forward(&self, seconds: f64) -> Result<()> {
        self.send(FrameCommand::with_data("forward", seconds)).await
    }

    async fn rewind(&self, seconds: f64) -> Result<()> {
        self.send(FrameCommand::with_data("rewind", seconds)).await
    }

    async fn seek(&self, seconds: f64) -> Result<()> {
        self.send(FrameCommand::with_data("seek", seconds)).await
    }

    async fn download(&self) -> Result<Download> {
        self.send(FrameCommand::new("download")).await?;
        Ok(Download::Triggered)
    }

    async fn clear(&self) -> Result<()> {
        self.core.ready().await?;
        self.core.teardown(self.page.dom().as_ref());
        Ok(())
    }
}
