//! Provider adapters
//!
//! One adapter per backend family. They all share [`ProviderCore`], which
//! owns the readiness gate, the listener registry, the progress and
//! first-play synthesizer and the backend handle. Each adapter adds the
//! construction sequence and the command translation of its backend.

mod dailymotion;
mod flowplayer;
mod iframe;
mod vimeo;
mod youtube;

pub use dailymotion::{DailymotionApi, DailymotionProvider, DailymotionSdk, DAILYMOTION_GLOBAL};
pub use flowplayer::{FlowplayerApi, FlowplayerProvider, FlowplayerSdk, FLOWPLAYER_GLOBAL};
pub use iframe::{FrameChannel, FrameCommand, IframeProvider};
pub use test::{NativeCall, SimulatedVideo, SimulatedVideoSdk, TestProvider, TEST_GLOBAL};
pub use vimeo::{VimeoApi, VimeoProvider, VimeoSdk, VIMEO_GLOBAL};
pub use youtube::{YoutubeApi, YoutubeProvider, YoutubeSdk, YOUTUBE_GLOBAL};

use async_trait::async_trait;
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::{
    events::{EventMap, FIRST_PLAY},
    host::{Dom, NewElement, Page},
    listeners::{ListenerRegistry, NativeEvents, Relay},
    readiness::{ReadinessGate, ReadinessState},
    synth::{FirstPlayLatch, ProgressTracker},
    Download, ElementId, Error, EventPayload, Listener, ListenerRecord, Listeners, MountTarget,
    PlayerOptions, ProviderKind, Result,
};

/// The uniform adapter contract
///
/// Every operation waits for the backend to be ready first. Calls made
/// before that queue behind the same readiness signal.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Caller-assigned player id
    fn id(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    fn readiness(&self) -> ReadinessState;

    /// Wait until the backend accepts commands
    async fn ready(&self) -> Result<()>;

    /// Add a listener; `once` listeners are removed after their first call
    async fn on(&self, event: &str, callback: Listener, once: bool) -> Result<()>;

    async fn one(&self, event: &str, callback: Listener) -> Result<()> {
        self.on(event, callback, true).await
    }

    /// Remove the first registration of `callback` for `event`
    async fn off(&self, event: &str, callback: &Listener) -> Result<()>;

    /// Snapshot of every listener list, newest first
    fn get_listeners(&self) -> Listeners;

    async fn play(&self) -> Result<()>;
    async fn pause(&self) -> Result<()>;
    async fn stop(&self) -> Result<()>;
    async fn mute(&self) -> Result<()>;
    async fn unmute(&self) -> Result<()>;
    async fn toggle_mute(&self) -> Result<()>;
    async fn toggle_full_screen(&self) -> Result<()>;
    async fn toggle_play(&self) -> Result<()>;

    /// Volume as 0–1, or 0–100 when above 1
    async fn set_volume(&self, level: f64) -> Result<()>;

    async fn forward(&self, seconds: f64) -> Result<()>;
    async fn rewind(&self, seconds: f64) -> Result<()>;

    /// Absolute seek
    async fn seek(&self, seconds: f64) -> Result<()>;

    async fn download(&self) -> Result<Download>;

    /// Unmount, release the backend and drop every listener
    async fn clear(&self) -> Result<()>;
}

/// Build the adapter for `kind`
///
/// Construction is started on the current tokio runtime; the returned
/// adapter settles its readiness once the backend is up.
pub fn create_provider(
    kind: ProviderKind,
    options: &PlayerOptions,
    id: &str,
    page: Arc<Page>,
) -> Arc<dyn VideoProvider> {
    match kind {
        ProviderKind::Youtube => Arc::new(YoutubeProvider::new(options, id, page)),
        ProviderKind::Vimeo => Arc::new(VimeoProvider::new(options, id, page)),
        ProviderKind::Dailymotion => Arc::new(DailymotionProvider::new(options, id, page)),
        ProviderKind::Flowplayer => Arc::new(FlowplayerProvider::new(options, id, page)),
        ProviderKind::Iframe => Arc::new(IframeProvider::new(options, id, page)),
        ProviderKind::Test => Arc::new(TestProvider::new(options, id, page)),
    }
}

/// Accept both 0–1 and 0–100 volume levels
pub fn normalize_volume(level: f64) -> f64 {
    if level > 1.0 {
        level / 100.0
    } else {
        level
    }
}

/// Log a capability the backend lacks; the call is a no-op
pub(crate) fn unsupported(kind: ProviderKind, operation: &str) {
    let err = Error::unsupported(kind.as_str(), operation);
    warn!(code = err.error_code(), "{}", err);
}

/// Resolve the mount target and append `element` to it
pub(crate) fn mount_element(
    dom: &dyn Dom,
    target: &MountTarget,
    element: NewElement,
    replace_children: bool,
) -> Result<ElementId> {
    let parent = dom
        .resolve(target)
        .ok_or_else(|| Error::MountNotFound(target.to_string()))?;
    if replace_children {
        dom.clear_children(&parent);
    }
    dom.append_element(&parent, element)
}

/// Typed SDK global installed by a backend script
pub(crate) fn sdk_global<T: Any + Clone>(page: &Page, name: &str) -> Result<T> {
    page.globals()
        .get::<T>(name)
        .ok_or_else(|| Error::load(format!("{} is not available after loading", name)))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared by every adapter
///
/// `B` is the backend's native surface. Locks are never held while user
/// callbacks or backend calls run.
pub(crate) struct ProviderCore<B: ?Sized + NativeEvents + 'static> {
    id: String,
    kind: ProviderKind,
    events: EventMap,
    gate: ReadinessGate,
    backend: RwLock<Option<Arc<B>>>,
    mount: Mutex<Option<ElementId>>,
    registry: Mutex<ListenerRegistry>,
    progress: Mutex<ProgressTracker>,
    first_play: Mutex<FirstPlayLatch>,
    first_play_relay: Mutex<Option<Relay>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    cleared: AtomicBool,
}

impl<B: ?Sized + NativeEvents + 'static> ProviderCore<B> {
    pub fn new(id: &str, kind: ProviderKind, events: EventMap) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            kind,
            events,
            gate: ReadinessGate::new(),
            backend: RwLock::new(None),
            mount: Mutex::new(None),
            registry: Mutex::new(ListenerRegistry::new()),
            progress: Mutex::new(ProgressTracker::new()),
            first_play: Mutex::new(FirstPlayLatch::new()),
            first_play_relay: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
            cleared: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn gate(&self) -> &ReadinessGate {
        &self.gate
    }

    pub fn readiness(&self) -> ReadinessState {
        self.gate.state()
    }

    /// Run the construction sequence in the background
    pub fn spawn_construction<F>(self: &Arc<Self>, construction: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let core = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = construction.await {
                core.fail(err);
            }
        });
    }

    pub fn fail(&self, err: Error) {
        if self.gate.fail(err.clone()) {
            error!(
                provider = %self.kind,
                id = %self.id,
                code = err.error_code(),
                error = %err,
                "Player failed to load"
            );
        }
    }

    /// Hand over the constructed backend and its mounted element
    pub fn install(&self, backend: Arc<B>, mount: ElementId) {
        *self.backend.write().unwrap_or_else(PoisonError::into_inner) = Some(backend);
        *lock(&self.mount) = Some(mount);
    }

    pub fn backend(&self) -> Option<Arc<B>> {
        self.backend
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Keep a background task alive until teardown
    pub fn track_task(&self, task: JoinHandle<()>) {
        lock(&self.tasks).push(task);
    }

    /// Wait for readiness and hand out the backend
    pub async fn ready(&self) -> Result<Arc<B>> {
        self.gate.wait().await?;
        if self.cleared.load(Ordering::Acquire) {
            return Err(Error::Cleared(self.id.clone()));
        }
        self.backend()
            .ok_or_else(|| Error::Internal(format!("player {} ready without a backend", self.id)))
    }

    pub async fn on(self: &Arc<Self>, event: &str, callback: Listener, once: bool) -> Result<()> {
        let backend = self.ready().await?;
        self.subscribe(&backend, event, callback, once);
        Ok(())
    }

    pub async fn off(&self, event: &str, callback: &Listener) -> Result<()> {
        let backend = self.ready().await?;
        self.unsubscribe(&backend, event, callback);
        Ok(())
    }

    fn subscribe(self: &Arc<Self>, backend: &B, event: &str, callback: Listener, once: bool) {
        let attach = {
            let mut registry = lock(&self.registry);
            let attach = registry.needs_relay(event).then(|| Relay {
                native: self.events.native_name(event).to_string(),
                handler: self.relay_for(event),
            });
            if let Some(relay) = &attach {
                registry.set_relay(event, relay.clone());
            }
            registry.insert(event, ListenerRecord { callback, once });
            attach
        };

        if let Some(relay) = attach {
            debug!(id = %self.id, event, native = %relay.native, "Relay registered");
            backend.add_listener(&relay.native, relay.handler);
        }
    }

    fn unsubscribe(&self, backend: &B, event: &str, callback: &Listener) {
        let detach = lock(&self.registry).remove(event, callback);
        if let Some(relay) = detach {
            debug!(id = %self.id, event, native = %relay.native, "Relay removed");
            backend.remove_listener(&relay.native, &relay.handler);
        }
    }

    fn relay_for(self: &Arc<Self>, event: &str) -> Listener {
        let core = Arc::downgrade(self);
        let event = event.to_string();
        Listener::new(move |data| {
            if let Some(core) = core.upgrade() {
                core.fire(&event, data);
            }
        })
    }

    /// Call every listener of `event` in current order
    pub fn fire(&self, event: &str, data: &EventPayload) {
        let records = lock(&self.registry).snapshot(event);
        if records.is_empty() {
            return;
        }
        trace!(id = %self.id, event, listeners = records.len(), "Firing event");

        for record in records {
            record.callback.call(data);
            if record.once {
                match self.backend() {
                    Some(backend) => self.unsubscribe(&backend, event, &record.callback),
                    None => {
                        lock(&self.registry).remove(event, &record.callback);
                    }
                }
            }
        }
    }

    pub fn listeners(&self) -> Listeners {
        lock(&self.registry).listeners()
    }

    /// Feed a position/duration tick to the progress synthesizer
    pub fn observe_progress(&self, position: f64, duration: f64) {
        let marks = lock(&self.progress).tick(position, duration);
        for mark in marks {
            debug!(id = %self.id, percent = mark.percent, position, "Playback progress");
            self.fire(&mark.event_name(), &mark.payload());
        }
    }

    /// Reset the first-play latch and register its handler on `native_play`
    pub fn arm_first_play(self: &Arc<Self>, backend: &B, native_play: &str) {
        lock(&self.first_play).reset();

        let handler = {
            let mut slot = lock(&self.first_play_relay);
            if slot.is_some() {
                return;
            }
            let core = Arc::downgrade(self);
            let handler = Listener::new(move |_| {
                if let Some(core) = core.upgrade() {
                    core.observe_play();
                }
            });
            *slot = Some(Relay {
                native: native_play.to_string(),
                handler: handler.clone(),
            });
            handler
        };
        backend.add_listener(native_play, handler);
    }

    /// Record a play transition; the first one fires `firstPlay`
    pub fn observe_play(&self) {
        if !lock(&self.first_play).observe_play() {
            return;
        }
        debug!(id = %self.id, "First play");
        self.fire(FIRST_PLAY, &Value::Null);

        let relay = lock(&self.first_play_relay).take();
        if let (Some(relay), Some(backend)) = (relay, self.backend()) {
            backend.remove_listener(&relay.native, &relay.handler);
        }
    }

    /// Re-arm `firstPlay` for backends that observe play transitions directly
    pub fn reset_first_play(&self) {
        lock(&self.first_play).reset();
    }

    /// Drop every listener, stop background tasks, unmount and release the backend
    pub fn teardown(&self, dom: &dyn Dom) -> Option<Arc<B>> {
        self.cleared.store(true, Ordering::Release);

        for task in lock(&self.tasks).drain(..) {
            task.abort();
        }

        let relays = lock(&self.registry).drain();
        let first_play = lock(&self.first_play_relay).take();
        let backend = self
            .backend
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(backend) = &backend {
            for relay in relays.iter().chain(first_play.iter()) {
                backend.remove_listener(&relay.native, &relay.handler);
            }
        }
        lock(&self.progress).reset();

        if let Some(mount) = lock(&self.mount).take() {
            dom.remove_element(&mount);
        }

        info!(provider = %self.kind, id = %self.id, "Player cleared");
        backend
    }
}
