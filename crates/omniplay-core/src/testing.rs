//! Fakes shared by unit tests
//!
//! [`FakeBackend`] implements every backend API and records the mutating
//! calls made on it. [`FakeSdk`] hands out fake backends and remembers what
//! it was asked to construct.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::SdkUrls;
use crate::host::{MemoryDom, Page, ScriptedAssets};
use crate::listeners::NativeEvents;
use crate::provider::{
    DailymotionApi, DailymotionSdk, FlowplayerApi, FlowplayerSdk, VimeoApi, VimeoSdk, YoutubeApi,
    YoutubeSdk, DAILYMOTION_GLOBAL, FLOWPLAYER_GLOBAL, VIMEO_GLOBAL, YOUTUBE_GLOBAL,
};
use crate::{ElementId, EventPayload, Listener, Result};

/// A listener counting its calls
pub fn counter() -> (Listener, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    (
        Listener::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }),
        count,
    )
}

/// A page whose asset host installs `sdk` under every backend global
pub fn harness() -> (Arc<Page>, Arc<FakeSdk>) {
    let sdk = Arc::new(FakeSdk::default());
    let urls = SdkUrls::default();

    let youtube = Arc::clone(&sdk);
    let vimeo = Arc::clone(&sdk);
    let dailymotion = Arc::clone(&sdk);
    let flowplayer = Arc::clone(&sdk);
    let assets = ScriptedAssets::new()
        .with_script(urls.youtube, move |globals| {
            globals.install(YOUTUBE_GLOBAL, Arc::clone(&youtube) as Arc<dyn YoutubeSdk>)
        })
        .with_script(urls.vimeo, move |globals| {
            globals.install(VIMEO_GLOBAL, Arc::clone(&vimeo) as Arc<dyn VimeoSdk>)
        })
        .with_script(urls.dailymotion, move |globals| {
            globals.install(
                DAILYMOTION_GLOBAL,
                Arc::clone(&dailymotion) as Arc<dyn DailymotionSdk>,
            )
        })
        .with_script(urls.jquery, |_| {})
        .with_script(urls.flowplayer, move |globals| {
            globals.install(
                FLOWPLAYER_GLOBAL,
                Arc::clone(&flowplayer) as Arc<dyn FlowplayerSdk>,
            )
        })
        .with_style(urls.flowplayer_skin);

    let dom = Arc::new(MemoryDom::with_containers(&["root"]));
    (Page::new(dom, Arc::new(assets)), sdk)
}

/// Mutating calls recorded by [`FakeBackend`]
#[derive(Debug, Clone, PartialEq)]
pub enum FakeCall {
    Play,
    Pause,
    Toggle,
    Stop,
    Mute,
    Unmute,
    ToggleMute,
    SetMuted(bool),
    SetVolume(f64),
    Seek(f64),
    SetFullscreen(bool),
    ToggleFullscreen,
    Unload,
    WatchOnSite,
    Destroy,
}

#[derive(Debug, Default)]
struct FakeState {
    playing: bool,
    muted: bool,
    fullscreen: bool,
    volume: f64,
    position: f64,
    duration: f64,
    calls: Vec<FakeCall>,
}

/// Backend double shared by the YouTube, Vimeo, Dailymotion and Flowplayer adapters
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
    handlers: Mutex<HashMap<String, Vec<Listener>>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a native event to the registered handlers
    pub fn emit(&self, event: &str, data: &EventPayload) {
        let handlers = self.handlers().get(event).cloned().unwrap_or_default();
        for handler in handlers {
            handler.call(data);
        }
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.handlers().get(event).map_or(0, Vec::len)
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.state().calls.clone()
    }

    pub fn set_playing(&self, playing: bool) {
        self.state().playing = playing;
    }

    pub fn set_muted(&self, muted: bool) {
        self.state().muted = muted;
    }

    pub fn set_position(&self, position: f64, duration: f64) {
        let mut state = self.state();
        state.position = position;
        state.duration = duration;
    }

    fn record(&self, call: FakeCall) {
        let mut state = self.state();
        match &call {
            FakeCall::Play => state.playing = true,
            FakeCall::Pause | FakeCall::Stop => state.playing = false,
            FakeCall::Toggle => state.playing = !state.playing,
            FakeCall::Mute => state.muted = true,
            FakeCall::Unmute => state.muted = false,
            FakeCall::ToggleMute => state.muted = !state.muted,
            FakeCall::SetMuted(muted) => state.muted = *muted,
            FakeCall::SetVolume(volume) => state.volume = *volume,
            FakeCall::Seek(position) => state.position = *position,
            FakeCall::SetFullscreen(fullscreen) => state.fullscreen = *fullscreen,
            FakeCall::ToggleFullscreen => state.fullscreen = !state.fullscreen,
            FakeCall::Unload => {
                state.playing = false;
                state.position = 0.0;
            }
            FakeCall::WatchOnSite | FakeCall::Destroy => {}
        }
        state.calls.push(call);
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handlers(&self) -> MutexGuard<'_, HashMap<String, Vec<Listener>>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NativeEvents for FakeBackend {
    fn add_listener(&self, event: &str, handler: Listener) {
        self.handlers()
            .entry(event.to_string())
            .or_default()
            .push(handler);
    }

    fn remove_listener(&self, event: &str, handler: &Listener) {
        let mut handlers = self.handlers();
        if let Some(list) = handlers.get_mut(event) {
            list.retain(|h| !h.same(handler));
            if list.is_empty() {
                handlers.remove(event);
            }
        }
    }
}

impl YoutubeApi for FakeBackend {
    fn play_video(&self) {
        self.record(FakeCall::Play);
    }

    fn pause_video(&self) {
        self.record(FakeCall::Pause);
    }

    fn stop_video(&self) {
        self.record(FakeCall::Stop);
    }

    fn mute(&self) {
        self.record(FakeCall::Mute);
    }

    fn un_mute(&self) {
        self.record(FakeCall::Unmute);
    }

    fn is_muted(&self) -> bool {
        self.state().muted
    }

    fn set_volume(&self, volume: f64) {
        self.record(FakeCall::SetVolume(volume));
    }

    fn get_current_time(&self) -> f64 {
        self.state().position
    }

    fn get_duration(&self) -> f64 {
        self.state().duration
    }

    fn seek_to(&self, seconds: f64) {
        self.record(FakeCall::Seek(seconds));
    }

    fn get_player_state(&self) -> i64 {
        if self.state().playing {
            1
        } else {
            2
        }
    }

    fn get_video_url(&self) -> String {
        "https://video.example.test/watch".to_string()
    }

    fn destroy(&self) {
        self.record(FakeCall::Destroy);
    }
}

impl VimeoApi for FakeBackend {
    fn play(&self) {
        self.record(FakeCall::Play);
    }

    fn pause(&self) {
        self.record(FakeCall::Pause);
    }

    fn unload(&self) {
        self.record(FakeCall::Unload);
    }

    fn get_paused(&self) -> bool {
        !self.state().playing
    }

    fn set_volume(&self, volume: f64) {
        self.record(FakeCall::SetVolume(volume));
    }

    fn get_volume(&self) -> f64 {
        self.state().volume
    }

    fn get_current_time(&self) -> f64 {
        self.state().position
    }

    fn set_current_time(&self, seconds: f64) {
        self.record(FakeCall::Seek(seconds));
    }

    fn get_duration(&self) -> f64 {
        self.state().duration
    }

    fn get_video_url(&self) -> String {
        "https://video.example.test/watch".to_string()
    }

    fn destroy(&self) {
        self.record(FakeCall::Destroy);
    }
}

impl DailymotionApi for FakeBackend {
    fn play(&self) {
        self.record(FakeCall::Play);
    }

    fn pause(&self) {
        self.record(FakeCall::Pause);
    }

    fn seek(&self, seconds: f64) {
        self.record(FakeCall::Seek(seconds));
    }

    fn set_muted(&self, muted: bool) {
        self.record(FakeCall::SetMuted(muted));
    }

    fn toggle_muted(&self) {
        self.record(FakeCall::ToggleMute);
    }

    fn muted(&self) -> bool {
        self.state().muted
    }

    fn paused(&self) -> bool {
        !self.state().playing
    }

    fn fullscreen(&self) -> bool {
        self.state().fullscreen
    }

    fn set_fullscreen(&self, fullscreen: bool) {
        self.record(FakeCall::SetFullscreen(fullscreen));
    }

    fn set_volume(&self, volume: f64) {
        self.record(FakeCall::SetVolume(volume));
    }

    fn current_time(&self) -> f64 {
        self.state().position
    }

    fn duration(&self) -> f64 {
        self.state().duration
    }

    fn watch_on_site(&self) {
        self.record(FakeCall::WatchOnSite);
    }
}

impl FlowplayerApi for FakeBackend {
    fn resume(&self) {
        self.record(FakeCall::Play);
    }

    fn pause(&self) {
        self.record(FakeCall::Pause);
    }

    fn toggle(&self) {
        self.record(FakeCall::Toggle);
    }

    fn stop(&self) {
        self.record(FakeCall::Stop);
    }

    fn mute(&self, muted: Option<bool>) {
        self.record(match muted {
            Some(true) => FakeCall::Mute,
            Some(false) => FakeCall::Unmute,
            None => FakeCall::ToggleMute,
        });
    }

    fn fullscreen(&self) {
        self.record(FakeCall::ToggleFullscreen);
    }

    fn volume(&self, level: f64) {
        self.record(FakeCall::SetVolume(level));
    }

    fn seek(&self, seconds: f64) {
        self.record(FakeCall::Seek(seconds));
    }

    fn time(&self) -> f64 {
        self.state().position
    }

    fn duration(&self) -> f64 {
        self.state().duration
    }

    fn shutdown(&self) {
        self.record(FakeCall::Destroy);
    }
}

/// SDK double for every backend family
#[derive(Default)]
pub struct FakeSdk {
    created: Mutex<Vec<(ElementId, Value)>>,
    players: Mutex<Vec<Arc<FakeBackend>>>,
}

impl FakeSdk {
    /// Mount and init options of every constructed player
    pub fn created(&self) -> Vec<(ElementId, Value)> {
        lock(&self.created).clone()
    }

    pub fn last_player(&self) -> Option<Arc<FakeBackend>> {
        lock(&self.players).last().cloned()
    }

    /// Yield until a player has been constructed
    pub async fn wait_for_player(&self) -> Arc<FakeBackend> {
        loop {
            if let Some(player) = self.last_player() {
                return player;
            }
            tokio::task::yield_now().await;
        }
    }

    fn construct(&self, mount: &ElementId, options: &Value) -> Arc<FakeBackend> {
        let player = Arc::new(FakeBackend::new());
        lock(&self.created).push((mount.clone(), options.clone()));
        lock(&self.players).push(Arc::clone(&player));
        player
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl YoutubeSdk for FakeSdk {
    fn create_player(&self, mount: &ElementId, options: &Value) -> Result<Arc<dyn YoutubeApi>> {
        Ok(self.construct(mount, options))
    }
}

impl VimeoSdk for FakeSdk {
    fn create_player(&self, mount: &ElementId, options: &Value) -> Result<Arc<dyn VimeoApi>> {
        Ok(self.construct(mount, options))
    }
}

impl DailymotionSdk for FakeSdk {
    fn create_player(
        &self,
        mount: &ElementId,
        options: &Value,
    ) -> Result<Arc<dyn DailymotionApi>> {
        Ok(self.construct(mount, options))
    }
}

impl FlowplayerSdk for FakeSdk {
    fn create_player(
        &self,
        mount: &ElementId,
        options: &Value,
    ) -> Result<Arc<dyn FlowplayerApi>> {
        Ok(self.construct(mount, options))
    }
}
