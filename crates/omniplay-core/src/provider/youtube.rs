//! YouTube adapter
//!
//! The YouTube player reports play, pause, end and buffering through one
//! `stateChange` event and has no time-update event, so progress is polled.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::{mount_element, normalize_volume, sdk_global, unsupported, ProviderCore, VideoProvider};
use crate::{
    events::YOUTUBE_EVENTS,
    host::{NewElement, Page},
    listeners::NativeEvents,
    readiness::ReadinessState,
    Download, ElementId, EventPayload, Listener, Listeners, MountTarget, PlayerOptions,
    ProviderKind, Result,
};

/// Global installed by the YouTube iframe API script
pub const YOUTUBE_GLOBAL: &str = "YT";

const STATE_ENDED: i64 = 0;
const STATE_PLAYING: i64 = 1;
const STATE_PAUSED: i64 = 2;
const STATE_BUFFERING: i64 = 3;

/// Native surface of a YouTube player
pub trait YoutubeApi: NativeEvents {
    fn play_video(&self);
    fn pause_video(&self);
    fn stop_video(&self);
    fn mute(&self);
    fn un_mute(&self);
    fn is_muted(&self) -> bool;
    /// Volume on the 0–100 scale
    fn set_volume(&self, volume: f64);
    fn get_current_time(&self) -> f64;
    fn get_duration(&self) -> f64;
    fn seek_to(&self, seconds: f64);
    fn get_player_state(&self) -> i64;
    fn get_video_url(&self) -> String;
    fn destroy(&self);
}

/// The `YT` namespace
pub trait YoutubeSdk: Send + Sync {
    /// `new YT.Player(mount, options)`
    fn create_player(&self, mount: &ElementId, options: &Value) -> Result<Arc<dyn YoutubeApi>>;
}

/// Adapter for the YouTube iframe API
pub struct YoutubeProvider {
    core: Arc<ProviderCore<dyn YoutubeApi>>,
    page: Arc<Page>,
}

impl YoutubeProvider {
    pub fn new(options: &PlayerOptions, id: &str, page: Arc<Page>) -> Self {
        let core = ProviderCore::new(id, ProviderKind::Youtube, YOUTUBE_EVENTS);
        core.spawn_construction(construct(
            Arc::clone(&core),
            Arc::clone(&page),
            options.dom_node.clone(),
            options.backend_init("videoId"),
        ));
        Self { core, page }
    }
}

async fn construct(
    core: Arc<ProviderCore<dyn YoutubeApi>>,
    page: Arc<Page>,
    target: MountTarget,
    init: Value,
) -> Result<()> {
    page.load_sdk(ProviderKind::Youtube).await?;
    let sdk: Arc<dyn YoutubeSdk> = sdk_global(&page, YOUTUBE_GLOBAL)?;
    core.gate().constructing();

    let mount = mount_element(
        page.dom().as_ref(),
        &target,
        NewElement::new("div", core.id()),
        false,
    )?;
    let player = sdk.create_player(&mount, &init)?;
    core.install(Arc::clone(&player), mount);

    let weak = Arc::downgrade(&core);
    player.add_listener(
        "stateChange",
        Listener::new(move |data| {
            if let Some(core) = weak.upgrade() {
                on_state_change(&core, data);
            }
        }),
    );

    let interval = page.config().defaults.progress_poll_interval();
    core.track_task(tokio::spawn(poll_progress(Arc::downgrade(&core), interval)));

    core.gate().resolve();
    info!(id = %core.id(), "YouTube player ready");
    Ok(())
}

/// Read the state code from either a bare number or `{data: n}`
fn state_code(data: &EventPayload) -> Option<i64> {
    data.as_i64()
        .or_else(|| data.get("data").and_then(Value::as_i64))
}

fn state_event(code: i64) -> Option<&'static str> {
    match code {
        STATE_ENDED => Some("end"),
        STATE_PLAYING => Some("play"),
        STATE_PAUSED => Some("pause"),
        STATE_BUFFERING => Some("buffering"),
        _ => None,
    }
}

fn on_state_change(core: &ProviderCore<dyn YoutubeApi>, data: &EventPayload) {
    let Some(code) = state_code(data) else {
        debug!(id = %core.id(), "stateChange without a state code");
        return;
    };
    if let Some(event) = state_event(code) {
        core.fire(event, data);
    }
    if code == STATE_PLAYING {
        core.observe_play();
    }
}

async fn poll_progress(core: Weak<ProviderCore<dyn YoutubeApi>>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let Some(core) = core.upgrade() else { break };
        let Some(player) = core.backend() else { break };
        core.observe_progress(player.get_current_time(), player.get_duration());
    }
}

#[async_trait]
impl VideoProvider for YoutubeProvider {
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
        self.core.ready().await?.play_video();
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.core.ready().await?.pause_video();
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let player = self.core.ready().await?;
        player.stop_video();
        self.core.reset_first_play();
        Ok(())
    }

    async fn mute(&self) -> Result<()> {
        self.core.ready().await?.mute();
        Ok(())
    }

    async fn unmute(&self) -> Result<()> {
        self.core.ready().await?.un_mute();
        Ok(())
    }

    async fn toggle_mute(&self) -> Result<()> {
        let player = self.core.ready().await?;
        if player.is_muted() {
            player.un_mute();
        } else {
            player.mute();
        }
        Ok(())
    }

    async fn toggle_full_screen(&self) -> Result<()> {
        unsupported(ProviderKind::Youtube, "toggleFullScreen");
        Ok(())
    }

    async fn toggle_play(&self) -> Result<()> {
        let player = self.core.ready().await?;
        if player.get_player_state() == STATE_PLAYING {
            player.pause_video();
        } else {
            player.play_video();
        }
        Ok(())
    }

    async fn set_volume(&self, level: f64) -> Result<()> {
        self.core
            .ready()
            .await?
            .set_volume(normalize_volume(level) * 100.0);
        Ok(())
    }

    async fn forward(&self, seconds: f64) -> Result<()> {
        let player = self.core.ready().await?;
        player.seek_to(player.get_current_time() + seconds);
        Ok(())
    }

    async fn rewind(&self, seconds: f64) -> Result<()> {
        let player = self.core.ready().await?;
        player.seek_to(player.get_current_time() - seconds);
        Ok(())
    }

    async fn seek(&self, seconds: f64) -> Result<()> {
        self.core.ready().await?.seek_to(seconds);
        Ok(())
    }

    async fn download(&self) -> Result<Download> {
        Ok(Download::Url(self.core.ready().await?.get_video_url()))
    }

    async fn clear(&self) -> Result<()> {
        self.core.ready().await?;
        if let Some(player) = self.core.teardown(self.page.dom().as_ref()) {
            player.destroy();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{counter, harness, FakeBackend, FakeCall};
    use serde_json::json;
    use std::sync::atomic::Ordering;

    async fn ready_player() -> (YoutubeProvider, Arc<FakeBackend>) {
        let (page, sdk) = harness();
        let options = PlayerOptions::new("#root").video_id("abc");
        let provider = YoutubeProvider::new(&options, "yt1", page);
        provider.ready().await.unwrap();
        (provider, sdk.last_player().unwrap())
    }

    #[test]
    fn test_state_code_forms() {
        assert_eq!(state_code(&json!(1)), Some(1));
        assert_eq!(state_code(&json!({"data": 2})), Some(2));
        assert_eq!(state_code(&json!("x")), None);
        assert_eq!(state_event(3), Some("buffering"));
        assert_eq!(state_event(5), None);
    }

    #[tokio::test]
    async fn test_construction_passes_video_id() {
        let (page, sdk) = harness();
        let options = PlayerOptions::new("#root")
            .video_id("abc")
            .provider_option("playerVars", json!({"autoplay": 0}));
        let provider = YoutubeProvider::new(&options, "yt1", page.clone());
        provider.ready().await.unwrap();

        let (mount, init) = sdk.created().pop().unwrap();
        assert_eq!(mount, ElementId::new("yt1"));
        assert_eq!(init, json!({"videoId": "abc", "playerVars": {"autoplay": 0}}));
        assert!(page.dom().contains(&ElementId::new("yt1")));
    }

    #[tokio::test]
    async fn test_state_change_maps_to_generic_events() {
        let (provider, player) = ready_player().await;
        let (on_play, plays) = counter();
        let (on_end, ends) = counter();
        let (on_first, firsts) = counter();
        provider.on("play", on_play, false).await.unwrap();
        provider.on("end", on_end, false).await.unwrap();
        provider.on("firstPlay", on_first, false).await.unwrap();

        player.emit("stateChange", &json!({"data": 1}));
        player.emit("stateChange", &json!(2));
        player.emit("stateChange", &json!(1));
        player.emit("stateChange", &json!(0));

        assert_eq!(plays.load(Ordering::SeqCst), 2);
        assert_eq!(ends.load(Ordering::SeqCst), 1);
        assert_eq!(firsts.load(Ordering::SeqCst), 1);

        provider.stop().await.unwrap();
        player.emit("stateChange", &json!(1));
        assert_eq!(firsts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_volume_uses_percent_scale() {
        let (provider, player) = ready_player().await;
        provider.set_volume(0.5).await.unwrap();
        provider.set_volume(90.0).await.unwrap();
        assert!(player.calls().ends_with(&[FakeCall::SetVolume(50.0), FakeCall::SetVolume(90.0)]));
    }

    #[tokio::test]
    async fn test_toggles() {
        let (provider, player) = ready_player().await;
        player.set_playing(true);
        provider.toggle_play().await.unwrap();
        player.set_muted(true);
        provider.toggle_mute().await.unwrap();
        provider.toggle_full_screen().await.unwrap();

        assert_eq!(player.calls(), vec![FakeCall::Pause, FakeCall::Unmute]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_is_polled() {
        let (provider, player) = ready_player().await;
        let (cb, count) = counter();
        provider.on("playbackProgress50", cb, false).await.unwrap();

        player.set_position(50.3, 100.0);
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clear_destroys_and_unmounts() {
        let (provider, player) = ready_player().await;
        let (cb, _) = counter();
        provider.on("pause", cb, false).await.unwrap();

        provider.clear().await.unwrap();
        assert!(provider.get_listeners().is_empty());
        assert_eq!(player.calls().last(), Some(&FakeCall::Destroy));
        assert!(provider.play().await.is_err());
    }
}
