//! Dailymotion adapter
//!
//! The player is usable only after it emits `apiready`. It reports the first
//! play itself through `start`, so nothing is synthesized for it.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use super::{mount_element, normalize_volume, sdk_global, ProviderCore, VideoProvider};
use crate::{
    events::DAILYMOTION_EVENTS,
    host::{NewElement, Page},
    listeners::NativeEvents,
    readiness::ReadinessState,
    Download, ElementId, Listener, Listeners, MountTarget, PlayerOptions, ProviderKind, Result,
};

/// Global installed by the Dailymotion SDK script
pub const DAILYMOTION_GLOBAL: &str = "DM";

/// Native surface of a Dailymotion player
pub trait DailymotionApi: NativeEvents {
    fn play(&self);
    fn pause(&self);
    fn seek(&self, seconds: f64);
    fn set_muted(&self, muted: bool);
    fn toggle_muted(&self);
    fn muted(&self) -> bool;
    fn paused(&self) -> bool;
    fn fullscreen(&self) -> bool;
    fn set_fullscreen(&self, fullscreen: bool);
    /// Volume on the 0–1 scale
    fn set_volume(&self, volume: f64);
    fn current_time(&self) -> f64;
    fn duration(&self) -> f64;
    /// Open the video on dailymotion.com
    fn watch_on_site(&self);
}

/// The `DM` namespace
pub trait DailymotionSdk: Send + Sync {
    /// `DM.player(mount, options)`
    fn create_player(&self, mount: &ElementId, options: &Value)
        -> Result<Arc<dyn DailymotionApi>>;
}

/// Adapter for the Dailymotion player API
pub struct DailymotionProvider {
    core: Arc<ProviderCore<dyn DailymotionApi>>,
    page: Arc<Page>,
}

impl DailymotionProvider {
    pub fn new(options: &PlayerOptions, id: &str, page: Arc<Page>) -> Self {
        let core = ProviderCore::new(id, ProviderKind::Dailymotion, DAILYMOTION_EVENTS);
        core.spawn_construction(construct(
            Arc::clone(&core),
            Arc::clone(&page),
            options.dom_node.clone(),
            options.backend_init("video"),
        ));
        Self { core, page }
    }
}

async fn construct(
    core: Arc<ProviderCore<dyn DailymotionApi>>,
    page: Arc<Page>,
    target: MountTarget,
    init: Value,
) -> Result<()> {
    page.load_sdk(ProviderKind::Dailymotion).await?;
    let sdk: Arc<dyn DailymotionSdk> = sdk_global(&page, DAILYMOTION_GLOBAL)?;
    core.gate().constructing();

    let mount = mount_element(
        page.dom().as_ref(),
        &target,
        NewElement::new("iframe", core.id()),
        true,
    )?;
    let player = sdk.create_player(&mount, &init)?;
    core.install(Arc::clone(&player), mount);

    let weak = Arc::downgrade(&core);
    player.add_listener(
        "timeupdate",
        Listener::new(move |_| {
            if let Some(core) = weak.upgrade() {
                if let Some(player) = core.backend() {
                    core.observe_progress(player.current_time(), player.duration());
                }
            }
        }),
    );

    let weak = Arc::downgrade(&core);
    player.add_listener(
        "apiready",
        Listener::new(move |_| {
            if let Some(core) = weak.upgrade() {
                if core.gate().resolve() {
                    info!(id = %core.id(), "Dailymotion player ready");
                }
            }
        }),
    );
    Ok(())
}

#[async_trait]
impl VideoProvider for DailymotionProvider {
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
        self.core.ready().await?.play();
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.core.ready().await?.pause();
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let player = self.core.ready().await?;
        player.pause();
        player.seek(0.0);
        Ok(())
    }

    async fn mute(&self) -> Result<()> {
        self.core.ready().await?.set_muted(true);
        Ok(())
    }

    async fn unmute(&self) -> Result<()> {
        self.core.ready().await?.set_muted(false);
        Ok(())
    }

    async fn toggle_mute(&self) -> Result<()> {
        self.core.ready().await?.toggle_muted();
        Ok(())
    }

    async fn toggle_full_screen(&self) -> Result<()> {
        let player = self.core.ready().await?;
        player.set_fullscreen(!player.fullscreen());
        Ok(())
    }

    async fn toggle_play(&self) -> Result<()> {
        let player = self.core.ready().await?;
        if player.paused() {
            player.play();
        } else {
            player.pause();
        }
        Ok(())
    }

    async fn set_volume(&self, level: f64) -> Result<()> {
        self.core.ready().await?.set_volume(normalize_volume(level));
        Ok(())
    }

    async fn forward(&self, seconds: f64) -> Result<()> {
        let player = self.core.ready().await?;
        player.seek(player.current_time() + seconds);
        Ok(())
    }

    async fn rewind(&self, seconds: f64) -> Result<()> {
        let player = self.core.ready().await?;
        player.seek(player.current_time() - seconds);
        Ok(())
    }

    async fn seek(&self, seconds: f64) -> Result<()> {
        self.core.ready().await?.seek(seconds);
        Ok(())
    }

    async fn download(&self) -> Result<Download> {
        self.core.ready().await?.watch_on_site();
        Ok(Download::Triggered)
    }

    async fn clear(&self) -> Result<()> {
        self.core.ready().await?;
        self.core.teardown(self.page.dom().as_ref());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{counter, harness, FakeBackend, FakeCall};
    use serde_json::json;
    use std::sync::atomic::Ordering;

    async fn ready_player() -> (DailymotionProvider, Arc<FakeBackend>) {
        let (page, sdk) = harness();
        let options = PlayerOptions::new("#root").video_id("x2m8jpp");
        let provider = DailymotionProvider::new(&options, "dm1", page);
        let player = sdk.wait_for_player().await;
        player.emit("apiready", &Value::Null);
        provider.ready().await.unwrap();
        (provider, player)
    }

    #[tokio::test]
    async fn test_waits_for_apiready() {
        let (page, sdk) = harness();
        let options = PlayerOptions::new("#root").video_id("x2m8jpp");
        let provider = DailymotionProvider::new(&options, "dm1", page.clone());

        let player = sdk.wait_for_player().await;
        assert_eq!(provider.readiness(), ReadinessState::Constructing);
        assert_eq!(sdk.created()[0].1, json!({"video": "x2m8jpp"}));
        assert_eq!(
            page.dom().resolve(&"#dm1".into()),
            Some(ElementId::new("dm1"))
        );

        player.emit("apiready", &Value::Null);
        provider.ready().await.unwrap();
        assert_eq!(provider.readiness(), ReadinessState::Ready);
    }

    #[tokio::test]
    async fn test_first_play_is_native_start() {
        let (provider, player) = ready_player().await;
        let (cb, count) = counter();
        provider.on("firstPlay", cb, false).await.unwrap();
        assert_eq!(player.listener_count("start"), 1);

        player.emit("play", &Value::Null);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        player.emit("start", &Value::Null);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_pauses_and_rewinds() {
        let (provider, player) = ready_player().await;
        provider.stop().await.unwrap();
        assert_eq!(player.calls(), vec![FakeCall::Pause, FakeCall::Seek(0.0)]);
    }

    #[tokio::test]
    async fn test_toggles_and_download() {
        let (provider, player) = ready_player().await;
        provider.toggle_full_screen().await.unwrap();
        provider.toggle_mute().await.unwrap();
        assert_eq!(provider.download().await.unwrap(), Download::Triggered);

        assert_eq!(
            player.calls(),
            vec![
                FakeCall::SetFullscreen(true),
                FakeCall::ToggleMute,
                FakeCall::WatchOnSite
            ]
        );
    }

    #[tokio::test]
    async fn test_clear_removes_iframe() {
        let (provider, _player) = ready_player().await;
        provider.clear().await.unwrap();
        assert_eq!(provider.clear().await, Err(crate::Error::Cleared("dm1".into())));
    }
}
