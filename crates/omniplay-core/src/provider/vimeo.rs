//! Vimeo adapter

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use super::{mount_element, normalize_volume, sdk_global, unsupported, ProviderCore, VideoProvider};
use crate::{
    events::VIMEO_EVENTS,
    host::{NewElement, Page},
    listeners::NativeEvents,
    readiness::ReadinessState,
    Download, ElementId, Listener, Listeners, MountTarget, PlayerOptions, ProviderKind, Result,
};

/// Global installed by the Vimeo player script
pub const VIMEO_GLOBAL: &str = "Vimeo";

/// Native surface of a Vimeo player
///
/// The real SDK answers getters asynchronously; adapters treat them as
/// already resolved values.
pub trait VimeoApi: NativeEvents {
    fn play(&self);
    fn pause(&self);
    /// Reset the player to its initial state
    fn unload(&self);
    fn get_paused(&self) -> bool;
    /// Volume on the 0–1 scale
    fn set_volume(&self, volume: f64);
    fn get_volume(&self) -> f64;
    fn get_current_time(&self) -> f64;
    fn set_current_time(&self, seconds: f64);
    fn get_duration(&self) -> f64;
    fn get_video_url(&self) -> String;
    fn destroy(&self);
}

/// The `Vimeo` namespace
pub trait VimeoSdk: Send + Sync {
    /// `new Vimeo.Player(mount, options)`
    fn create_player(&self, mount: &ElementId, options: &Value) -> Result<Arc<dyn VimeoApi>>;
}

/// Adapter for the Vimeo player API
pub struct VimeoProvider {
    core: Arc<ProviderCore<dyn VimeoApi>>,
    page: Arc<Page>,
}

impl VimeoProvider {
    pub fn new(options: &PlayerOptions, id: &str, page: Arc<Page>) -> Self {
        let core = ProviderCore::new(id, ProviderKind::Vimeo, VIMEO_EVENTS);
        core.spawn_construction(construct(
            Arc::clone(&core),
            Arc::clone(&page),
            options.dom_node.clone(),
            options.backend_init("id"),
        ));
        Self { core, page }
    }
}

async fn construct(
    core: Arc<ProviderCore<dyn VimeoApi>>,
    page: Arc<Page>,
    target: MountTarget,
    init: Value,
) -> Result<()> {
    page.load_sdk(ProviderKind::Vimeo).await?;
    let sdk: Arc<dyn VimeoSdk> = sdk_global(&page, VIMEO_GLOBAL)?;
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
        "timeupdate",
        Listener::new(move |_| {
            if let Some(core) = weak.upgrade() {
                if let Some(player) = core.backend() {
                    core.observe_progress(player.get_current_time(), player.get_duration());
                }
            }
        }),
    );
    core.arm_first_play(&*player, "play");

    core.gate().resolve();
    info!(id = %core.id(), "Vimeo player ready");
    Ok(())
}

#[async_trait]
impl VideoProvider for VimeoProvider {
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
        player.unload();
        self.core.arm_first_play(&*player, "play");
        Ok(())
    }

    async fn mute(&self) -> Result<()> {
        self.core.ready().await?.set_volume(0.0);
        Ok(())
    }

    async fn unmute(&self) -> Result<()> {
        self.core.ready().await?.set_volume(1.0);
        Ok(())
    }

    async fn toggle_mute(&self) -> Result<()> {
        let player = self.core.ready().await?;
        let volume = if player.get_volume() > 0.0 { 0.0 } else { 1.0 };
        player.set_volume(volume);
        Ok(())
    }

    async fn toggle_full_screen(&self) -> Result<()> {
        unsupported(ProviderKind::Vimeo, "toggleFullScreen");
        Ok(())
    }

    async fn toggle_play(&self) -> Result<()> {
        let player = self.core.ready().await?;
        if player.get_paused() {
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
        player.set_current_time(player.get_current_time() + seconds);
        Ok(())
    }

    async fn rewind(&self, seconds: f64) -> Result<()> {
        let player = self.core.ready().await?;
        player.set_current_time(player.get_current_time() - seconds);
        Ok(())
    }

    async fn seek(&self, seconds: f64) -> Result<()> {
        self.core.ready().await?.set_current_time(seconds);
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

    async fn ready_player() -> (VimeoProvider, Arc<FakeBackend>) {
        let (page, sdk) = harness();
        let options = PlayerOptions::new("#root").video_id("76979871");
        let provider = VimeoProvider::new(&options, "vm1", page);
        provider.ready().await.unwrap();
        (provider, sdk.last_player().unwrap())
    }

    #[tokio::test]
    async fn test_init_uses_id_key() {
        let (page, sdk) = harness();
        let options = PlayerOptions::new("#root")
            .video_id("76979871")
            .provider_option("loop", json!(true));
        VimeoProvider::new(&options, "vm1", page).ready().await.unwrap();

        let (_, init) = sdk.created().pop().unwrap();
        assert_eq!(init, json!({"id": "76979871", "loop": true}));
    }

    #[tokio::test]
    async fn test_generic_events_use_native_names() {
        let (provider, player) = ready_player().await;
        let (cb, count) = counter();
        provider.on("end", cb, false).await.unwrap();
        assert_eq!(player.listener_count("ended"), 1);

        player.emit("ended", &Value::Null);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_progress_from_timeupdate() {
        let (provider, player) = ready_player().await;
        let (cb, count) = counter();
        provider.on("playbackProgress25", cb, false).await.unwrap();

        player.set_position(25.4, 100.0);
        player.emit("timeupdate", &json!({"seconds": 25.4}));
        player.emit("timeupdate", &json!({"seconds": 25.4}));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_first_play_rearmed_by_stop() {
        let (provider, player) = ready_player().await;
        let (cb, count) = counter();
        provider.on("firstPlay", cb, false).await.unwrap();

        player.emit("play", &Value::Null);
        player.emit("play", &Value::Null);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        provider.stop().await.unwrap();
        player.emit("play", &Value::Null);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(player.calls().contains(&FakeCall::Unload));
    }

    #[tokio::test]
    async fn test_volume_and_mute() {
        let (provider, player) = ready_player().await;
        provider.set_volume(90.0).await.unwrap();
        provider.toggle_mute().await.unwrap();
        provider.toggle_mute().await.unwrap();

        assert_eq!(
            player.calls(),
            vec![
                FakeCall::SetVolume(0.9),
                FakeCall::SetVolume(0.0),
                FakeCall::SetVolume(1.0)
            ]
        );
    }

    #[tokio::test]
    async fn test_forward_and_rewind_are_relative() {
        let (provider, player) = ready_player().await;
        player.set_position(50.0, 100.0);
        provider.forward(10.0).await.unwrap();
        player.set_position(50.0, 100.0);
        provider.rewind(10.0).await.unwrap();

        assert_eq!(
            player.calls(),
            vec![FakeCall::Seek(60.0), FakeCall::Seek(40.0)]
        );
    }
}
