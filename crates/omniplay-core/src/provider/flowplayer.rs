//! Flowplayer adapter
//!
//! Plays a direct video url. Needs jQuery and the Flowplayer script plus its
//! skin stylesheet, and resolves readiness on the player's own `ready`.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;

use super::{mount_element, normalize_volume, sdk_global, unsupported, ProviderCore, VideoProvider};
use crate::{
    events::FLOWPLAYER_EVENTS,
    host::{NewElement, Page},
    listeners::NativeEvents,
    readiness::ReadinessState,
    Download, ElementId, Listener, Listeners, MountTarget, PlayerOptions, ProviderKind, Result,
};

/// Global installed by the Flowplayer script
pub const FLOWPLAYER_GLOBAL: &str = "flowplayer";

const DEFAULT_MIME: &str = "video/mp4";

/// Native surface of a Flowplayer instance
pub trait FlowplayerApi: NativeEvents {
    fn resume(&self);
    fn pause(&self);
    fn toggle(&self);
    fn stop(&self);
    /// `Some` forces the muted state, `None` toggles it
    fn mute(&self, muted: Option<bool>);
    fn fullscreen(&self);
    /// Volume on the 0–1 scale
    fn volume(&self, level: f64);
    fn seek(&self, seconds: f64);
    fn time(&self) -> f64;
    fn duration(&self) -> f64;
    fn shutdown(&self);
}

/// The `flowplayer` function
pub trait FlowplayerSdk: Send + Sync {
    /// `flowplayer(mount, options)`
    fn create_player(&self, mount: &ElementId, options: &Value)
        -> Result<Arc<dyn FlowplayerApi>>;
}

/// Adapter for Flowplayer
pub struct FlowplayerProvider {
    core: Arc<ProviderCore<dyn FlowplayerApi>>,
    page: Arc<Page>,
}

impl FlowplayerProvider {
    pub fn new(options: &PlayerOptions, id: &str, page: Arc<Page>) -> Self {
        let core = ProviderCore::new(id, ProviderKind::Flowplayer, FLOWPLAYER_EVENTS);
        core.spawn_construction(construct(
            Arc::clone(&core),
            Arc::clone(&page),
            options.dom_node.clone(),
            clip_options(options),
        ));
        Self { core, page }
    }
}

/// `{clip: {videoId, sources: [{type, src}]}}` overlaid with the provider options
fn clip_options(options: &PlayerOptions) -> Value {
    let mut init = Map::new();
    init.insert(
        "clip".to_string(),
        json!({
            "videoId": options.video_id,
            "sources": [{
                "type": options.mime.as_deref().unwrap_or(DEFAULT_MIME),
                "src": options.url,
            }],
        }),
    );
    for (key, value) in &options.provider_options {
        init.insert(key.clone(), value.clone());
    }
    Value::Object(init)
}

async fn construct(
    core: Arc<ProviderCore<dyn FlowplayerApi>>,
    page: Arc<Page>,
    target: MountTarget,
    init: Value,
) -> Result<()> {
    page.load_sdk(ProviderKind::Flowplayer).await?;
    let sdk: Arc<dyn FlowplayerSdk> = sdk_global(&page, FLOWPLAYER_GLOBAL)?;
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
        "progress",
        Listener::new(move |_| {
            if let Some(core) = weak.upgrade() {
                if let Some(player) = core.backend() {
                    core.observe_progress(player.time(), player.duration());
                }
            }
        }),
    );
    core.arm_first_play(&*player, "resume");

    let weak = Arc::downgrade(&core);
    player.add_listener(
        "ready",
        Listener::new(move |_| {
            if let Some(core) = weak.upgrade() {
                if core.gate().resolve() {
                    info!(id = %core.id(), "Flowplayer ready");
                }
            }
        }),
    );
    Ok(())
}

#[async_trait]
impl VideoProvider for FlowplayerProvider {
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
        self.core.ready().await?.resume();
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.core.ready().await?.pause();
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let player = self.core.ready().await?;
        player.stop();
        self.core.arm_first_play(&*player, "resume");
        Ok(())
    }

    async fn mute(&self) -> Result<()> {
        self.core.ready().await?.mute(Some(true));
        Ok(())
    }

    async fn unmute(&self) -> Result<()> {
        self.core.ready().await?.mute(Some(false));
        Ok(())
    }

    async fn toggle_mute(&self) -> Result<()> {
        self.core.ready().await?.mute(None);
        Ok(())
    }

    async fn toggle_full_screen(&self) -> Result<()> {
        self.core.ready().await?.fullscreen();
        Ok(())
    }

    async fn toggle_play(&self) -> Result<()> {
        self.core.ready().await?.toggle();
        Ok(())
    }

    async fn set_volume(&self, level: f64) -> Result<()> {
        self.core.ready().await?.volume(normalize_volume(level));
        Ok(())
    }

    async fn forward(&self, seconds: f64) -> Result<()> {
        let player = self.core.ready().await?;
        player.seek(player.time() + seconds);
        Ok(())
    }

    async fn rewind(&self, seconds: f64) -> Result<()> {
        let player = self.core.ready().await?;
        player.seek(player.time() - seconds);
        Ok(())
    }

    async fn seek(&self, seconds: f64) -> Result<()> {
        self.core.ready().await?.seek(seconds);
        Ok(())
    }

    async fn download(&self) -> Result<Download> {
        unsupported(ProviderKind::Flowplayer, "download");
        Ok(Download::Unsupported)
    }

    async fn clear(&self) -> Result<()> {
        self.core.ready().await?;
        if let Some(player) = self.core.teardown(self.page.dom().as_ref()) {
            player.shutdown();
        }
        Ok(())
    }
}
