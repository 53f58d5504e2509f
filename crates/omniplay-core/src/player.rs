//! Player handle
//!
//! A [`Player`] is a cheap, cloneable handle over the adapter built for its
//! backend. Commands log through `tracing` and forward to the adapter.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::{
    host::Page,
    provider::{create_provider, VideoProvider},
    readiness::ReadinessState,
    Download, Error, Listener, Listeners, PlayerOptions, ProviderKind, Result,
};

/// A player driving one embedded backend
#[derive(Clone)]
pub struct Player {
    provider: Arc<dyn VideoProvider>,
}

impl Player {
    /// Build the adapter named by `options.provider`
    ///
    /// Must be called within a tokio runtime: backend loading and
    /// construction continue in the background.
    pub fn new(options: &PlayerOptions, id: &str, page: Arc<Page>) -> Result<Self> {
        let name = options
            .provider
            .as_deref()
            .ok_or_else(|| Error::UnsupportedBackend(String::new()))?;
        let kind: ProviderKind = name.parse()?;
        debug!(id, provider = %kind, "Creating player");
        Ok(Self {
            provider: create_provider(kind, options, id, page),
        })
    }

    /// Wrap an existing adapter
    pub fn from_provider(provider: Arc<dyn VideoProvider>) -> Self {
        Self { provider }
    }

    pub fn id(&self) -> &str {
        self.provider.id()
    }

    pub fn kind(&self) -> ProviderKind {
        self.provider.kind()
    }

    pub fn readiness(&self) -> ReadinessState {
        self.provider.readiness()
    }

    pub fn provider(&self) -> &Arc<dyn VideoProvider> {
        &self.provider
    }

    pub async fn ready(&self) -> Result<()> {
        self.provider.ready().await
    }

    /// Add a listener; returns the handle to pass to [`Player::off`]
    pub async fn on(&self, event: &str, callback: Listener) -> Result<Listener> {
        self.provider.on(event, callback.clone(), false).await?;
        Ok(callback)
    }

    /// Add a listener removed after its first call
    pub async fn one(&self, event: &str, callback: Listener) -> Result<Listener> {
        self.provider.one(event, callback.clone()).await?;
        Ok(callback)
    }

    pub async fn off(&self, event: &str, callback: &Listener) -> Result<()> {
        self.provider.off(event, callback).await
    }

    pub fn get_listeners(&self) -> Listeners {
        self.provider.get_listeners()
    }

    #[instrument(skip(self), fields(id = %self.id()))]
    pub async fn play(&self) -> Result<()> {
        self.provider.play().await
    }

    #[instrument(skip(self), fields(id = %self.id()))]
    pub async fn pause(&self) -> Result<()> {
        self.provider.pause().await
    }

    #[instrument(skip(self), fields(id = %self.id()))]
    pub async fn stop(&self) -> Result<()> {
        self.provider.stop().await
    }

    #[instrument(skip(self), fields(id = %self.id()))]
    pub async fn mute(&self) -> Result<()> {
        self.provider.mute().await
    }

    #[instrument(skip(self), fields(id = %self.id()))]
    pub async fn unmute(&self) -> Result<()> {
        self.provider.unmute().await
    }

    #[instrument(skip(self), fields(id = %self.id()))]
    pub async fn toggle_mute(&self) -> Result<()> {
        self.provider.toggle_mute().await
    }

    #[instrument(skip(self), fields(id = %self.id()))]
    pub async fn toggle_full_screen(&self) -> Result<()> {
        self.provider.toggle_full_screen().await
    }

    #[instrument(skip(self), fields(id = %self.id()))]
    pub async fn toggle_play(&self) -> Result<()> {
        self.provider.toggle_play().await
    }

    /// Volume as 0–1, or 0–100 when above 1
    #[instrument(skip(self), fields(id = %self.id()))]
    pub async fn set_volume(&self, level: f64) -> Result<()> {
        self.provider.set_volume(level).await
    }

    #[instrument(skip(self), fields(id = %self.id()))]
    pub async fn forward(&self, seconds: f64) -> Result<()> {
        self.provider.forward(seconds).await
    }

    #[instrument(skip(self), fields(id = %self.id()))]
    pub async fn rewind(&self, seconds: f64) -> Result<()> {
        self.provider.rewind(seconds).await
    }

    #[instrument(skip(self), fields(id = %self.id()))]
    pub async fn seek(&self, seconds: f64) -> Result<()> {
        self.provider.seek(seconds).await
    }

    #[instrument(skip(self), fields(id = %self.id()))]
    pub async fn download(&self) -> Result<Download> {
        self.provider.download().await
    }

    #[instrument(skip(self), fields(id = %self.id()))]
    pub async fn clear(&self) -> Result<()> {
        self.provider.clear().await
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.id())
            .field("kind", &self.kind())
            .field("readiness", &self.readiness())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryDom, ScriptedAssets};
    use crate::testing::counter;
    use std::sync::atomic::Ordering;

    fn page() -> Arc<Page> {
        Page::new(
            Arc::new(MemoryDom::with_containers(&["v"])),
            Arc::new(ScriptedAssets::new()),
        )
    }

    #[tokio::test]
    async fn test_unknown_provider_fails_synchronously() {
        let options = PlayerOptions::new("#v")
            .video_id("1")
            .provider("myinexistentvideoplayer");
        assert_eq!(
            Player::new(&options, "p", page()).unwrap_err(),
            Error::UnsupportedBackend("myinexistentvideoplayer".into())
        );
    }

    #[tokio::test]
    async fn test_on_returns_handle_for_off() {
        let options = PlayerOptions::new("#v").video_id("123").provider("test");
        let player = Player::new(&options, "p", page()).unwrap();
        let (cb, count) = counter();

        let handle = player.on("pause", cb).await.unwrap();
        player.off("pause", &handle).await.unwrap();
        assert!(player.get_listeners().is_empty());

        player.play().await.unwrap();
        player.pause().await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_debug_shows_identity() {
        let options = PlayerOptions::new("#v").video_id("123").provider("TEST");
        let player = Player::new(&options, "p", page()).unwrap();
        player.ready().await.unwrap();
        let debug = format!("{:?}", player);
        assert!(debug.contains("\"p\""));
        assert!(debug.contains("Test"));
    }
}
