//! Player registry
//!
//! Keeps every player created on a page under a generated id and forwards
//! commands to them by id.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

use crate::{
    config::PlayerDefaults,
    host::Page,
    validation::{validate_number, validate_options, validate_player_id},
    Download, Error, Listener, Player, PlayerOptions, Result,
};

/// Players of one page keyed by id
pub struct PlayerRegistry {
    page: Arc<Page>,
    defaults: PlayerDefaults,
    players: Mutex<BTreeMap<String, Player>>,
}

impl PlayerRegistry {
    /// A registry using the page configuration's defaults
    pub fn new(page: Arc<Page>) -> Self {
        let defaults = page.config().defaults.clone();
        Self::with_defaults(page, defaults)
    }

    pub fn with_defaults(page: Arc<Page>, defaults: PlayerDefaults) -> Self {
        Self {
            page,
            defaults,
            players: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn defaults(&self) -> &PlayerDefaults {
        &self.defaults
    }

    pub fn page(&self) -> &Arc<Page> {
        &self.page
    }

    /// `{prefix}{idOrUrl}_{n}` with the first free `n` starting at 1
    pub fn generate_id(&self, id_or_url: &str) -> String {
        self.next_id(&self.lock(), id_or_url)
    }

    fn next_id(&self, players: &BTreeMap<String, Player>, id_or_url: &str) -> String {
        (1..)
            .map(|n| format!("{}{}_{}", self.defaults.id_prefix, id_or_url, n))
            .find(|id| !players.contains_key(id))
            .unwrap_or_default()
    }

    /// Validate options, create the player and register its initial listeners
    ///
    /// Listeners in `options.events` are attached once the player is ready.
    #[instrument(skip(self, options), fields(provider = ?options.provider))]
    pub fn create_player(&self, options: PlayerOptions) -> Result<Player> {
        validate_options(&options, "createPlayer").into_result()?;

        let provider = options
            .provider
            .clone()
            .or_else(|| self.defaults.provider.clone())
            .ok_or_else(|| {
                Error::InvalidOptions(
                    "cannot create player: provider or a default provider is required".into(),
                )
            })?;
        let mut options = options;
        options.provider = Some(provider);
        let events = std::mem::take(&mut options.events);

        let mut players = self.lock();
        let id = self.next_id(&players, options.id_or_url().unwrap_or_default());

        let player = Player::new(&options, &id, Arc::clone(&self.page))?;
        players.insert(id.clone(), player.clone());
        drop(players);
        info!(id = %id, provider = %player.kind(), "Player created");

        if !events.is_empty() {
            let target = player.clone();
            tokio::spawn(async move {
                for (event, callback) in events {
                    if let Err(err) = target.on(&event, callback).await {
                        warn!(id = %target.id(), event = %event, error = %err, "Initial listener not registered");
                    }
                }
            });
        }
        Ok(player)
    }

    pub fn get_player(&self, id: &str) -> Result<Player> {
        validate_player_id(id, "getPlayer").into_result()?;
        self.lock()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::PlayerNotFound(id.to_string()))
    }

    /// Every player keyed by id
    pub fn players(&self) -> BTreeMap<String, Player> {
        self.lock().clone()
    }

    pub fn players_as_vec(&self) -> Vec<Player> {
        self.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub async fn add_event_listener(
        &self,
        id: &str,
        event: &str,
        callback: Listener,
    ) -> Result<Listener> {
        self.get_player(id)?.on(event, callback).await
    }

    pub async fn remove_event_listener(
        &self,
        id: &str,
        event: &str,
        callback: &Listener,
    ) -> Result<()> {
        self.get_player(id)?.off(event, callback).await
    }

    /// Unregister a player, then tear it down
    pub async fn clear(&self, id: &str) -> Result<()> {
        let player = self.get_player(id)?;
        self.lock().remove(id);
        debug!(id, "Player unregistered");
        player.clear().await
    }

    /// Tear down every player; the first failure is returned after all ran
    pub async fn clear_all(&self) -> Result<()> {
        let players = std::mem::take(&mut *self.lock());
        let results =
            futures::future::join_all(players.values().map(|player| player.clear())).await;
        info!(count = players.len(), "All players cleared");
        results.into_iter().collect()
    }

    pub async fn play(&self, id: &str) -> Result<()> {
        self.get_player(id)?.play().await
    }

    pub async fn pause(&self, id: &str) -> Result<()> {
        self.get_player(id)?.pause().await
    }

    pub async fn stop(&self, id: &str) -> Result<()> {
        self.get_player(id)?.stop().await
    }

    pub async fn mute(&self, id: &str) -> Result<()> {
        self.get_player(id)?.mute().await
    }

    pub async fn unmute(&self, id: &str) -> Result<()> {
        self.get_player(id)?.unmute().await
    }

    pub async fn toggle_mute(&self, id: &str) -> Result<()> {
        self.get_player(id)?.toggle_mute().await
    }

    pub async fn toggle_full_screen(&self, id: &str) -> Result<()> {
        self.get_player(id)?.toggle_full_screen().await
    }

    pub async fn toggle_play(&self, id: &str) -> Result<()> {
        self.get_player(id)?.toggle_play().await
    }

    pub async fn set_volume(&self, id: &str, level: f64) -> Result<()> {
        validate_number(level, "setVolume").into_result()?;
        self.get_player(id)?.set_volume(level).await
    }

    pub async fn seek(&self, id: &str, seconds: f64) -> Result<()> {
        validate_number(seconds, "seek").into_result()?;
        self.get_player(id)?.seek(seconds).await
    }

    /// Skip ahead; `None` uses the configured forward step
    pub async fn forward(&self, id: &str, seconds: Option<f64>) -> Result<()> {
        let seconds = seconds.unwrap_or(self.defaults.forward_seconds);
        validate_number(seconds, "forward").into_result()?;
        self.get_player(id)?.forward(seconds).await
    }

    /// Skip back; `None` uses the configured rewind step
    pub async fn rewind(&self, id: &str, seconds: Option<f64>) -> Result<()> {
        let seconds = seconds.unwrap_or(self.defaults.rewind_seconds);
        validate_number(seconds, "rewind").into_result()?;
        self.get_player(id)?.rewind(seconds).await
    }

    pub async fn download(&self, id: &str) -> Result<Download> {
        self.get_player(id)?.download().await
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Player>> {
        self.players.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
