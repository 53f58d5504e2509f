//! Configuration for players, the registry and backend SDK assets

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::{
    loader::AssetBundle,
    provider::{DAILYMOTION_GLOBAL, FLOWPLAYER_GLOBAL, TEST_GLOBAL, VIMEO_GLOBAL, YOUTUBE_GLOBAL},
    ProviderKind, Result,
};

/// Registry and adapter defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerDefaults {
    /// Prefix for generated player ids
    pub id_prefix: String,
    /// Backend used when the creation options name none
    pub provider: Option<String>,
    /// Seconds used by `forward` when none are given
    pub forward_seconds: f64,
    /// Seconds used by `rewind` when none are given
    pub rewind_seconds: f64,
    /// Progress poll interval for backends without a time-update event
    pub progress_poll_interval_ms: u64,
}

impl Default for PlayerDefaults {
    fn default() -> Self {
        Self {
            id_prefix: "video_".to_string(),
            provider: None,
            forward_seconds: 15.0,
            rewind_seconds: 15.0,
            progress_poll_interval_ms: 250,
        }
    }
}

impl PlayerDefaults {
    pub fn progress_poll_interval(&self) -> Duration {
        Duration::from_millis(self.progress_poll_interval_ms.max(1))
    }
}

/// Script and style locations of every backend SDK
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkUrls {
    pub youtube: String,
    pub vimeo: String,
    pub dailymotion: String,
    pub jquery: String,
    pub flowplayer: String,
    pub flowplayer_skin: String,
}

impl Default for SdkUrls {
    fn default() -> Self {
        Self {
            youtube: "https://www.youtube.com/iframe_api".to_string(),
            vimeo: "https://player.vimeo.com/api/player.js".to_string(),
            dailymotion: "https://api.dmcdn.net/all.js".to_string(),
            jquery: "https://code.jquery.com/jquery-1.12.4.min.js".to_string(),
            flowplayer: "https://releases.flowplayer.org/7.2.7/flowplayer.min.js".to_string(),
            flowplayer_skin: "https://releases.flowplayer.org/7.2.7/skin/skin.css".to_string(),
        }
    }
}

impl SdkUrls {
    /// Asset bundle for a backend
    pub fn bundle(&self, kind: ProviderKind) -> Result<AssetBundle> {
        let parse = |s: &str| Url::parse(s).map_err(crate::Error::from);

        Ok(match kind {
            ProviderKind::Youtube => {
                AssetBundle::new(Some(YOUTUBE_GLOBAL)).script(parse(&self.youtube)?)
            }
            ProviderKind::Vimeo => AssetBundle::new(Some(VIMEO_GLOBAL)).script(parse(&self.vimeo)?),
            ProviderKind::Dailymotion => {
                AssetBundle::new(Some(DAILYMOTION_GLOBAL)).script(parse(&self.dailymotion)?)
            }
            ProviderKind::Flowplayer => AssetBundle::new(Some(FLOWPLAYER_GLOBAL))
                .script(parse(&self.jquery)?)
                .script(parse(&self.flowplayer)?)
                .style(parse(&self.flowplayer_skin)?),
            ProviderKind::Iframe => AssetBundle::new(None),
            ProviderKind::Test => AssetBundle::new(Some(TEST_GLOBAL)),
        })
    }
}

/// Top level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OmniplayConfig {
    pub defaults: PlayerDefaults,
    pub sdk_urls: SdkUrls,
}

impl OmniplayConfig {
    /// Parse a JSON configuration document
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let defaults = PlayerDefaults::default();
        assert_eq!(defaults.id_prefix, "video_");
        assert_eq!(defaults.forward_seconds, 15.0);
        assert_eq!(defaults.rewind_seconds, 15.0);
        assert_eq!(defaults.progress_poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = OmniplayConfig::from_json(r#"{"defaults": {"forward_seconds": 30}}"#).unwrap();
        assert_eq!(config.defaults.forward_seconds, 30.0);
        assert_eq!(config.defaults.id_prefix, "video_");
        assert_eq!(config.sdk_urls, SdkUrls::default());
    }

    #[test]
    fn test_flowplayer_bundle() {
        let bundle = SdkUrls::default().bundle(ProviderKind::Flowplayer).unwrap();
        assert_eq!(bundle.global.as_deref(), Some("flowplayer"));
        assert_eq!(bundle.scripts.len(), 2);
        assert_eq!(bundle.styles.len(), 1);
    }

    #[test]
    fn test_bad_url_is_load_failure() {
        let urls = SdkUrls {
            vimeo: "not a url".into(),
            ..Default::default()
        };
        let err = urls.bundle(ProviderKind::Vimeo).unwrap_err();
        assert_eq!(err.error_code(), "LOAD_FAILURE");
    }
}
