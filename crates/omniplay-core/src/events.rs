//! Generic ↔ native event names
//!
//! Each backend has a static table from generic event names to the names its
//! SDK emits. Names missing from the table are passed through unchanged.

use crate::ProviderKind;

/// Events produced only by the progress synthesizer; never registered on a backend
pub const SYNTHETIC_EVENTS: [&str; 3] = [
    "playbackProgress25",
    "playbackProgress50",
    "playbackProgress75",
];

/// Fired once per play-through, on the first play transition
pub const FIRST_PLAY: &str = "firstPlay";

pub fn is_synthetic(event: &str) -> bool {
    SYNTHETIC_EVENTS.contains(&event)
}

/// Static generic → native table of one backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventMap {
    entries: &'static [(&'static str, &'static str)],
}

impl EventMap {
    pub const fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        Self { entries }
    }

    /// Native name for a generic one
    ///
    /// An exact generic key wins; a name that already is a native value is kept
    /// verbatim; anything else passes through.
    pub fn native_name<'a>(&self, event: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|(generic, _)| *generic == event)
            .map(|(_, native)| *native)
            .unwrap_or(event)
    }

    /// Generic name for a native one (pass-through when unmapped)
    pub fn generic_name<'a>(&self, native: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|(_, n)| *n == native)
            .map(|(generic, _)| *generic)
            .unwrap_or(native)
    }

    pub fn entries(&self) -> &'static [(&'static str, &'static str)] {
        self.entries
    }

    /// The table used by a backend's adapter
    pub fn for_kind(kind: ProviderKind) -> EventMap {
        match kind {
            ProviderKind::Youtube => YOUTUBE_EVENTS,
            ProviderKind::Vimeo => VIMEO_EVENTS,
            ProviderKind::Dailymotion => DAILYMOTION_EVENTS,
            ProviderKind::Flowplayer => FLOWPLAYER_EVENTS,
            ProviderKind::Iframe => IFRAME_EVENTS,
            ProviderKind::Test => TEST_EVENTS,
        }
    }
}

pub const YOUTUBE_EVENTS: EventMap = EventMap::new(&[]);

pub const VIMEO_EVENTS: EventMap = EventMap::new(&[
    ("end", "ended"),
    ("playbackProgress", "timeupdate"),
    ("loadProgress", "progress"),
    ("seek", "seeked"),
    ("setVolume", "volumechange"),
    ("buffering", "bufferstart"),
]);

pub const DAILYMOTION_EVENTS: EventMap = EventMap::new(&[
    ("end", "video_end"),
    ("playbackProgress", "timeupdate"),
    ("loadProgress", "progress"),
    ("seek", "seeked"),
    ("setVolume", "volumechange"),
    ("buffering", "waiting"),
    ("firstPlay", "start"),
]);

pub const FLOWPLAYER_EVENTS: EventMap = EventMap::new(&[
    ("end", "finish"),
    ("playbackProgress", "progress"),
    ("loadProgress", "buffer"),
    ("setVolume", "volume"),
    ("play", "resume"),
]);

pub const IFRAME_EVENTS: EventMap = EventMap::new(&[
    ("end", "finish"),
    ("playbackProgress", "progress"),
    ("firstPlay", "firstplay"),
]);

pub const TEST_EVENTS: EventMap = EventMap::new(&[
    ("end", "ended"),
    ("playbackProgress", "timeupdate"),
    ("seek", "seeked"),
    ("setVolume", "volumechange"),
]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_name_lookup_order() {
        // exact generic key
        assert_eq!(VIMEO_EVENTS.native_name("end"), "ended");
        // already native
        assert_eq!(VIMEO_EVENTS.native_name("timeupdate"), "timeupdate");
        // pass-through
        assert_eq!(VIMEO_EVENTS.native_name("play"), "play");
        assert_eq!(YOUTUBE_EVENTS.native_name("error"), "error");
    }

    #[test]
    fn test_generic_name() {
        assert_eq!(IFRAME_EVENTS.generic_name("finish"), "end");
        assert_eq!(IFRAME_EVENTS.generic_name("pause"), "pause");
        assert_eq!(FLOWPLAYER_EVENTS.generic_name("resume"), "play");
    }

    #[test]
    fn test_synthetic_events() {
        assert!(is_synthetic("playbackProgress50"));
        assert!(!is_synthetic("playbackProgress"));
        assert!(!is_synthetic(FIRST_PLAY));
    }

    #[test]
    fn test_for_kind() {
        assert_eq!(EventMap::for_kind(ProviderKind::Dailymotion).native_name("end"), "video_end");
        assert_eq!(EventMap::for_kind(ProviderKind::Youtube).entries().len(), 0);
    }
}
