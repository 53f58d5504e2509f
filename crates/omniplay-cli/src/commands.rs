//! CLI command implementations

use anyhow::{anyhow, Context};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

use omniplay_core::{
    events::{is_synthetic, FIRST_PLAY},
    provider::{SimulatedVideoSdk, TEST_GLOBAL},
    ElementId, EventMap, Listener, MemoryDom, OmniplayConfig, Page, PlayerOptions,
    PlayerRegistry, ProviderKind, ScriptedAssets, SYNTHETIC_EVENTS,
};

use crate::output::{format_output, OutputFormat, TextRow};

/// Events recorded by the demo session
const DEMO_EVENTS: [&str; 9] = [
    "play",
    "pause",
    "end",
    "seek",
    "setVolume",
    "firstPlay",
    "playbackProgress25",
    "playbackProgress50",
    "playbackProgress75",
];

/// Read the configuration file, or use the defaults
pub fn load_config(path: Option<&Path>) -> anyhow::Result<OmniplayConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let config = OmniplayConfig::from_json(&text)
                .with_context(|| format!("parsing {}", path.display()))?;
            Ok(config)
        }
        None => Ok(OmniplayConfig::default()),
    }
}

/// One event seen by the demo session
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub event: String,
    pub data: Value,
}

impl TextRow for EventRecord {
    fn text(&self) -> String {
        if self.data.is_null() {
            format!("  {}", self.event)
        } else {
            format!("  {:<20} {}", self.event, self.data)
        }
    }
}

#[derive(Clone, Default)]
struct EventLog {
    records: Arc<Mutex<Vec<EventRecord>>>,
}

impl EventLog {
    fn recorder(&self, event: &'static str) -> Listener {
        let records = Arc::clone(&self.records);
        Listener::new(move |data| {
            records
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(EventRecord {
                    event: event.to_string(),
                    data: data.clone(),
                });
        })
    }

    fn records(&self) -> Vec<EventRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Play a simulated clip through the registry and print every event
pub async fn demo(
    config: OmniplayConfig,
    video_id: &str,
    duration: f64,
    format: &str,
) -> anyhow::Result<()> {
    anyhow::ensure!(
        duration.is_finite() && duration > 0.0,
        "duration must be a positive number of seconds"
    );
    let dom = Arc::new(MemoryDom::with_containers(&["player"]));
    let page = Page::with_config(dom, Arc::new(ScriptedAssets::new()), config);
    let sdk = Arc::new(SimulatedVideoSdk::new(duration));
    page.globals().install(TEST_GLOBAL, Arc::clone(&sdk));

    let registry = PlayerRegistry::new(page);
    let player = registry.create_player(
        PlayerOptions::new("#player")
            .video_id(video_id)
            .provider("test"),
    )?;
    let id = player.id().to_string();
    info!(id = %id, "Demo player created");

    let log = EventLog::default();
    for event in DEMO_EVENTS {
        registry
            .add_event_listener(&id, event, log.recorder(event))
            .await?;
    }

    registry.play(&id).await?;
    registry.set_volume(&id, 80.0).await?;

    let video = sdk
        .video(&ElementId::new(id.as_str()))
        .ok_or_else(|| anyhow!("no simulated video for {}", id))?;
    // one tick per second until the clip ends
    while video.current_time() < video.duration() {
        video.advance(1.0);
    }

    registry.seek(&id, duration / 2.0).await?;
    registry.stop(&id).await?;
    registry.play(&id).await?;
    registry.pause(&id).await?;
    registry.clear(&id).await?;

    let records = log.records();
    if matches!(OutputFormat::from(format), OutputFormat::Text) {
        println!("Session {} ({} events):", id, records.len());
    }
    println!("{}", format_output(&records, format));
    Ok(())
}

/// One generic event and the native name a backend uses for it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRow {
    pub generic: String,
    pub native: Option<String>,
}

impl TextRow for EventRow {
    fn text(&self) -> String {
        match &self.native {
            Some(native) => format!("  {:<20} -> {}", self.generic, native),
            None => format!("  {:<20} (synthesized)", self.generic),
        }
    }
}

fn event_rows(map: EventMap) -> Vec<EventRow> {
    let mut rows: Vec<EventRow> = map
        .entries()
        .iter()
        .filter(|(generic, _)| !is_synthetic(generic))
        .map(|(generic, native)| EventRow {
            generic: generic.to_string(),
            native: Some(native.to_string()),
        })
        .collect();

    if !rows.iter().any(|row| row.generic == FIRST_PLAY) {
        rows.push(EventRow {
            generic: FIRST_PLAY.to_string(),
            native: None,
        });
    }
    rows.extend(SYNTHETIC_EVENTS.iter().map(|event| EventRow {
        generic: event.to_string(),
        native: None,
    }));
    rows
}

/// Print a backend's event table
pub fn events(provider: &str, format: &str) -> anyhow::Result<()> {
    let kind: ProviderKind = provider.parse()?;
    let rows = event_rows(EventMap::for_kind(kind));
    if matches!(OutputFormat::from(format), OutputFormat::Text) {
        println!("Events for {} (unlisted names pass through):", kind);
    }
    println!("{}", format_output(&rows, format));
    Ok(())
}

/// A backend and the assets its SDK needs
#[derive(Debug, Clone, Serialize)]
pub struct ProviderRow {
    pub name: &'static str,
    pub global: Option<String>,
    pub scripts: Vec<String>,
    pub styles: Vec<String>,
}

impl TextRow for ProviderRow {
    fn text(&self) -> String {
        let mut text = format!(
            "{} (global: {})",
            self.name,
            self.global.as_deref().unwrap_or("none")
        );
        for url in self.scripts.iter().chain(&self.styles) {
            text.push_str(&format!("\n    {}", url));
        }
        text
    }
}

/// List every backend with its SDK assets
pub fn providers(config: &OmniplayConfig, format: &str) -> anyhow::Result<()> {
    let rows = ProviderKind::ALL
        .into_iter()
        .map(|kind| {
            let bundle = config.sdk_urls.bundle(kind)?;
            Ok(ProviderRow {
                name: kind.as_str(),
                global: bundle.global,
                scripts: bundle.scripts.iter().map(ToString::to_string).collect(),
                styles: bundle.styles.iter().map(ToString::to_string).collect(),
            })
        })
        .collect::<omniplay_core::Result<Vec<_>>>()?;
    println!("{}", format_output(&rows, format));
    Ok(())
}
