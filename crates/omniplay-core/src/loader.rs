//! SDK loader cache
//!
//! One memoised load per backend type per page. The first caller for a
//! backend type runs the load; concurrent and later callers observe the same
//! outcome, failures included.

use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::{host::AssetHost, host::Globals, ProviderKind, Result};

/// Assets a backend SDK needs on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetBundle {
    /// Global installed by the SDK; when already present nothing is injected
    pub global: Option<String>,
    pub scripts: Vec<Url>,
    pub styles: Vec<Url>,
}

impl AssetBundle {
    pub fn new(global: Option<&str>) -> Self {
        Self {
            global: global.map(str::to_string),
            scripts: Vec::new(),
            styles: Vec::new(),
        }
    }

    pub fn script(mut self, url: Url) -> Self {
        self.scripts.push(url);
        self
    }

    pub fn style(mut self, url: Url) -> Self {
        self.styles.push(url);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty() && self.styles.is_empty()
    }
}

/// Per-backend-type memoised SDK loads
#[derive(Default)]
pub struct SdkCache {
    cells: Mutex<HashMap<ProviderKind, Arc<OnceCell<Result<()>>>>>,
}

impl SdkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `bundle` for `kind` unless a load already ran (or is running)
    #[instrument(skip(self, bundle, assets, globals))]
    pub async fn load(
        &self,
        kind: ProviderKind,
        bundle: &AssetBundle,
        assets: &dyn AssetHost,
        globals: &Globals,
    ) -> Result<()> {
        let cell = self
            .cells
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(kind)
            .or_default()
            .clone();

        cell.get_or_init(|| load_bundle(kind, bundle, assets, globals))
            .await
            .clone()
    }

    /// Whether a load for `kind` has settled
    pub fn is_loaded(&self, kind: ProviderKind) -> bool {
        self.cells
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&kind)
            .is_some_and(|cell| cell.initialized())
    }
}

async fn load_bundle(
    kind: ProviderKind,
    bundle: &AssetBundle,
    assets: &dyn AssetHost,
    globals: &Globals,
) -> Result<()> {
    if let Some(global) = &bundle.global {
        if globals.contains(global) {
            debug!(provider = %kind, global = %global, "SDK already present");
            return Ok(());
        }
    }
    if bundle.is_empty() {
        return Ok(());
    }

    info!(
        provider = %kind,
        scripts = bundle.scripts.len(),
        styles = bundle.styles.len(),
        "Loading SDK assets"
    );

    let scripts = try_join_all(bundle.scripts.iter().map(|url| assets.load_script(url, globals)));
    let styles = try_join_all(bundle.styles.iter().map(|url| assets.load_style(url)));

    match futures::try_join!(scripts, styles) {
        Ok(_) => {
            info!(provider = %kind, "SDK assets loaded");
            Ok(())
        }
        Err(err) => {
            warn!(provider = %kind, error = %err, "SDK assets failed to load");
            Err(err)
        }
    }
}
