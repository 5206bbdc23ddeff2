//! `deckpilot start`: build the tree, drive the deck until Ctrl-C.
use std::{path::Path, sync::Arc};

use config::Settings;
use deck_device::{AssetLibrary, Device, DeviceManager, DeviceRenderer};
use deck_engine::{Engine, TickIntervals};
use deck_server::Server;
use eventbus::EventBus;
use panels::{Catalog, Layout, Registry};
use plugins::{PluginCatalog, PluginManager};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{Error, Result};

/// Open the configured deck.
pub fn select_device(settings: &Settings) -> Result<Arc<dyn Device>> {
    let manager = DeviceManager::from_config(&settings.simulator.devices)?;
    let deck: Arc<dyn Device> = manager.select_configured(&settings.streamdeck)?;
    Ok(deck)
}

/// Build the registry for `device` from `root`, then mount every plugin.
pub fn build_tree(
    settings: &Settings,
    root: &Path,
    device: &Arc<dyn Device>,
) -> Result<(Registry, PluginManager)> {
    if !root.is_dir() {
        return Err(Error::MissingRoot(root.to_path_buf()));
    }
    let (rows, cols) = device.key_layout();
    let assets = AssetLibrary::from_dir(&settings.assets.icons_directory);
    let renderer = Arc::new(DeviceRenderer::new(device.clone(), assets));
    let mut registry = Registry::new(
        EventBus::new(),
        Layout::new(rows, cols)?,
        renderer,
        Catalog::with_builtins(),
    );
    let items = registry.load_root(root)?;

    let mut plugins = PluginManager::new(
        &settings.plugins.directory,
        PluginCatalog::with_builtins(),
        settings.plugin_config(),
    )
    .with_device(device.clone());
    let loaded = plugins.discover_and_load(&mut registry);
    registry.flush();
    info!(root = %root.display(), items, plugins = loaded, "panel tree ready");
    Ok((registry, plugins))
}

/// Tick periods from `[general]`.
pub fn tick_intervals(settings: &Settings) -> TickIntervals {
    TickIntervals {
        visible: settings.general.clock_tick(),
        hidden: settings.general.hidden_clock_tick(),
    }
}

/// Run until interrupted.
pub async fn run(settings: &Settings, root: &Path) -> Result<()> {
    let device = select_device(settings)?;
    let (registry, plugins) = build_tree(settings, root, &device)?;
    let engine = Engine::new(registry, device, tick_intervals(settings));
    engine.start(settings.streamdeck.brightness);

    let shutdown = CancellationToken::new();
    let listener = if settings.commands.enabled {
        let cmd = &settings.commands;
        let server = Server::bind(&cmd.host, cmd.port, Arc::new(engine.clone())).await?;
        info!(addr = %server.local_addr()?, "command channel listening");
        Some(tokio::spawn(server.run(shutdown.clone())))
    } else {
        None
    };

    signal::ctrl_c().await?;
    info!("interrupted, shutting down");
    shutdown.cancel();
    if let Some(task) = listener {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "command channel failed"),
            Err(e) => warn!(error = %e, "command channel task panicked"),
        }
    }

    // plugin hooks stay subscribed so they see `exit`
    engine.shutdown().await;
    info!(plugins = plugins.plugins().len(), "stopped");
    Ok(())
}
