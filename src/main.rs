// slope-twin: interactive 3D digital twin of a mine slope

// Module declarations
mod camera;
mod config;
mod feeds;
mod overlay;
mod renderer;
mod scene;
mod terrain;

use winit::event_loop::EventLoop;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    let config = config::TwinConfig::default();

    // Collaborator feeds are display-only; mock arrays and a live JSON
    // snapshot are interchangeable.
    let alerts = match std::env::var("SLOPE_TWIN_ALERT_FEED") {
        Ok(path) => feeds::alerts_from_json(&std::fs::read_to_string(&path)?)?,
        Err(_) => feeds::mock_alerts(),
    };
    let ledger = feeds::mock_ledger();
    let sectors = feeds::mock_map_sectors();
    log::info!(
        "feeds attached: {} alerts, {} ledger records, {} map sectors",
        alerts.len(),
        ledger.len(),
        sectors.len()
    );
    for zone in &config.zones {
        log::info!("{} at ({}, {})", zone.severity.label(), zone.center.x, zone.center.y);
    }

    // Create event loop and mount the scene
    let event_loop = EventLoop::new()?;
    let host = renderer::SceneHost::mount(&event_loop, config).await?;

    // Run until the window closes
    host.run(event_loop)
}
