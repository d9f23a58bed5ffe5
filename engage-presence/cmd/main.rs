//! # Engage Presence 入口

use anyhow::Result;
use engage_core::{init_tracing_from_config, load_config};
use engage_presence::service::bootstrap::ApplicationBootstrap;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::var("ENGAGE_CONFIG").ok();
    let app_config = load_config(config_path.as_deref());
    init_tracing_from_config(Some(&app_config.logging));

    info!(
        service = %app_config.service.name,
        version = %app_config.service.version,
        "Starting Engage Presence"
    );

    ApplicationBootstrap::run(app_config).await
}
