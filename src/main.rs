use std::sync::Arc;
use tokio::sync::Notify;

use waldiez_server::assets::{self, NpmRegistry};
use waldiez_server::config::{self, AppState, Config};
use waldiez_server::export::CommandExporter;
use waldiez_server::{logger, server};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg.logging)?;

    // Worker threads default to the number of CPU cores
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let exporter = Arc::new(CommandExporter::new(&cfg.exporter));
    let state = AppState::new(&cfg, exporter)?;

    if cfg.assets.enabled {
        let registry = NpmRegistry::new(&cfg.assets.registry_url)?;
        assets::ensure_static_assets(&state.static_dir, &cfg.assets, &registry).await?;
    } else {
        tracing::info!("Editor asset provisioning disabled");
    }

    let addr = cfg.get_socket_addr()?;
    let listener = server::create_reusable_listener(addr)?;
    logger::log_server_start(&addr, &cfg, &state.root_dir);

    let shutdown = Arc::new(Notify::new());
    server::start_signal_handler(Arc::clone(&shutdown));
    server::run(listener, Arc::new(state), shutdown).await?;

    tracing::info!("Server stopped");
    Ok(())
}
