//! Cinematch Engine - item-based movie recommendations over HTTP
//!
//! Port: 8083

use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use cinematch_core::{init_logging, load_dotenv, ConfigLoader};
use cinematch_engine::{configure_routes, CinematchEngine, EngineConfig};
use tracing::info;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let env_file = load_dotenv();

    let config = EngineConfig::load().context("Failed to load configuration")?;
    init_logging(&config.logging).context("Failed to initialize logging")?;

    if let Some(path) = env_file {
        info!(path = %path.display(), "Loaded environment file");
    }

    let bind_addr = config.server.bind_addr();
    let workers = config.server.workers.unwrap_or_else(num_cpus::get);

    info!(
        ratings = %config.dataset.ratings_path.display(),
        items = %config.dataset.items_path.display(),
        "Bootstrapping engine"
    );

    let engine = web::Data::new(CinematchEngine::new(config));
    let bootstrap = engine.clone();
    let stats = web::block(move || bootstrap.start())
        .await
        .context("Bootstrap task failed")?
        .context("Failed to bootstrap engine")?;
    info!(state = ?stats.state, items = stats.items, "Engine ready");

    info!(addr = %bind_addr, workers, "Starting Cinematch Engine");

    HttpServer::new(move || {
        App::new()
            .app_data(engine.clone())
            .wrap(middleware::Logger::default())
            .configure(configure_routes)
    })
    .workers(workers)
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {}", bind_addr))?
    .run()
    .await?;

    Ok(())
}
