// Framework bootstrap for the headless simulation host.

use crate::domain::definitions::PackRegistry;
use crate::domain::entity::Side;
use crate::domain::tuning::SimTuning;
use crate::frameworks::config;
use crate::interface_adapters::headless::FlatWorld;
use crate::interface_adapters::serializer::spawn_world_serializer;
use crate::interface_adapters::storage::{load_pack, load_world_data, save_world_data};
use crate::use_cases::{SimWorld, WorldHost, WorldSettings};

use std::future::Future;
use std::io::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Everything one hosted world needs to start.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub world_id: String,
    pub pack_path: Option<PathBuf>,
    pub save_path: PathBuf,
    pub tuning: SimTuning,
    pub seed: u64,
    pub tick_interval: Duration,
}

impl RunOptions {
    pub fn from_env() -> Self {
        Self {
            world_id: config::DEFAULT_WORLD_ID.to_string(),
            pack_path: config::pack_path(),
            save_path: config::save_path(),
            tuning: config::sim_tuning(),
            seed: config::world_seed(),
            tick_interval: config::tick_interval(),
        }
    }
}

/// Hosts one world until `shutdown` resolves, then saves it.
pub async fn run(options: RunOptions, shutdown: impl Future<Output = ()>) -> Result<()> {
    let pack = match &options.pack_path {
        Some(path) => load_pack(path).await.map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "failed to load pack");
            std::io::Error::other(format!("failed to load pack: {e}"))
        })?,
        None => {
            tracing::warn!("no pack configured; only saved entities without items will load");
            PackRegistry::new()
        }
    };

    let saved = load_world_data(&options.save_path).await.map_err(|e| {
        tracing::error!(path = %options.save_path.display(), error = %e, "failed to read save");
        std::io::Error::other(format!("failed to read save: {e}"))
    })?;

    let mut world = SimWorld::new(
        Side::Server,
        FlatWorld::new(),
        Arc::new(pack),
        options.tuning,
        options.seed,
    );
    world.load(saved.as_ref());

    // The host owns the set of running world tasks.
    let host = WorldHost::new(WorldSettings {
        input_channel_capacity: config::INPUT_CHANNEL_CAPACITY,
        world_broadcast_capacity: config::WORLD_BROADCAST_CAPACITY,
        tick_interval: options.tick_interval,
    });
    let handle = host
        .create_world(options.world_id.clone(), world)
        .await
        .map_err(|e| std::io::Error::other(format!("failed to create world: {e:?}")))?;
    spawn_world_serializer(&handle);

    tracing::info!(
        world_id = %handle.world_id,
        tick_ms = options.tick_interval.as_millis(),
        "world hosted"
    );
    shutdown.await;

    let data = handle
        .save()
        .await
        .map_err(|e| std::io::Error::other(format!("failed to save world: {e:?}")))?;
    save_world_data(&options.save_path, &data)
        .await
        .inspect_err(|e| {
            tracing::error!(path = %options.save_path.display(), error = %e, "failed to write save");
        })
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    let _ = host.remove_world(&options.world_id).await;
    Ok(())
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    run(RunOptions::from_env(), async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    })
    .await
}
