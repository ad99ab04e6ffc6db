mod seed;

use std::time::Duration;

use chrono::{NaiveTime, Utc};
use lectern_core::config::load_config;
use lectern_service::cache::AvailabilityCacheBuilder;
use lectern_store::RedisStore;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

use crate::seed::FileSource;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting Lectern availability daemon");

    let config = load_config()?;

    tracing::info!(config = ?config, "Configuration loaded");

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    let store = RedisStore::connect(&config.store.url).await?;
    let source = FileSource::new(config.source.seed_file.clone().into());
    let builder = AvailabilityCacheBuilder::new(source, store);

    let mut ticker = tokio::time::interval(Duration::from_secs(config.cache.refresh_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Windows are keyed by day so redundant rebuilds within one
                // day replace the same entries.
                let window_start = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
                match builder.rebuild(window_start, config.cache.horizon_days).await {
                    Ok(entries) => {
                        tracing::info!(entries = entries.len(), %window_start, "Availability cache rebuilt");
                    }
                    Err(error) => {
                        tracing::warn!(%error, "Availability rebuild failed, keeping previous cache");
                    }
                }
            }
            result = tokio::signal::ctrl_c() => {
                result?;
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}
