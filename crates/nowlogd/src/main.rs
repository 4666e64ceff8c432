//! nowlogd — receive messages from trusted radio peers and log them to storage.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::runtime::Handle;

use nowlog_core::config::NowlogConfig;
use nowlog_services::{
    BootOptions, BootstrapController, DirMedium, Persistence, ReceiveDispatcher, StorageMedium,
};

mod link;
mod restart;

use link::UdpLink;
use restart::ExecRestart;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = NowlogConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = NowlogConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        NowlogConfig::default()
    });

    let local_address = config.local_address().context("invalid radio.local_address")?;
    let peers = config.peer_descriptors().context("invalid peer configuration")?;
    tracing::info!(peers = peers.len(), "nowlogd starting");

    // Storage
    let medium = Arc::new(DirMedium::new(&config.storage.mount_point));
    tracing::info!(
        mount_point = %medium.mount_point().display(),
        log = %config.storage.log_name,
        "storage medium"
    );
    if let Err(e) = medium.acquire() {
        tracing::warn!(error = %e, "storage medium not present, messages are dropped until it appears");
    }
    let persistence = Persistence::new(medium, config.storage.log_name.clone());
    let dispatcher = Arc::new(ReceiveDispatcher::new(persistence));

    // Radio
    let link = Arc::new(UdpLink::new(local_address, config.radio.link_port, Handle::current()));
    let options = BootOptions::from(&config.radio);
    let restart = ExecRestart::current()?;

    let booted = {
        let link = link.clone();
        let dispatcher = dispatcher.clone();
        tokio::task::spawn_blocking(move || {
            BootstrapController::new(link.as_ref(), link.clone(), &restart, options)
                .run(peers, dispatcher)
        })
        .await
        .context("bootstrap task panicked")??
    };
    tracing::info!(
        mac = %booted.local_address,
        registered = booted.summary.registered,
        unusable = booted.summary.rejected,
        "receiver ready"
    );

    // ── Idle until shutdown ──────────────────────────────────────────────────

    let stats_secs = config.radio.stats_interval_secs;
    let mut stats = tokio::time::interval(Duration::from_secs(stats_secs.max(1)));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("shutdown signal received");
                break;
            }
            _ = stats.tick(), if stats_secs > 0 => dispatcher.stats().log(),
        }
    }

    dispatcher.stats().log();
    Ok(())
}
