mod config;
mod domain_events;
mod main_lib;
mod scheduler;

use config::Config;
use main_lib::{build_state, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    init_tracing();
    let state = build_state(&config).await?;

    match state.membership_repository.list_active_group_ids() {
        Ok(groups) => tracing::info!("Serving {} active group(s)", groups.len()),
        Err(e) => tracing::warn!("Could not list active groups: {}", e),
    }

    let reconciler = scheduler::start_reconcile_scheduler(&state, &config);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested, stopping goal reconciler");
    reconciler.stop().await;
    tracing::info!("Stopped");
    Ok(())
}
