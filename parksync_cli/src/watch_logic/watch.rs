use anyhow::Result;
use chrono::Utc;
use lib_parksync::realtime::OccupancyView;
use lib_parksync::retrieve::NotificationsApi;
use lib_parksync::{NotificationEvent, RealtimeSyncClient, SpotMap};
use tokio::signal;
use tokio::sync::mpsc;

use super::config::Settings;
use super::render;

enum Update {
    Snapshot(SpotMap),
    Alert(NotificationEvent),
}

/// Mounts one client and prints what it delivers until Ctrl-C or SIGTERM.
pub async fn run(settings: Settings) -> Result<()> {
    let mut client = RealtimeSyncClient::new(settings.ws_url.clone(), settings.sync);

    if settings.backfill {
        backfill(&client, &settings).await;
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<Update>();
    let snapshot_tx = tx.clone();
    client.start(
        move |spots| {
            let _ = snapshot_tx.send(Update::Snapshot(spots));
        },
        move |event| {
            let _ = tx.send(Update::Alert(event));
        },
    );

    let mut state_rx = client.subscribe_state();
    let mut view = OccupancyView::new();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *state_rx.borrow_and_update();
                println!("{}", render::connection_line(state));
            }
            update = rx.recv() => match update {
                Some(Update::Snapshot(spots)) => {
                    view.apply(spots);
                    println!("{}", render::occupancy_table(&view));
                }
                Some(Update::Alert(event)) => {
                    println!("{}", render::alert_line(&event));
                    println!("{}", render::inbox_header(client.unread_count()));
                }
                None => break,
            },
        }
    }

    client.stop().await;
    log::info!("Shutdown complete.");
    Ok(())
}

async fn backfill(client: &RealtimeSyncClient, settings: &Settings) {
    let (Some(base), Some(token)) = (settings.api_base_url.as_deref(), settings.auth_token.clone()) else {
        log::debug!("No API credentials configured; starting with an empty inbox.");
        return;
    };

    let api = match NotificationsApi::new(base, Some(token)) {
        Ok(api) => api,
        Err(e) => {
            log::warn!("Cannot build API client for {}: {}", base, e);
            return;
        }
    };

    match api.list(false).await {
        Ok(rows) => {
            let now = Utc::now();
            let count = rows.len();
            client.backfill(rows.into_iter().map(|row| row.into_logged(now)).collect());
            log::info!("Loaded {} stored notifications ({} unread)", count, client.unread_count());
        }
        Err(e) => log::warn!("Could not load stored notifications: {}", e),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => log::info!("Ctrl-C received, initiating shutdown."),
            Err(e) => {
                log::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term_signal) => {
                term_signal.recv().await;
                log::info!("SIGTERM received, initiating shutdown.");
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
