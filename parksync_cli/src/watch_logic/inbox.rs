use anyhow::{Context, Result};
use chrono::Utc;
use lib_parksync::realtime::LoggedNotification;
use lib_parksync::retrieve::NotificationsApi;

use super::config::{InboxCommand, Settings};
use super::render;

/// Runs one inbox operation against the REST API.
pub async fn run(settings: &Settings, command: InboxCommand) -> Result<()> {
    let base = settings
        .api_base_url
        .as_deref()
        .context("an API base URL or origin is required for inbox commands")?;
    if settings.auth_token.is_none() {
        log::warn!("No auth token configured; the API will likely refuse the request.");
    }
    let api = NotificationsApi::new(base, settings.auth_token.clone())?;

    match command {
        InboxCommand::List { unread } => {
            let now = Utc::now();
            let entries: Vec<LoggedNotification> = api
                .list(unread)
                .await?
                .into_iter()
                .map(|row| row.into_logged(now))
                .collect();

            let unread_count = entries.iter().filter(|entry| !entry.read).count();
            println!("{}", render::inbox_header(unread_count));
            if entries.is_empty() {
                println!("  No notifications");
            }
            for entry in &entries {
                println!("{}", render::inbox_line(entry, now));
            }
        }
        InboxCommand::MarkRead { id } => {
            api.mark_read(id).await?;
            println!("Marked #{} read", id);
        }
        InboxCommand::MarkAllRead => {
            api.mark_all_read().await?;
            println!("Marked all notifications read");
        }
        InboxCommand::Clear => {
            api.clear_all().await?;
            println!("Cleared all notifications");
        }
    }
    Ok(())
}
