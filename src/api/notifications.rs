//! Notification feed

use anyhow::{Context, Result};

use super::client::ApiClient;
use crate::models::Notification;

/// List recent notifications (prints to stdout).
pub async fn list_notifications() -> Result<()> {
    let client = ApiClient::new().await?;
    let resp = client.get("/notifications").await?;
    let notifications: Vec<Notification> =
        resp.json().await.context("Failed to parse notifications")?;

    if notifications.is_empty() {
        println!("(no notifications)");
        return Ok(());
    }

    for n in &notifications {
        let marker = if n.read { " " } else { "*" };
        println!(
            "{} [{}] {}",
            marker,
            n.created_at.format("%Y-%m-%d %H:%M"),
            n.body
        );
    }
    Ok(())
}
