//! User profile and directory search

use anyhow::{Context, Result};

use super::client::ApiClient;
use crate::models::User;

/// Show the current user (verify auth works).
pub async fn whoami() -> Result<()> {
    let client = ApiClient::new().await?;
    let user = whoami_data(&client).await?;

    println!("\nCurrent User:");
    println!(
        "  Name: {}",
        user.display_name.as_deref().unwrap_or("(none)")
    );
    println!("  ID: {}", user.id);
    if let Some(ref email) = user.email {
        println!("  Email: {}", email);
    }
    if let Some(ref role) = user.role {
        println!("  Role: {:?}", role);
    }

    Ok(())
}

pub async fn whoami_data(client: &ApiClient) -> Result<User> {
    let resp = client.get("/users/me").await?;
    resp.json().await.context("Failed to parse user profile")
}

/// Search the user directory (prints matches).
pub async fn search(query: &str) -> Result<()> {
    let client = ApiClient::new().await?;
    let users = search_data(&client, query).await?;

    if users.is_empty() {
        println!("(no matches)");
        return Ok(());
    }

    for user in &users {
        println!(
            "{}  {}  {}",
            user.id,
            user.display_name.as_deref().unwrap_or("-"),
            user.email.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

pub async fn search_data(client: &ApiClient, query: &str) -> Result<Vec<User>> {
    let q = url::form_urlencoded::byte_serialize(query.as_bytes()).collect::<String>();
    let resp = client.get(&format!("/users/search?q={}", q)).await?;
    resp.json().await.context("Failed to parse search results")
}
