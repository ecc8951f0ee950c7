//! Login, refresh, and logout flows.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::io::{self, Write};

use crate::config::Config;
use crate::models::User;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    user: Option<User>,
}

/// Interactive login: prompt for credentials, exchange them for tokens, and
/// persist the session.
pub async fn login(server: Option<String>, email: Option<String>, force: bool) -> Result<()> {
    let mut config = Config::load()?;

    if let Some(server) = server {
        config.server_url = Some(server.trim_end_matches('/').to_string());
    }
    let server_url = config.require_server_url()?.to_string();

    if !force {
        if let Some(ref token) = config.access_token {
            if !token.is_expired() {
                println!(
                    "Already logged in as {}. Use --force to re-authenticate.",
                    config.display_name.as_deref().unwrap_or("(unknown)")
                );
                return Ok(());
            }
        }
    }

    let email = match email {
        Some(e) => e,
        None => prompt("Email: ")?,
    };
    let password = prompt("Password: ")?;

    let http = reqwest::Client::new();
    let url = format!("{}/auth/login", server_url);
    let resp = http
        .post(&url)
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await
        .with_context(|| format!("Login request to {} failed", url))?;

    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        bail!("Login rejected: invalid credentials");
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("Login failed: HTTP {} — {}", status.as_u16(), body);
    }

    let tokens: TokenResponse = resp.json().await.context("Failed to parse login response")?;
    store_session(&mut config, tokens)?;

    println!(
        "Logged in as {} @ {}",
        config.display_name.as_deref().unwrap_or("(unknown)"),
        server_url
    );
    Ok(())
}

/// Exchange the stored refresh token for a fresh access token.
///
/// Returns `Ok(false)` when there is no refresh token to use; the caller
/// decides whether that means "prompt for login".
pub async fn refresh() -> Result<bool> {
    let mut config = Config::load()?;
    let server_url = config.require_server_url()?.to_string();

    let Some(refresh_token) = config.refresh_token.clone() else {
        return Ok(false);
    };

    let http = reqwest::Client::new();
    let url = format!("{}/auth/refresh", server_url);
    let resp = http
        .post(&url)
        .json(&serde_json::json!({ "refreshToken": refresh_token }))
        .send()
        .await
        .with_context(|| format!("Refresh request to {} failed", url))?;

    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        bail!("Refresh token rejected. Run 'campus-cli login'.");
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("Token refresh failed: HTTP {} — {}", status.as_u16(), body);
    }

    let tokens: TokenResponse = resp
        .json()
        .await
        .context("Failed to parse refresh response")?;
    store_session(&mut config, tokens)?;

    tracing::info!("Access token refreshed");
    Ok(true)
}

/// Log out: best-effort server-side revocation, then clear local state.
pub async fn logout() -> Result<()> {
    let mut config = Config::load()?;

    if let (Ok(server_url), Some(token)) = (
        config.require_server_url().map(str::to_string),
        config.access_token.as_ref().map(|t| t.token.clone()),
    ) {
        let http = reqwest::Client::new();
        let url = format!("{}/auth/logout", server_url);
        if let Err(e) = http.post(&url).bearer_auth(&token).send().await {
            tracing::warn!("Server-side logout failed (continuing): {:#}", e);
        }
    }

    config.clear_session();
    config.save()?;
    println!("Logged out.");
    Ok(())
}

/// Print the current authentication state.
pub async fn status() -> Result<()> {
    let config = Config::load()?;

    println!("\nAuthentication Status:");
    println!(
        "  Server: {}",
        config.server_url.as_deref().unwrap_or("(not configured)")
    );
    println!(
        "  User: {} ({})",
        config.display_name.as_deref().unwrap_or("(none)"),
        config.user_id.as_deref().unwrap_or("-")
    );

    match config.access_token {
        Some(ref token) if !token.is_expired() => match token.remaining_secs() {
            Some(secs) => println!("  Access token: valid ({} min remaining)", secs / 60),
            None => println!("  Access token: valid"),
        },
        Some(_) => println!("  Access token: expired"),
        None => println!("  Access token: none"),
    }
    println!(
        "  Refresh token: {}",
        if config.refresh_token.is_some() {
            "present"
        } else {
            "none"
        }
    );

    Ok(())
}

fn store_session(config: &mut Config, tokens: TokenResponse) -> Result<()> {
    config.set_access_token(tokens.access_token, tokens.expires_in);
    config.refresh_token = Some(tokens.refresh_token);
    if let Some(user) = tokens.user {
        config.user_id = Some(user.id);
        config.display_name = user.display_name;
    }
    config.save()
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush().context("Failed to flush stdout")?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read input")?;
    Ok(line.trim().to_string())
}
