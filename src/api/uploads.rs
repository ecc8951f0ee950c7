//! Attachment uploads

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use super::client::ApiClient;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

/// Upload a file and print the resulting attachment URL.
pub async fn upload(path: &Path) -> Result<()> {
    let client = ApiClient::new().await?;
    let url = upload_with_client(&client, path).await?;
    println!("Uploaded: {}", url);
    Ok(())
}

/// Upload a file; returns the attachment URL to embed in a message.
pub async fn upload_with_client(client: &ApiClient, path: &Path) -> Result<String> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("Invalid file name")?
        .to_string();
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
    let form = reqwest::multipart::Form::new().part("file", part);

    let resp = client.post_multipart("/uploads", form).await?;
    let body: UploadResponse = resp.json().await.context("Failed to parse upload response")?;
    Ok(body.url)
}
