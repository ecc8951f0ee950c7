//! Chat REST surface: rooms, history, message creation, read watermarks.
//!
//! Message creation attaches a client-generated id so the realtime echo and
//! the create-response dedupe to a single append on every member's screen.

use anyhow::{Context, Result};

use super::client::ApiClient;
use crate::models::{Conversation, Message};

/// List the user's conversations (prints to stdout).
pub async fn list_rooms(limit: usize) -> Result<()> {
    let client = ApiClient::new().await?;
    let rooms = list_rooms_data(&client).await?;

    println!("\nConversations:");
    println!("{:-<60}", "");

    if rooms.is_empty() {
        println!("  (no conversations)");
        return Ok(());
    }

    for conv in rooms.iter().take(limit) {
        let name = conv.display_name(client.self_id());
        let marker = if conv.is_group { "+" } else { "*" };
        if conv.unread_count > 0 {
            println!("{} {} ({} unread)", marker, name, conv.unread_count);
        } else {
            println!("{} {}", marker, name);
        }
        println!("  ID: {}", conv.id);

        if let Some(ref last) = conv.last_message {
            let sender = last.sender.display_name.as_deref().unwrap_or("?");
            println!("  [{}]: {}", sender, last.preview.trim());
        }
        println!();
    }

    Ok(())
}

/// Fetch the conversation list, most recent activity first.
pub async fn list_rooms_data(client: &ApiClient) -> Result<Vec<Conversation>> {
    let resp = client.get("/chat/rooms").await?;
    let mut rooms: Vec<Conversation> = resp
        .json()
        .await
        .context("Failed to parse conversation list")?;

    rooms.sort_by(|a, b| match (a.last_message_at, b.last_message_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    Ok(rooms)
}

/// Read messages from a conversation (prints to stdout).
pub async fn history(conversation_id: &str, limit: usize) -> Result<()> {
    let client = ApiClient::new().await?;
    let messages = history_data(&client, conversation_id, limit).await?;

    if messages.is_empty() {
        println!("(no messages)");
        return Ok(());
    }

    for msg in &messages {
        let sender = msg.sender.display_name.as_deref().unwrap_or(&msg.sender.id);
        println!(
            "[{}] #{} {}: {}",
            msg.created_at.format("%Y-%m-%d %H:%M"),
            msg.seq,
            sender,
            msg.content
        );
        if let Some(ref url) = msg.attachment_url {
            println!("    attachment: {}", url);
        }
    }

    Ok(())
}

/// Fetch message history in chronological order.
pub async fn history_data(
    client: &ApiClient,
    conversation_id: &str,
    limit: usize,
) -> Result<Vec<Message>> {
    let path = format!("/chat/{}/history?limit={}", conversation_id, limit);
    let resp = client.get(&path).await?;
    let mut messages: Vec<Message> = resp.json().await.context("Failed to parse history")?;

    // The backend returns newest-first; flip for chronological display.
    messages.sort_by_key(|m| m.seq);
    Ok(messages)
}

/// Send a message; returns the created message.
pub async fn send_message_with_client(
    client: &ApiClient,
    conversation_id: &str,
    content: &str,
    attachment_url: Option<String>,
) -> Result<Message> {
    let client_msg_id = uuid::Uuid::new_v4().to_string();
    let mut body = serde_json::json!({
        "content": content,
        "clientMsgId": client_msg_id,
    });
    if let Some(url) = attachment_url {
        body["attachmentUrl"] = serde_json::Value::String(url);
    }

    let path = format!("/chat/{}/messages", conversation_id);
    let resp = client.post(&path, &body).await?;
    resp.json().await.context("Failed to parse created message")
}

/// Mark a conversation read up to its latest message (prints confirmation).
pub async fn mark_read(conversation_id: &str) -> Result<()> {
    let client = ApiClient::new().await?;
    let latest = history_data(&client, conversation_id, 1).await?;

    match latest.last() {
        Some(msg) => {
            mark_read_with_client(&client, conversation_id, msg.seq).await?;
            println!("Marked read up to #{}.", msg.seq);
        }
        None => println!("(no messages to mark read)"),
    }
    Ok(())
}

/// Report a read watermark: every message with seq <= `up_to_seq` is read.
pub async fn mark_read_with_client(
    client: &ApiClient,
    conversation_id: &str,
    up_to_seq: u64,
) -> Result<()> {
    let path = format!("/chat/{}/read", conversation_id);
    let body = serde_json::json!({ "upToSeq": up_to_seq });
    client.post(&path, &body).await?;
    Ok(())
}

/// Create a group conversation (prints the new room id).
pub async fn create_group(name: &str, member_ids: &[String]) -> Result<()> {
    let client = ApiClient::new().await?;
    let body = serde_json::json!({ "name": name, "memberIds": member_ids });
    let resp = client.post("/chat/group", &body).await?;
    let conv: Conversation = resp
        .json()
        .await
        .context("Failed to parse created conversation")?;

    println!("Group '{}' created. ID: {}", name, conv.id);
    Ok(())
}

/// Leave a group conversation. The room persists for remaining members.
pub async fn leave_group(conversation_id: &str) -> Result<()> {
    let client = ApiClient::new().await?;
    let path = format!("/chat/{}/leave", conversation_id);
    client.post(&path, &serde_json::json!({})).await?;
    println!("Left conversation {}.", conversation_id);
    Ok(())
}
