//! REST client modules for the Campus backend

pub mod chat;
pub mod client;
mod courses;
mod forum;
mod notifications;
mod uploads;
mod users;

use anyhow::Result;
use std::path::Path;

/// List the user's conversations.
pub async fn list_rooms(limit: usize) -> Result<()> {
    chat::list_rooms(limit).await
}

/// Read messages from a conversation.
pub async fn history(conversation_id: &str, limit: usize) -> Result<()> {
    chat::history(conversation_id, limit).await
}

/// Send a message to a conversation, optionally attaching an uploaded file.
pub async fn send_message(
    conversation_id: &str,
    message: &str,
    attachment: Option<&Path>,
) -> Result<()> {
    let client = client::ApiClient::new().await?;
    let attachment_url = match attachment {
        Some(path) => Some(uploads::upload_with_client(&client, path).await?),
        None => None,
    };
    let msg =
        chat::send_message_with_client(&client, conversation_id, message, attachment_url).await?;
    println!("Message #{} sent.", msg.seq);
    Ok(())
}

/// Mark a conversation read up to its latest message.
pub async fn mark_read(conversation_id: &str) -> Result<()> {
    chat::mark_read(conversation_id).await
}

/// Create a group conversation.
pub async fn create_group(name: &str, member_ids: &[String]) -> Result<()> {
    chat::create_group(name, member_ids).await
}

/// Leave a group conversation.
pub async fn leave_group(conversation_id: &str) -> Result<()> {
    chat::leave_group(conversation_id).await
}

/// Show current user info.
pub async fn whoami() -> Result<()> {
    users::whoami().await
}

/// Search the user directory.
pub async fn search_users(query: &str) -> Result<()> {
    users::search(query).await
}

/// Upload a file and print its attachment URL.
pub async fn upload(path: &Path) -> Result<()> {
    uploads::upload(path).await
}

/// List enrolled courses.
pub async fn list_courses() -> Result<()> {
    courses::list_courses().await
}

/// List forum threads of a course.
pub async fn list_threads(course_id: &str) -> Result<()> {
    forum::list_threads(course_id).await
}

/// List posts of a forum thread.
pub async fn list_posts(thread_id: &str) -> Result<()> {
    forum::list_posts(thread_id).await
}

/// Reply to a forum thread.
pub async fn post_reply(thread_id: &str, message: &str) -> Result<()> {
    forum::post_reply(thread_id, message).await
}

/// Like a forum post.
pub async fn like_post(post_id: &str) -> Result<()> {
    forum::like_post(post_id).await
}

/// List notifications.
pub async fn list_notifications() -> Result<()> {
    notifications::list_notifications().await
}
