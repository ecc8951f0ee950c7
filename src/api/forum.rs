//! Course forum: threads, posts, likes

use anyhow::{Context, Result};

use super::client::ApiClient;
use crate::models::{ForumPost, ForumThread};

/// List discussion threads of a course forum.
pub async fn list_threads(course_id: &str) -> Result<()> {
    let client = ApiClient::new().await?;
    let path = format!("/courses/{}/forum/threads", course_id);
    let resp = client.get(&path).await?;
    let threads: Vec<ForumThread> = resp.json().await.context("Failed to parse thread list")?;

    if threads.is_empty() {
        println!("(no threads)");
        return Ok(());
    }

    for thread in &threads {
        let author = thread
            .author
            .display_name
            .as_deref()
            .unwrap_or(&thread.author.id);
        println!(
            "{}  {} ({} posts, by {})",
            thread.id, thread.title, thread.post_count, author
        );
    }
    Ok(())
}

/// List the posts of a thread, oldest first.
pub async fn list_posts(thread_id: &str) -> Result<()> {
    let client = ApiClient::new().await?;
    let path = format!("/forum/threads/{}/posts", thread_id);
    let resp = client.get(&path).await?;
    let posts: Vec<ForumPost> = resp.json().await.context("Failed to parse posts")?;

    if posts.is_empty() {
        println!("(no posts)");
        return Ok(());
    }

    for post in &posts {
        let author = post
            .author
            .display_name
            .as_deref()
            .unwrap_or(&post.author.id);
        println!(
            "[{}] {}: {}",
            post.created_at.format("%Y-%m-%d %H:%M"),
            author,
            post.content
        );
        if !post.likes.is_empty() {
            println!("    {} likes  (post {})", post.likes.len(), post.id);
        } else {
            println!("    (post {})", post.id);
        }
    }
    Ok(())
}

/// Append a reply to a thread.
pub async fn post_reply(thread_id: &str, content: &str) -> Result<()> {
    let client = ApiClient::new().await?;
    let path = format!("/forum/threads/{}/posts", thread_id);
    let body = serde_json::json!({ "content": content });
    client.post(&path, &body).await?;
    println!("Reply posted.");
    Ok(())
}

/// Like a post. The backend treats likes as a set, so this is idempotent.
pub async fn like_post(post_id: &str) -> Result<()> {
    let client = ApiClient::new().await?;
    let path = format!("/forum/posts/{}/like", post_id);
    client.post(&path, &serde_json::json!({})).await?;
    println!("Liked.");
    Ok(())
}
