//! Enrolled course listing

use anyhow::{Context, Result};

use super::client::ApiClient;
use crate::models::Course;

/// List enrolled courses (prints to stdout).
pub async fn list_courses() -> Result<()> {
    let client = ApiClient::new().await?;
    let courses = list_courses_data(&client).await?;

    println!("\nEnrolled Courses:");
    println!("{:-<60}", "");

    if courses.is_empty() {
        println!("  (no courses)");
        return Ok(());
    }

    for course in &courses {
        match course.code {
            Some(ref code) => println!("[{}] {}", code, course.title),
            None => println!("{}", course.title),
        }
        println!("  ID: {}", course.id);
        if let Some(ref instructor) = course.instructor {
            println!(
                "  Instructor: {}",
                instructor.display_name.as_deref().unwrap_or(&instructor.id)
            );
        }
        println!();
    }

    Ok(())
}

pub async fn list_courses_data(client: &ApiClient) -> Result<Vec<Course>> {
    let resp = client.get("/courses").await?;
    resp.json().await.context("Failed to parse course list")
}
