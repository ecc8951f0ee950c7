//! Campus CLI - terminal client for the Campus learning platform
//!
//! Chat (REST + realtime push), courses, forums, and notifications from the
//! terminal.

mod api;
mod auth;
mod config;
mod models;
mod realtime;
mod state;
mod tui;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "campus-cli")]
#[command(about = "Terminal client for the Campus learning platform", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate against a Campus server
    Login {
        /// Server base URL (e.g. https://campus.example.edu); remembered
        /// after the first login
        #[arg(short, long)]
        server: Option<String>,

        /// Account email (prompted if omitted)
        #[arg(short, long)]
        email: Option<String>,

        /// Force re-authentication even if a valid session exists
        #[arg(short, long)]
        force: bool,
    },

    /// Log out and clear cached credentials
    Logout,

    /// Show current authentication status
    Status,

    /// Show current user info (verify auth works)
    Whoami,

    /// List conversations
    Rooms {
        /// Maximum number of conversations to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Read messages from a conversation
    History {
        /// Conversation ID (from `rooms` output)
        room_id: String,

        /// Maximum number of messages to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Send a message
    Send {
        /// Conversation ID (from `rooms` output)
        #[arg(short, long)]
        to: String,

        /// Message content
        message: String,

        /// File to upload and attach
        #[arg(short, long)]
        attach: Option<PathBuf>,
    },

    /// Mark a conversation read up to its latest message
    Read {
        /// Conversation ID
        room_id: String,
    },

    /// Create a group conversation
    CreateGroup {
        /// Group name
        name: String,

        /// Member user IDs
        #[arg(required = true)]
        members: Vec<String>,
    },

    /// Leave a group conversation
    Leave {
        /// Conversation ID
        room_id: String,
    },

    /// Search the user directory
    Search {
        /// Name or email fragment
        query: String,
    },

    /// Upload a file and print its attachment URL
    Upload {
        /// File path
        file: PathBuf,
    },

    /// List enrolled courses
    Courses,

    /// List forum threads of a course
    Threads {
        /// Course ID (from `courses` output)
        course_id: String,
    },

    /// List posts of a forum thread
    Posts {
        /// Thread ID (from `threads` output)
        thread_id: String,
    },

    /// Reply to a forum thread
    Reply {
        /// Thread ID
        #[arg(short, long)]
        to: String,

        /// Reply content
        message: String,
    },

    /// Like a forum post
    Like {
        /// Post ID
        post_id: String,
    },

    /// List notifications
    Notifications,

    /// Connect to the realtime channel and print events
    Watch,

    /// Launch the terminal user interface
    Tui,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Login {
            server,
            email,
            force,
        } => {
            tracing::info!("Starting authentication flow...");
            auth::login(server, email, force).await?;
        }
        Commands::Logout => {
            auth::logout().await?;
        }
        Commands::Status => {
            auth::status().await?;
        }
        Commands::Whoami => {
            api::whoami().await?;
        }
        Commands::Rooms { limit } => {
            api::list_rooms(limit).await?;
        }
        Commands::History { room_id, limit } => {
            api::history(&room_id, limit).await?;
        }
        Commands::Send {
            to,
            message,
            attach,
        } => {
            api::send_message(&to, &message, attach.as_deref()).await?;
        }
        Commands::Read { room_id } => {
            api::mark_read(&room_id).await?;
        }
        Commands::CreateGroup { name, members } => {
            api::create_group(&name, &members).await?;
        }
        Commands::Leave { room_id } => {
            api::leave_group(&room_id).await?;
        }
        Commands::Search { query } => {
            api::search_users(&query).await?;
        }
        Commands::Upload { file } => {
            api::upload(&file).await?;
        }
        Commands::Courses => {
            api::list_courses().await?;
        }
        Commands::Threads { course_id } => {
            api::list_threads(&course_id).await?;
        }
        Commands::Posts { thread_id } => {
            api::list_posts(&thread_id).await?;
        }
        Commands::Reply { to, message } => {
            api::post_reply(&to, &message).await?;
        }
        Commands::Like { post_id } => {
            api::like_post(&post_id).await?;
        }
        Commands::Notifications => {
            api::list_notifications().await?;
        }
        Commands::Watch => {
            realtime::connect_and_run().await?;
        }
        Commands::Tui => {
            tui::run().await?;
        }
    }

    Ok(())
}
