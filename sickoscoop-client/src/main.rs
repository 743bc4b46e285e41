use sickoscoop_client::{
    Client,
    config::{self, ConfigError},
    gateway::GatewayError,
    session::{controller::RestoreOutcome, storage::FileStorage},
};
use sickoscoop_common::util::format_time_ago;
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
enum InitError {
    #[error("Error reading configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Error setting up the client: {0}")]
    Client(#[from] GatewayError),
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "sickoscoop=debug,sickoscoop_client=debug,sickoscoop_common=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = config::get_env()?;
    info!(api_url = %env.api_url, storage = %env.storage_path.display(), "Starting client");

    let storage = Arc::new(FileStorage::new(env.storage_path.clone()));
    let client = Client::new(&env, storage)?;

    if !client.probe().await {
        warn!("Backend is not reachable, changes will stay on this device");
    }

    match client.controller().restore_from_persistence().await {
        RestoreOutcome::Verified => info!("Session restored"),
        RestoreOutcome::Degraded => warn!("Session restored without verification"),
        RestoreOutcome::Rejected | RestoreOutcome::Absent => {
            if let Err(err) = client.controller().load_public_feed().await {
                warn!(error = %err, "Could not load the public feed");
            }
        }
    }

    let now = OffsetDateTime::now_utc();
    for post in client.visible_posts() {
        info!(
            post_id = %post.id,
            author = post.author.username.get(),
            likes = post.likes.len(),
            comments = post.comments.len(),
            posted = %format_time_ago(post.created_at, now),
            "{}",
            post.content
        );
    }

    if let Some(notice) = client.notices().current() {
        warn!(notice, "Pending notice");
    }

    Ok(())
}
