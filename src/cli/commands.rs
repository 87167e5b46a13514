use std::path::Path;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::app::{AppContext, Result, RssliteError};
use crate::config::{format_interval, Config};
use crate::refresh::{spawn_schedules, RefreshOutcome};
use crate::web;

/// Start every source's schedule and serve HTTP until shutdown.
pub async fn serve(ctx: Arc<AppContext>) -> Result<()> {
    let listener = TcpListener::bind(&ctx.config.listen).await?;
    let schedules = spawn_schedules(ctx.coordinator.clone());

    let served = web::serve(ctx, listener).await;

    for schedule in schedules {
        schedule.abort();
    }
    Ok(served?)
}

pub fn check(config: &Config) {
    println!("Configuration OK: {} sources", config.sources.len());
    for source in &config.sources {
        let limits = config.limits_for(source);
        println!(
            "  {:<20} every {:<6} max {:<4} {}",
            source.slug,
            format_interval(source.interval),
            limits.max_items,
            source.url
        );
    }
}

pub async fn refresh(ctx: &AppContext, slug: &str) -> Result<()> {
    let outcome = ctx
        .coordinator
        .refresh_slug(slug)
        .await
        .ok_or_else(|| RssliteError::FeedNotFound(slug.to_string()))?;

    match outcome {
        RefreshOutcome::Updated { items, persisted } => {
            println!("Refreshed {}: {} items", slug, items);
            if !persisted {
                println!(
                    "Warning: cache at {} was not updated",
                    ctx.store.cache_path().display()
                );
            }
            Ok(())
        }
        RefreshOutcome::Failed(e) => Err(e),
        RefreshOutcome::Skipped => {
            println!("Refresh of {} already running", slug);
            Ok(())
        }
    }
}

pub fn init(path: &Path) -> Result<()> {
    if Config::write_sample(path)? {
        println!("Wrote sample configuration to {}", path.display());
    } else {
        println!("Configuration already exists at {}", path.display());
    }
    Ok(())
}
