//! Analytics command - posting totals and daily activity

use anyhow::{Context, Result};
use autopromo_adapters::sqlite::{self, SqliteLedger};
use autopromo_domain::{PostCounts, SystemClock, usecases::Analytics};
use std::path::PathBuf;
use std::sync::Arc;

use crate::args::{AnalyticsArgs, AnalyticsCommands};
use crate::config::AppConfig;

pub async fn execute(args: AnalyticsArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let timezone = config.general.timezone_offset()?;
    let pool = sqlite::connect(&config.general.state_db_path)
        .await
        .context("Failed to open state database")?;
    let analytics = Analytics::new(
        Arc::new(SqliteLedger::new(pool)),
        Arc::new(SystemClock),
        timezone,
    );

    match args.command {
        AnalyticsCommands::Overview { json } => overview(&analytics, json).await,
        AnalyticsCommands::Chart { days, json } => chart(&analytics, days, json).await,
    }
}

async fn overview(analytics: &Analytics<SqliteLedger, SystemClock>, json: bool) -> Result<()> {
    let overview = analytics.overview().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&overview)?);
        return Ok(());
    }

    println!("Analytics overview");
    println!("==================");
    println!("Products in catalog: {}", overview.total_products);
    println!();
    println!("All time:");
    print_counts(&overview.posts);
    println!();
    println!("Today:");
    print_counts(&overview.today);

    Ok(())
}

async fn chart(
    analytics: &Analytics<SqliteLedger, SystemClock>,
    days: u16,
    json: bool,
) -> Result<()> {
    let points = analytics.chart(days).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(());
    }

    for point in &points {
        println!(
            "{}  {:>3} posts  {:>3} posted  (ig {}, fb {}, pin {})",
            point.date,
            point.total_posts,
            point.successful_posts,
            point.instagram_posts,
            point.facebook_posts,
            point.pinterest_posts
        );
    }

    Ok(())
}

fn print_counts(counts: &PostCounts) {
    println!(
        "  total {}, posted {}, failed {}, pending {}",
        counts.total, counts.posted, counts.failed, counts.pending
    );
    println!(
        "  instagram {}, facebook {}, pinterest {}",
        counts.instagram, counts.facebook, counts.pinterest
    );
}
