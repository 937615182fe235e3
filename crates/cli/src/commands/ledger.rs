//! Ledger views - products, posts, and runs, newest first

use anyhow::{Context, Result};
use autopromo_adapters::sqlite::{self, SqliteLedger};
use autopromo_domain::{Ledger, PostStatus};
use std::path::PathBuf;
use time::OffsetDateTime;
use time::macros::format_description;

use crate::args::ListArgs;
use crate::config::AppConfig;

pub async fn products(args: ListArgs, config_path: Option<PathBuf>) -> Result<()> {
    let ledger = open_ledger(config_path).await?;
    let products = ledger.list_products(args.limit).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&products)?);
        return Ok(());
    }

    if products.is_empty() {
        println!("No products recorded.");
        return Ok(());
    }

    for product in &products {
        println!(
            "{}  {:<12}  {:>10}  {}",
            short_ts(product.fetched_at),
            product.marketplace_id,
            product.price.as_deref().unwrap_or("-"),
            truncate(&product.title, 60)
        );
    }

    Ok(())
}

pub async fn posts(args: ListArgs, config_path: Option<PathBuf>) -> Result<()> {
    let ledger = open_ledger(config_path).await?;
    let posts = ledger.list_posts(args.limit).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&posts)?);
        return Ok(());
    }

    if posts.is_empty() {
        println!("No posts recorded.");
        return Ok(());
    }

    for post in &posts {
        let detail = match post.status {
            PostStatus::Posted => post.platform_post_id.as_deref().unwrap_or("-").to_string(),
            PostStatus::Failed => truncate(post.error_message.as_deref().unwrap_or("-"), 48),
            PostStatus::Pending => "-".to_string(),
        };
        println!(
            "{}  {:<9}  {:<7}  {:<12}  {}",
            short_ts(post.scheduled_at),
            post.platform.as_str(),
            post.status.as_str(),
            post.marketplace_id,
            detail
        );
    }

    Ok(())
}

pub async fn runs(args: ListArgs, config_path: Option<PathBuf>) -> Result<()> {
    let ledger = open_ledger(config_path).await?;
    let runs = ledger.list_runs(args.limit).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }

    if runs.is_empty() {
        println!("No runs recorded.");
        return Ok(());
    }

    for run in &runs {
        let error = run
            .error_message
            .as_deref()
            .map(|e| format!("  {}", truncate(e, 48)))
            .unwrap_or_default();
        println!(
            "{}  {:<8}  {:<9}  {:>3} posts{}",
            short_ts(run.started_at),
            run.trigger.as_str(),
            run.status.as_str(),
            run.posts_created,
            error
        );
    }

    Ok(())
}

async fn open_ledger(config_path: Option<PathBuf>) -> Result<SqliteLedger> {
    let config = AppConfig::load(config_path.as_deref())?;
    let pool = sqlite::connect(&config.general.state_db_path)
        .await
        .context("Failed to open state database")?;
    Ok(SqliteLedger::new(pool))
}

fn short_ts(value: OffsetDateTime) -> String {
    const FORMAT: &[time::format_description::BorrowedFormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]");
    value.format(&FORMAT).unwrap_or_else(|_| value.to_string())
}

fn truncate(text: &str, max_chars: usize) -> String {
    let mut result: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        result.push('…');
    }
    result
}
