//! Run command - fetch, select, caption, and publish on a schedule

use anyhow::{Context, Result};
use autopromo_adapters::{
    amazon::RapidApiProductSource,
    social::{FacebookPublisher, InstagramPublisher, PinterestPublisher},
    sqlite::{self, SqliteConfigStore, SqliteLedger},
};
use autopromo_domain::{
    Clock, FetchQuery, Ledger, SystemClock,
    usecases::{CaptionStyle, EngineOptions, PublishEngine, PublisherSet, Scheduler},
};
use std::path::PathBuf;
use std::sync::Arc;
use time::Duration;

use crate::args::RunArgs;
use crate::config::AppConfig;

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let timezone = config.general.timezone_offset()?;

    tracing::info!(
        once = args.once,
        dry_run = args.dry_run,
        admin_id = %config.general.admin_id,
        db = %config.general.state_db_path.display(),
        "Starting autopromo"
    );

    // Build dependencies
    let pool = sqlite::connect(&config.general.state_db_path)
        .await
        .context("Failed to open state database")?;
    let ledger = Arc::new(SqliteLedger::new(pool.clone()));
    let config_store = Arc::new(SqliteConfigStore::new(pool));
    let clock = Arc::new(SystemClock);
    let source = Arc::new(RapidApiProductSource::new());

    let publishers = PublisherSet::new()
        .with(Arc::new(InstagramPublisher::new()))
        .with(Arc::new(FacebookPublisher::new()))
        .with(Arc::new(PinterestPublisher::new()));

    let run_timeout = Duration::minutes(config.scheduler.run_timeout_minutes as i64);
    let options = EngineOptions {
        admin_id: config.general.admin_id.clone(),
        fetch: FetchQuery {
            query: config.marketplace.query.clone(),
            category: config.marketplace.category.clone(),
            page_size: config.marketplace.page_size,
        },
        dedup_window: Duration::days(config.scheduler.dedup_window_days as i64),
        run_timeout,
        timezone,
        exclude_patterns: config.marketplace.exclude_patterns.clone(),
        caption_style: caption_style_from_config(&config),
        dry_run: args.dry_run,
    };

    let engine = PublishEngine::new(
        source,
        ledger.clone(),
        config_store.clone(),
        clock.clone(),
        publishers,
        options,
    );

    let interval = std::time::Duration::from_secs(config.scheduler.interval_hours * 60 * 60);
    let scheduler = Scheduler::new(
        engine,
        config_store,
        config.general.admin_id.clone(),
        interval,
    );

    if args.once {
        let report = scheduler.trigger_now().await.context("Run failed")?;

        tracing::info!(
            run_id = %report.run_id,
            fetched = report.products_fetched,
            selected = report.products_selected,
            posted = report.posted,
            failed = report.failed,
            dry_run = report.dry_run,
            "Run complete"
        );
        for skip in &report.skipped_platforms {
            tracing::warn!(
                platform = %skip.platform,
                reason = %skip.reason,
                "Platform skipped"
            );
        }
    } else {
        // A running row left by a crashed process would block the first tick
        let recovered = ledger
            .recover_stale_runs(clock.now() - run_timeout)
            .await
            .context("Failed to recover stale runs")?;
        if recovered > 0 {
            tracing::warn!(recovered, "Recovered stale runs from a previous process");
        }

        // Set up graceful shutdown
        let shutdown = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
            tracing::info!("Shutdown signal received");
        };

        scheduler.run_until_shutdown(shutdown).await;
    }

    tracing::info!("autopromo run completed");
    Ok(())
}

fn caption_style_from_config(config: &AppConfig) -> CaptionStyle {
    let defaults = CaptionStyle::default();
    CaptionStyle {
        hashtags: if config.caption.hashtags.is_empty() {
            defaults.hashtags
        } else {
            config.caption.hashtags.clone()
        },
        disclosure: if config.caption.disclosure.trim().is_empty() {
            defaults.disclosure
        } else {
            config.caption.disclosure.clone()
        },
    }
}
