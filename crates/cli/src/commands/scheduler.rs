//! Scheduler command - inspect and edit the stored scheduling policy

use anyhow::{Context, Result, bail};
use autopromo_adapters::sqlite::{self, SqliteConfigStore};
use autopromo_domain::{ConfigStore, Platform, SchedulerConfig, format_post_time, parse_post_time};
use std::path::PathBuf;

use crate::args::{SchedulerArgs, SchedulerCommands};
use crate::config::AppConfig;

pub async fn execute(args: SchedulerArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let pool = sqlite::connect(&config.general.state_db_path)
        .await
        .context("Failed to open state database")?;
    let store = SqliteConfigStore::new(pool);
    let admin_id = &config.general.admin_id;

    match args.command {
        SchedulerCommands::Show { json } => show(&store, admin_id, json).await,
        SchedulerCommands::Enable => set_active(&store, admin_id, true).await,
        SchedulerCommands::Disable => set_active(&store, admin_id, false).await,
        SchedulerCommands::Set {
            posts_per_day,
            platforms,
            post_times,
        } => set(&store, admin_id, posts_per_day, platforms, post_times).await,
    }
}

async fn show(store: &SqliteConfigStore, admin_id: &str, json: bool) -> Result<()> {
    let config = store.scheduler_config(admin_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print_scheduler(admin_id, &config);
    }

    Ok(())
}

async fn set_active(store: &SqliteConfigStore, admin_id: &str, active: bool) -> Result<()> {
    let mut config = store.scheduler_config(admin_id).await?;
    config.is_active = active;
    store.update_scheduler_config(admin_id, &config).await?;

    println!(
        "Scheduler {}.",
        if active { "enabled" } else { "disabled" }
    );

    Ok(())
}

async fn set(
    store: &SqliteConfigStore,
    admin_id: &str,
    posts_per_day: Option<u32>,
    platforms: Option<Vec<String>>,
    post_times: Option<Vec<String>>,
) -> Result<()> {
    if posts_per_day.is_none() && platforms.is_none() && post_times.is_none() {
        bail!("Nothing to update; pass --posts-per-day, --platforms, or --post-times");
    }

    let mut config = store.scheduler_config(admin_id).await?;

    if let Some(value) = posts_per_day {
        config.posts_per_day = value;
    }

    if let Some(names) = platforms {
        let mut parsed = Vec::with_capacity(names.len());
        for name in &names {
            let platform = Platform::parse(name.trim())
                .with_context(|| format!("Unknown platform: {}", name))?;
            parsed.push(platform);
        }

        // A platform without stored credentials can never publish
        let integrations = store.integration_config(admin_id).await?;
        for platform in &parsed {
            if integrations.credentials_for(*platform).is_none() {
                bail!(
                    "No credentials stored for {}. Run 'autopromo integrations set' first.",
                    platform
                );
            }
        }

        config.platforms = parsed;
    }

    if let Some(times) = post_times {
        let mut parsed = Vec::with_capacity(times.len());
        for value in &times {
            let time = parse_post_time(value.trim())
                .with_context(|| format!("Invalid post time (expected HH:MM): {}", value))?;
            parsed.push(time);
        }
        config.post_times = parsed;
    }

    config.validate()?;
    store.update_scheduler_config(admin_id, &config).await?;
    print_scheduler(admin_id, &config);

    Ok(())
}

fn print_scheduler(admin_id: &str, config: &SchedulerConfig) {
    let platforms: Vec<&str> = config.platforms.iter().map(|p| p.as_str()).collect();
    let times: Vec<String> = config
        .post_times
        .iter()
        .map(|t| format_post_time(*t))
        .collect();

    println!("Scheduler ({})", admin_id);
    println!(
        "  active:        {}",
        if config.is_active { "yes" } else { "no" }
    );
    println!("  posts per day: {}", config.posts_per_day);
    println!(
        "  platforms:     {}",
        if platforms.is_empty() {
            "-".to_string()
        } else {
            platforms.join(", ")
        }
    );
    println!(
        "  post times:    {}",
        if times.is_empty() {
            "-".to_string()
        } else {
            times.join(", ")
        }
    );
}
