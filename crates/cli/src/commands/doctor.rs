//! Doctor command - validate configuration and show status

use anyhow::Result;
use autopromo_adapters::sqlite::{self, SqliteConfigStore, SqliteLedger};
use autopromo_domain::{ConfigStore, ConfigStoreError, IntegrationConfig, Ledger, SchedulerConfig};
use serde::Serialize;
use std::path::PathBuf;

use crate::args::DoctorArgs;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    database: CheckResult,
    scheduler: CheckResult,
    marketplace: CheckResult,
    platforms: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        database: CheckResult::error("Not checked"),
        scheduler: CheckResult::error("Not checked"),
        marketplace: CheckResult::error("Not checked"),
        platforms: CheckResult::error("Not checked"),
        overall: "error".to_string(),
    };

    // Check config
    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => match c.general.timezone_offset() {
            Ok(_) => {
                report.config = CheckResult::ok("Configuration loaded successfully");
                Some(c)
            }
            Err(e) => {
                report.config = CheckResult::error(e.to_string());
                None
            }
        },
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {}", e));
            None
        }
    };

    if let Some(ref config) = config {
        match sqlite::connect(&config.general.state_db_path).await {
            Ok(pool) => {
                report.database =
                    check_database(SqliteLedger::new(pool.clone()), config).await;

                let store = SqliteConfigStore::new(pool);
                let admin_id = &config.general.admin_id;
                let scheduler = store.scheduler_config(admin_id).await;
                let integrations = store.integration_config(admin_id).await;

                report.scheduler = check_scheduler(&scheduler);
                report.marketplace = check_marketplace(&integrations);
                report.platforms = check_platforms(&scheduler, &integrations);
            }
            Err(e) => {
                report.database = CheckResult::error(format!("Failed to open database: {}", e));
            }
        }
    }

    // Determine overall status
    let checks = [
        &report.config,
        &report.database,
        &report.scheduler,
        &report.marketplace,
        &report.platforms,
    ];

    let has_error = checks.iter().any(|c| c.is_error());
    let all_ok = checks.iter().all(|c| c.is_ok());

    report.overall = if has_error {
        "error".to_string()
    } else if all_ok {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    // Output report
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

async fn check_database(ledger: SqliteLedger, config: &AppConfig) -> CheckResult {
    match ledger.count_products().await {
        Ok(count) => CheckResult::ok(format!(
            "Database ready: {} ({} products)",
            config.general.state_db_path.display(),
            count
        )),
        Err(e) => CheckResult::error(format!("Database query failed: {}", e)),
    }
}

fn check_scheduler(result: &Result<SchedulerConfig, ConfigStoreError>) -> CheckResult {
    let config = match result {
        Ok(c) => c,
        Err(e) => return CheckResult::error(format!("Failed to read scheduler config: {}", e)),
    };

    if let Err(e) = config.validate() {
        return CheckResult::error(format!("Stored scheduler config is invalid: {}", e));
    }

    if !config.is_active {
        return CheckResult::warn("Scheduler disabled; only manual runs will publish");
    }

    if config.platforms.is_empty() {
        return CheckResult::warn("Scheduler active but no target platforms configured");
    }

    let platforms: Vec<&str> = config.platforms.iter().map(|p| p.as_str()).collect();
    CheckResult::ok(format!(
        "Active: {} posts/day on {}",
        config.posts_per_day,
        platforms.join(", ")
    ))
}

fn check_marketplace(result: &Result<IntegrationConfig, ConfigStoreError>) -> CheckResult {
    let config = match result {
        Ok(c) => c,
        Err(e) => return CheckResult::error(format!("Failed to read integrations: {}", e)),
    };

    match &config.marketplace {
        Some(m) => CheckResult::ok(format!("RapidAPI key stored (host: {})", m.api_host)),
        None => CheckResult::error("No marketplace credentials stored; runs cannot fetch products"),
    }
}

fn check_platforms(
    scheduler: &Result<SchedulerConfig, ConfigStoreError>,
    integrations: &Result<IntegrationConfig, ConfigStoreError>,
) -> CheckResult {
    let (Ok(scheduler), Ok(integrations)) = (scheduler, integrations) else {
        return CheckResult::error("Not checked");
    };

    if scheduler.platforms.is_empty() {
        return CheckResult::warn("No target platforms configured");
    }

    let missing: Vec<&str> = scheduler
        .platforms
        .iter()
        .filter(|p| integrations.credentials_for(**p).is_none())
        .map(|p| p.as_str())
        .collect();

    if missing.is_empty() {
        CheckResult::ok(format!(
            "All {} target platforms have credentials",
            scheduler.platforms.len()
        ))
    } else {
        CheckResult::warn(format!(
            "Missing credentials for: {}; these platforms are skipped at run time",
            missing.join(", ")
        ))
    }
}

fn print_report(report: &DoctorReport) {
    println!("autopromo Doctor Report");
    println!("=======================");
    println!();

    print_check("Config", &report.config);
    print_check("Database", &report.database);
    print_check("Scheduler", &report.scheduler);
    print_check("Marketplace", &report.marketplace);
    print_check("Platforms", &report.platforms);

    println!();
    let symbol = match report.overall.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} Overall: {}", symbol, report.overall.to_uppercase());

    if report.overall == "ok" {
        println!();
        println!("Ready to run! Try: autopromo run --once --dry-run");
    }
}

fn print_check(name: &str, result: &CheckResult) {
    let symbol = match result.status.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} {}: {}", symbol, name, result.message);
}
