//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// autopromo: scheduled publishing of affiliate products to social platforms
#[derive(Parser, Debug)]
#[command(name = "autopromo")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch, select, and publish products on the configured schedule
    Run(RunArgs),

    /// Inspect or change the stored scheduling policy
    Scheduler(SchedulerArgs),

    /// Manage third-party API credentials
    Integrations(IntegrationsArgs),

    /// List fetched products, newest first
    Products(ListArgs),

    /// List publish attempts, newest first
    Posts(ListArgs),

    /// List pipeline runs, newest first
    Runs(ListArgs),

    /// Posting totals and daily activity
    Analytics(AnalyticsArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Validate configuration and show status
    Doctor(DoctorArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Trigger a single run and exit
    #[arg(long)]
    pub once: bool,

    /// Select and report, but write and publish nothing
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct SchedulerArgs {
    #[command(subcommand)]
    pub command: SchedulerCommands,
}

#[derive(Subcommand, Debug)]
pub enum SchedulerCommands {
    /// Print the stored scheduling policy
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Activate scheduled runs
    Enable,

    /// Deactivate scheduled runs (manual triggers keep working)
    Disable,

    /// Update parts of the scheduling policy
    Set {
        /// Daily cap on publish attempts (1-10)
        #[arg(long)]
        posts_per_day: Option<u32>,

        /// Target platforms (comma-separated: instagram, facebook, pinterest)
        #[arg(long, value_delimiter = ',')]
        platforms: Option<Vec<String>>,

        /// Preferred posting times (comma-separated HH:MM)
        #[arg(long, value_delimiter = ',')]
        post_times: Option<Vec<String>>,
    },
}

#[derive(Args, Debug)]
pub struct IntegrationsArgs {
    #[command(subcommand)]
    pub command: IntegrationsCommands,
}

#[derive(Subcommand, Debug)]
pub enum IntegrationsCommands {
    /// Print which credentials are stored, without revealing them
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Store or update credentials; omitted flags keep their stored value
    Set(IntegrationsSetArgs),
}

#[derive(Args, Debug)]
pub struct IntegrationsSetArgs {
    /// Environment variable holding the RapidAPI key
    #[arg(long, value_name = "VAR")]
    pub rapidapi_key_env: Option<String>,

    /// RapidAPI host for the marketplace API
    #[arg(long)]
    pub rapidapi_host: Option<String>,

    /// Affiliate tag appended to product links (empty clears it)
    #[arg(long)]
    pub affiliate_tag: Option<String>,

    /// Environment variable holding the Instagram access token
    #[arg(long, value_name = "VAR")]
    pub instagram_token_env: Option<String>,

    /// Instagram business account ID
    #[arg(long)]
    pub instagram_user_id: Option<String>,

    /// Environment variable holding the Facebook access token
    #[arg(long, value_name = "VAR")]
    pub facebook_token_env: Option<String>,

    /// Facebook page ID
    #[arg(long)]
    pub facebook_page_id: Option<String>,

    /// Environment variable holding the Pinterest access token
    #[arg(long, value_name = "VAR")]
    pub pinterest_token_env: Option<String>,

    /// Pinterest board ID
    #[arg(long)]
    pub pinterest_board_id: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Maximum rows to show
    #[arg(long, default_value_t = 20)]
    pub limit: u32,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct AnalyticsArgs {
    #[command(subcommand)]
    pub command: AnalyticsCommands,
}

#[derive(Subcommand, Debug)]
pub enum AnalyticsCommands {
    /// All-time totals plus today's slice
    Overview {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Daily posting activity, oldest day first
    Chart {
        /// Trailing window in days (1-90)
        #[arg(long, default_value_t = 7)]
        days: u16,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./config.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
