//! Domain models and value objects

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

/// Social platforms the engine can publish to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Facebook,
    Pinterest,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Instagram, Platform::Facebook, Platform::Pinterest];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::Pinterest => "pinterest",
        }
    }

    /// Parse a lowercase platform name as stored in the database and config
    pub fn parse(s: &str) -> Option<Platform> {
        match s {
            "instagram" => Some(Platform::Instagram),
            "facebook" => Some(Platform::Facebook),
            "pinterest" => Some(Platform::Pinterest),
            _ => None,
        }
    }

    /// Hard caption length limit enforced by the platform
    pub fn max_caption_chars(&self) -> usize {
        match self {
            Platform::Instagram => 2200,
            Platform::Facebook => 63206,
            Platform::Pinterest => 500,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A marketplace product eligible for promotion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Internal catalog ID
    pub id: Uuid,
    /// Marketplace identifier (ASIN); the upsert and dedup key
    pub marketplace_id: String,
    /// Product title
    pub title: String,
    /// Marketing description, if the marketplace provides one
    pub description: Option<String>,
    /// Display price as reported by the marketplace (e.g. "$29.99")
    pub price: Option<String>,
    /// Primary product image
    pub image_url: Option<String>,
    /// Canonical product page URL
    pub product_url: String,
    /// Product URL with the affiliate tag applied
    pub affiliate_url: String,
    /// Average review rating
    pub rating: Option<f64>,
    /// Review count
    pub reviews_count: Option<i64>,
    /// Marketplace category
    pub category: Option<String>,
    /// When this product was last fetched from the source
    #[serde(with = "time::serde::rfc3339")]
    pub fetched_at: OffsetDateTime,
}

/// Lifecycle state of a publish attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    /// Created, publish call not yet resolved
    Pending,
    /// Published successfully (terminal)
    Posted,
    /// Publish failed (terminal)
    Failed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Pending => "pending",
            PostStatus::Posted => "posted",
            PostStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<PostStatus> {
        match s {
            "pending" => Some(PostStatus::Pending),
            "posted" => Some(PostStatus::Posted),
            "failed" => Some(PostStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of one publish attempt for one (product, platform) pair.
///
/// A post is created `pending` and transitions exactly once to `posted` or
/// `failed`. Retries create a new row; rows are never republished.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    /// The run that created this attempt
    pub run_id: Uuid,
    /// Internal catalog ID of the product
    pub product_id: Uuid,
    /// Marketplace ID, denormalized for dedup-window queries
    pub marketplace_id: String,
    pub platform: Platform,
    /// The caption as sent to the platform
    pub caption: String,
    pub status: PostStatus,
    /// When the attempt was enqueued
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_at: OffsetDateTime,
    /// When the platform accepted the post
    #[serde(with = "time::serde::rfc3339::option")]
    pub posted_at: Option<OffsetDateTime>,
    /// Remote post ID returned by the platform
    pub platform_post_id: Option<String>,
    /// Adapter error text, verbatim, for failed attempts
    pub error_message: Option<String>,
}

impl Post {
    /// Create a new pending attempt for a product on a platform
    pub fn pending(
        run_id: Uuid,
        product: &Product,
        platform: Platform,
        caption: String,
        scheduled_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_id,
            product_id: product.id,
            marketplace_id: product.marketplace_id.clone(),
            platform,
            caption,
            status: PostStatus::Pending,
            scheduled_at,
            posted_at: None,
            platform_post_id: None,
            error_message: None,
        }
    }
}

/// Terminal outcome applied to a pending post
#[derive(Debug, Clone, PartialEq)]
pub enum PostOutcome {
    Posted {
        posted_at: OffsetDateTime,
        platform_post_id: String,
    },
    Failed {
        error_message: String,
    },
}

impl PostOutcome {
    pub fn status(&self) -> PostStatus {
        match self {
            PostOutcome::Posted { .. } => PostStatus::Posted,
            PostOutcome::Failed { .. } => PostStatus::Failed,
        }
    }
}

/// What started a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunTrigger {
    /// The scheduler loop's fixed-period tick
    Interval,
    /// An operator-initiated trigger
    Manual,
}

impl RunTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunTrigger::Interval => "interval",
            RunTrigger::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<RunTrigger> {
        match s {
            "interval" => Some(RunTrigger::Interval),
            "manual" => Some(RunTrigger::Manual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<RunStatus> {
        match s {
            "running" => Some(RunStatus::Running),
            "completed" => Some(RunStatus::Completed),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }
}

/// One execution of the publish pipeline.
///
/// The persisted `running` row doubles as the mutual-exclusion flag: a new
/// run may only begin while no recent `running` row exists for the admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: Uuid,
    pub admin_id: String,
    pub trigger: RunTrigger,
    pub status: RunStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub finished_at: Option<OffsetDateTime>,
    /// Post rows created by this run (any outcome)
    pub posts_created: u32,
    pub error_message: Option<String>,
}

impl Run {
    pub fn started(admin_id: impl Into<String>, trigger: RunTrigger, started_at: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            admin_id: admin_id.into(),
            trigger,
            status: RunStatus::Running,
            started_at,
            finished_at: None,
            posts_created: 0,
            error_message: None,
        }
    }
}

/// Per-admin scheduling policy, editable at any time and re-read each run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Gates the interval trigger only; manual runs ignore it
    pub is_active: bool,
    /// Daily cap on publish attempts (rows), within [1, 10]
    pub posts_per_day: u32,
    /// Preferred posting times; advisory, the trigger is interval-based
    #[serde(with = "time_hm::vec")]
    pub post_times: Vec<Time>,
    /// Target platforms for new runs
    pub platforms: Vec<Platform>,
}

impl SchedulerConfig {
    pub const MIN_POSTS_PER_DAY: u32 = 1;
    pub const MAX_POSTS_PER_DAY: u32 = 10;

    pub fn validate(&self) -> Result<(), InvalidSchedulerConfig> {
        if self.posts_per_day < Self::MIN_POSTS_PER_DAY
            || self.posts_per_day > Self::MAX_POSTS_PER_DAY
        {
            return Err(InvalidSchedulerConfig::PostsPerDay(self.posts_per_day));
        }
        let mut seen = std::collections::HashSet::new();
        for platform in &self.platforms {
            if !seen.insert(*platform) {
                return Err(InvalidSchedulerConfig::DuplicatePlatform(*platform));
            }
        }
        Ok(())
    }

    /// Posts-per-day clamped into the valid range, for defensive reads
    pub fn effective_posts_per_day(&self) -> u32 {
        self.posts_per_day
            .clamp(Self::MIN_POSTS_PER_DAY, Self::MAX_POSTS_PER_DAY)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        use time::macros::time;
        Self {
            is_active: false,
            posts_per_day: 3,
            post_times: vec![time!(09:00), time!(14:00), time!(19:00)],
            platforms: vec![Platform::Instagram],
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InvalidSchedulerConfig {
    #[error("posts_per_day must be between 1 and 10, got {0}")]
    PostsPerDay(u32),
    #[error("platform listed twice: {0}")]
    DuplicatePlatform(Platform),
}

/// Marketplace API credentials; required before any run can fetch
#[derive(Debug, Clone)]
pub struct MarketplaceCredentials {
    pub api_key: SecretString,
    pub api_host: String,
    /// Appended to product URLs as `?tag=...` when present
    pub affiliate_tag: Option<String>,
}

impl MarketplaceCredentials {
    pub const DEFAULT_HOST: &'static str = "amazon23.p.rapidapi.com";
}

#[derive(Debug, Clone)]
pub struct InstagramCredentials {
    pub access_token: SecretString,
    pub user_id: String,
}

#[derive(Debug, Clone)]
pub struct FacebookCredentials {
    pub access_token: SecretString,
    pub page_id: String,
}

#[derive(Debug, Clone)]
pub struct PinterestCredentials {
    pub access_token: SecretString,
    pub board_id: String,
}

/// Credentials for one platform, passed to the publisher per call so every
/// run sees the freshest stored configuration
#[derive(Debug, Clone)]
pub enum PlatformCredentials {
    Instagram(InstagramCredentials),
    Facebook(FacebookCredentials),
    Pinterest(PinterestCredentials),
}

impl PlatformCredentials {
    pub fn platform(&self) -> Platform {
        match self {
            PlatformCredentials::Instagram(_) => Platform::Instagram,
            PlatformCredentials::Facebook(_) => Platform::Facebook,
            PlatformCredentials::Pinterest(_) => Platform::Pinterest,
        }
    }
}

/// Stored third-party credentials for one admin
#[derive(Debug, Clone, Default)]
pub struct IntegrationConfig {
    pub marketplace: Option<MarketplaceCredentials>,
    pub instagram: Option<InstagramCredentials>,
    pub facebook: Option<FacebookCredentials>,
    pub pinterest: Option<PinterestCredentials>,
}

impl IntegrationConfig {
    /// Credentials for a platform, if every required field is present
    pub fn credentials_for(&self, platform: Platform) -> Option<PlatformCredentials> {
        match platform {
            Platform::Instagram => self
                .instagram
                .clone()
                .map(PlatformCredentials::Instagram),
            Platform::Facebook => self.facebook.clone().map(PlatformCredentials::Facebook),
            Platform::Pinterest => self
                .pinterest
                .clone()
                .map(PlatformCredentials::Pinterest),
        }
    }
}

/// Search parameters for the product source
#[derive(Debug, Clone)]
pub struct FetchQuery {
    pub query: String,
    pub category: Option<String>,
    /// Maximum products taken from the response
    pub page_size: usize,
}

impl Default for FetchQuery {
    fn default() -> Self {
        Self {
            query: "best sellers".to_string(),
            category: None,
            page_size: 10,
        }
    }
}

/// Content handed to a platform publisher
#[derive(Debug, Clone)]
pub struct PostContent {
    pub caption: String,
    pub image_url: Option<String>,
    /// Affiliate link for the promoted product
    pub link: String,
    pub title: String,
}

impl PostContent {
    pub fn for_product(product: &Product, caption: String) -> Self {
        Self {
            caption,
            image_url: product.image_url.clone(),
            link: product.affiliate_url.clone(),
            title: product.title.clone(),
        }
    }
}

/// Post counts broken down by status and platform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCounts {
    pub total: u64,
    pub posted: u64,
    pub failed: u64,
    pub pending: u64,
    pub instagram: u64,
    pub facebook: u64,
    pub pinterest: u64,
}

impl PostCounts {
    pub fn record(&mut self, platform: Platform, status: PostStatus) {
        self.total += 1;
        match status {
            PostStatus::Posted => self.posted += 1,
            PostStatus::Failed => self.failed += 1,
            PostStatus::Pending => self.pending += 1,
        }
        match platform {
            Platform::Instagram => self.instagram += 1,
            Platform::Facebook => self.facebook += 1,
            Platform::Pinterest => self.pinterest += 1,
        }
    }
}

/// All-time and current-day aggregates, derived from the ledger on demand
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsOverview {
    pub posts: PostCounts,
    pub total_products: u64,
    /// Counts restricted to the current day in the admin's time zone
    pub today: PostCounts,
}

/// One day of the publish-activity chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    #[serde(with = "date_ymd")]
    pub date: Date,
    pub total_posts: u64,
    pub successful_posts: u64,
    pub instagram_posts: u64,
    pub facebook_posts: u64,
    pub pinterest_posts: u64,
}

impl ChartPoint {
    pub fn empty(date: Date) -> Self {
        Self {
            date,
            total_posts: 0,
            successful_posts: 0,
            instagram_posts: 0,
            facebook_posts: 0,
            pinterest_posts: 0,
        }
    }
}

/// Serde helper: `Date` as `YYYY-MM-DD`
mod date_ymd {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use time::Date;
    use time::macros::format_description;

    const FORMAT: &[time::format_description::BorrowedFormatItem<'static>] =
        format_description!("[year]-[month]-[day]");

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        let formatted = date
            .format(&FORMAT)
            .map_err(|e| serde::ser::Error::custom(e.to_string()))?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let s = String::deserialize(deserializer)?;
        Date::parse(&s, &FORMAT).map_err(|e| D::Error::custom(e.to_string()))
    }
}

/// Serde helper: `Time` as `HH:MM`
mod time_hm {
    use time::macros::format_description;

    pub(super) const FORMAT: &[time::format_description::BorrowedFormatItem<'static>] =
        format_description!("[hour]:[minute]");

    pub mod vec {
        use serde::{Deserialize, Deserializer, Serializer, de::Error, ser::SerializeSeq};
        use time::Time;

        pub fn serialize<S: Serializer>(times: &[Time], serializer: S) -> Result<S::Ok, S::Error> {
            let mut seq = serializer.serialize_seq(Some(times.len()))?;
            for t in times {
                let formatted = t
                    .format(&super::FORMAT)
                    .map_err(|e| serde::ser::Error::custom(e.to_string()))?;
                seq.serialize_element(&formatted)?;
            }
            seq.end()
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<Time>, D::Error> {
            let raw = Vec::<String>::deserialize(deserializer)?;
            raw.iter()
                .map(|s| Time::parse(s, &super::FORMAT).map_err(|e| D::Error::custom(e.to_string())))
                .collect()
        }
    }
}

/// Parse a preferred posting time in `HH:MM` form
pub fn parse_post_time(s: &str) -> Option<Time> {
    Time::parse(s, &time_hm::FORMAT).ok()
}

/// Format a preferred posting time as `HH:MM`
pub fn format_post_time(t: Time) -> String {
    // The format only reads hour and minute fields, which always format.
    t.format(&time_hm::FORMAT).unwrap_or_default()
}
