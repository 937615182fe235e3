//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::model::{
    FetchQuery, IntegrationConfig, MarketplaceCredentials, Platform, PlatformCredentials, Post,
    PostContent, PostCounts, PostOutcome, PostStatus, Product, Run, SchedulerConfig,
};

/// Error type for product source operations.
///
/// Every variant means the source is unavailable for this run; the run
/// aborts before creating any posts and the next run is the retry.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited, retry after: {0:?}")]
    RateLimited(Option<std::time::Duration>),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Network error: {0}")]
    Network(String),
}

/// Port for fetching promotable products from a marketplace
#[async_trait]
pub trait ProductSource: Send + Sync {
    /// Fetch a page of products matching the query, best sellers first
    async fn fetch_products(
        &self,
        credentials: &MarketplaceCredentials,
        query: &FetchQuery,
    ) -> Result<Vec<Product>, SourceError>;
}

/// Error type for publisher operations
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Platform not configured: {0}")]
    ConfigMissing(String),
    #[error("Content rejected: {0}")]
    InvalidContent(String),
}

/// Port for publishing content to one social platform
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish the content, returning the platform's post ID
    async fn publish(
        &self,
        credentials: &PlatformCredentials,
        content: &PostContent,
    ) -> Result<String, PublishError>;

    /// Whether this publisher is actually implemented and usable
    fn is_enabled(&self) -> bool;

    /// The platform this publisher targets
    fn platform(&self) -> Platform;
}

/// Error type for ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Post {post_id} is already {current}, refusing conflicting transition")]
    InvalidTransition { post_id: Uuid, current: PostStatus },
}

/// Port for the persistent product/post/run ledger
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Insert or refresh a product by marketplace ID, returning the
    /// canonical row (the original internal ID survives an upsert)
    async fn upsert_product(&self, product: &Product) -> Result<Product, LedgerError>;

    /// Most recently fetched products first
    async fn list_products(&self, limit: u32) -> Result<Vec<Product>, LedgerError>;

    async fn count_products(&self) -> Result<u64, LedgerError>;

    /// Record a new pending publish attempt
    async fn create_post(&self, post: &Post) -> Result<(), LedgerError>;

    /// Apply a terminal outcome to a pending post.
    ///
    /// Idempotent: re-applying an outcome matching the post's current
    /// terminal status is a no-op; a conflicting outcome is
    /// `InvalidTransition`.
    async fn transition_post(
        &self,
        post_id: Uuid,
        outcome: &PostOutcome,
    ) -> Result<(), LedgerError>;

    /// Most recently scheduled posts first
    async fn list_posts(&self, limit: u32) -> Result<Vec<Post>, LedgerError>;

    /// Posts scheduled in `[from, to)`, oldest first
    async fn posts_scheduled_between(
        &self,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> Result<Vec<Post>, LedgerError>;

    /// Publish attempts (any status) scheduled in `[from, to)`
    async fn count_posts_between(
        &self,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> Result<u64, LedgerError>;

    /// Marketplace IDs with a successful post scheduled since `since`.
    ///
    /// Failed attempts are excluded so a manual run can retry them.
    async fn posted_marketplace_ids_since(
        &self,
        since: OffsetDateTime,
    ) -> Result<HashSet<String>, LedgerError>;

    /// All-time post counts by status and platform
    async fn post_totals(&self) -> Result<PostCounts, LedgerError>;

    /// Atomically record `run` as running, unless another run for the same
    /// admin is running and started at or after `active_since`. Returns
    /// `false` when refused; older running rows are treated as stale
    /// leftovers and do not block.
    async fn begin_run(
        &self,
        run: &Run,
        active_since: OffsetDateTime,
    ) -> Result<bool, LedgerError>;

    async fn complete_run(
        &self,
        run_id: Uuid,
        finished_at: OffsetDateTime,
        posts_created: u32,
    ) -> Result<(), LedgerError>;

    async fn fail_run(
        &self,
        run_id: Uuid,
        finished_at: OffsetDateTime,
        error: &str,
    ) -> Result<(), LedgerError>;

    /// Fail running rows started before `cutoff` along with their orphaned
    /// pending posts. Returns the number of runs recovered. Called at
    /// process start so a crash mid-run cannot wedge the scheduler.
    async fn recover_stale_runs(&self, cutoff: OffsetDateTime) -> Result<u64, LedgerError>;

    /// Most recently started runs first
    async fn list_runs(&self, limit: u32) -> Result<Vec<Run>, LedgerError>;
}

/// Error type for config store operations
#[derive(Debug, Error)]
pub enum ConfigStoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Port for stored per-admin configuration.
///
/// Reads return defaults when nothing has been stored yet. The engine only
/// reads; mutations go through the operator surface.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn scheduler_config(&self, admin_id: &str) -> Result<SchedulerConfig, ConfigStoreError>;

    async fn update_scheduler_config(
        &self,
        admin_id: &str,
        config: &SchedulerConfig,
    ) -> Result<(), ConfigStoreError>;

    async fn integration_config(
        &self,
        admin_id: &str,
    ) -> Result<IntegrationConfig, ConfigStoreError>;

    async fn update_integration_config(
        &self,
        admin_id: &str,
        config: &IntegrationConfig,
    ) -> Result<(), ConfigStoreError>;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
