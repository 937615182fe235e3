//! Publish engine - orchestrates one run of fetch, select, caption, publish
//!
//! A run is the unit of work and of failure accounting: configuration or
//! source errors abort the whole run before any post exists, while a failed
//! publish of one (product, platform) pair is recorded on that post alone.
//! Platforms publish concurrently with respect to each other; within a
//! platform, products go out sequentially in selection order.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use regex::Regex;
use serde::Serialize;
use time::{Duration, UtcOffset};
use uuid::Uuid;

use crate::{
    model::{
        FetchQuery, IntegrationConfig, Platform, PlatformCredentials, Post, PostContent,
        PostOutcome, Product, Run, RunTrigger, SchedulerConfig,
    },
    ports::{
        Clock, ConfigStore, ConfigStoreError, Ledger, LedgerError, ProductSource, Publisher,
        SourceError,
    },
    usecases::caption::{CaptionGenerator, CaptionStyle},
    usecases::selection::select_products,
};

use super::local_day_bounds;

/// Tuning knobs for the publish engine
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Admin whose configuration and ledger rows this engine owns
    pub admin_id: String,
    /// Marketplace search parameters
    pub fetch: FetchQuery,
    /// How far back a published marketplace ID blocks re-selection
    pub dedup_window: Duration,
    /// Running rows older than this are considered crashed leftovers
    pub run_timeout: Duration,
    /// Zone used for "posts created today" quota accounting
    pub timezone: UtcOffset,
    /// Regex patterns; products whose title matches any are never published
    pub exclude_patterns: Vec<String>,
    /// Caption generation style
    pub caption_style: CaptionStyle,
    /// Select and report, but write and publish nothing
    pub dry_run: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            admin_id: "default".to_string(),
            fetch: FetchQuery::default(),
            dedup_window: Duration::days(3),
            run_timeout: Duration::minutes(30),
            timezone: UtcOffset::UTC,
            exclude_patterns: vec![],
            caption_style: CaptionStyle::default(),
            dry_run: false,
        }
    }
}

/// Registry of publisher adapters, one per platform
#[derive(Clone, Default)]
pub struct PublisherSet {
    publishers: Vec<Arc<dyn Publisher>>,
}

impl PublisherSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a publisher; the last registration for a platform wins
    pub fn with(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publishers.retain(|p| p.platform() != publisher.platform());
        self.publishers.push(publisher);
        self
    }

    pub fn get(&self, platform: Platform) -> Option<&Arc<dyn Publisher>> {
        self.publishers.iter().find(|p| p.platform() == platform)
    }
}

/// Why a configured platform was left out of a run
#[derive(Debug, Clone, Serialize)]
pub struct PlatformSkip {
    pub platform: Platform,
    pub reason: String,
}

/// Summary of one run, returned to the trigger caller
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub trigger: RunTrigger,
    pub products_fetched: usize,
    pub products_selected: usize,
    /// Post rows still allowed today before this run's selection
    pub quota_remaining: u64,
    pub posts_created: usize,
    pub posted: usize,
    pub failed: usize,
    pub skipped_platforms: Vec<PlatformSkip>,
    pub dry_run: bool,
}

/// Errors that abort a run
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("A run is already in progress")]
    AlreadyRunning,
    #[error("Missing configuration: {0}")]
    ConfigMissing(String),
    #[error("Product source unavailable: {0}")]
    Source(#[from] SourceError),
    #[error("Config store error: {0}")]
    ConfigStore(#[from] ConfigStoreError),
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Default)]
struct PlatformBatch {
    created: usize,
    posted: usize,
    failed: usize,
    write_errors: usize,
}

/// Publish engine orchestrator
#[derive(Clone)]
pub struct PublishEngine<S, L, C, Cl>
where
    S: ProductSource + ?Sized,
    L: Ledger + ?Sized,
    C: ConfigStore + ?Sized,
    Cl: Clock + ?Sized,
{
    source: Arc<S>,
    ledger: Arc<L>,
    config_store: Arc<C>,
    clock: Arc<Cl>,
    publishers: PublisherSet,
    options: EngineOptions,
    exclude_patterns: Vec<Regex>,
    caption: CaptionGenerator,
}

impl<S, L, C, Cl> PublishEngine<S, L, C, Cl>
where
    S: ProductSource + ?Sized,
    L: Ledger + ?Sized,
    C: ConfigStore + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(
        source: Arc<S>,
        ledger: Arc<L>,
        config_store: Arc<C>,
        clock: Arc<Cl>,
        publishers: PublisherSet,
        options: EngineOptions,
    ) -> Self {
        let exclude_patterns = compile_exclude_patterns(&options.exclude_patterns);
        let caption = CaptionGenerator::new(options.caption_style.clone());
        Self {
            source,
            ledger,
            config_store,
            clock,
            publishers,
            options,
            exclude_patterns,
            caption,
        }
    }

    /// Execute one run end to end.
    ///
    /// At most one run per admin is in flight at any instant; a second
    /// trigger gets `RunError::AlreadyRunning` instead of queueing. Every
    /// accepted run leaves a terminal run row behind, whatever happens.
    pub async fn run_once(&self, trigger: RunTrigger) -> Result<RunReport, RunError> {
        let started_at = self.clock.now();
        let run = Run::started(self.options.admin_id.as_str(), trigger, started_at);
        let active_since = started_at - self.options.run_timeout;

        if !self.ledger.begin_run(&run, active_since).await? {
            tracing::warn!(
                admin_id = %self.options.admin_id,
                "Run refused, another run is in progress"
            );
            return Err(RunError::AlreadyRunning);
        }

        tracing::info!(
            run_id = %run.id,
            trigger = trigger.as_str(),
            dry_run = self.options.dry_run,
            "Run started"
        );

        match self.execute(&run).await {
            Ok(report) => {
                self.ledger
                    .complete_run(run.id, self.clock.now(), report.posts_created as u32)
                    .await?;
                tracing::info!(
                    run_id = %run.id,
                    selected = report.products_selected,
                    posted = report.posted,
                    failed = report.failed,
                    "Run completed"
                );
                Ok(report)
            }
            Err(error) => {
                tracing::error!(run_id = %run.id, error = %error, "Run failed");
                self.ledger
                    .fail_run(run.id, self.clock.now(), &error.to_string())
                    .await?;
                Err(error)
            }
        }
    }

    async fn execute(&self, run: &Run) -> Result<RunReport, RunError> {
        let scheduler_config = self
            .config_store
            .scheduler_config(&self.options.admin_id)
            .await?;
        let integration = self
            .config_store
            .integration_config(&self.options.admin_id)
            .await?;

        let Some(marketplace) = integration.marketplace.clone() else {
            return Err(RunError::ConfigMissing(
                "marketplace API credentials are not set".to_string(),
            ));
        };

        let fetched = self
            .source
            .fetch_products(&marketplace, &self.options.fetch)
            .await?;
        let products_fetched = fetched.len();
        tracing::info!(run_id = %run.id, count = products_fetched, "Fetched products");

        let kept = self.filter_products(fetched);
        let mut catalog = Vec::with_capacity(kept.len());
        for product in &kept {
            catalog.push(self.ledger.upsert_product(product).await?);
        }

        let now = self.clock.now();
        let (day_start, day_end) = local_day_bounds(now, self.options.timezone);
        let today_rows = self.ledger.count_posts_between(day_start, day_end).await?;
        let quota_rows =
            u64::from(scheduler_config.effective_posts_per_day()).saturating_sub(today_rows);

        let (targets, skipped_platforms) = self.resolve_targets(&scheduler_config, &integration);

        // The daily quota counts post rows, so with several target platforms
        // each selected product consumes one row per platform.
        let product_quota = if targets.is_empty() {
            0
        } else {
            quota_rows as usize / targets.len()
        };

        let recently_posted = self
            .ledger
            .posted_marketplace_ids_since(now - self.options.dedup_window)
            .await?;

        let selected = select_products(&catalog, product_quota, &recently_posted);

        let mut report = RunReport {
            run_id: run.id,
            trigger: run.trigger,
            products_fetched,
            products_selected: selected.len(),
            quota_remaining: quota_rows,
            posts_created: 0,
            posted: 0,
            failed: 0,
            skipped_platforms,
            dry_run: self.options.dry_run,
        };

        if selected.is_empty() {
            if quota_rows == 0 {
                tracing::info!(run_id = %run.id, "Daily quota exhausted, nothing to publish");
            } else {
                tracing::info!(run_id = %run.id, "No eligible products to publish");
            }
            return Ok(report);
        }

        if self.options.dry_run {
            for product in &selected {
                tracing::info!(
                    run_id = %run.id,
                    marketplace_id = %product.marketplace_id,
                    title = %product.title,
                    "[DRY RUN] Would publish"
                );
            }
            return Ok(report);
        }

        let mut tasks: FuturesUnordered<BoxFuture<'_, PlatformBatch>> = FuturesUnordered::new();
        for (platform, publisher, credentials) in targets {
            let products = selected.clone();
            tasks.push(Box::pin(async move {
                self.publish_batch(run.id, platform, publisher, credentials, products)
                    .await
            }));
        }

        while let Some(batch) = tasks.next().await {
            report.posts_created += batch.created;
            report.posted += batch.posted;
            report.failed += batch.failed;
            if batch.write_errors > 0 {
                tracing::warn!(
                    run_id = %run.id,
                    write_errors = batch.write_errors,
                    "Some ledger writes failed during publishing"
                );
            }
        }

        Ok(report)
    }

    /// Publish the selection to one platform, sequentially in order
    async fn publish_batch(
        &self,
        run_id: Uuid,
        platform: Platform,
        publisher: Arc<dyn Publisher>,
        credentials: PlatformCredentials,
        products: Vec<Product>,
    ) -> PlatformBatch {
        let mut batch = PlatformBatch::default();

        for product in &products {
            let caption = self.caption.generate(product, platform);
            let post = Post::pending(run_id, product, platform, caption, self.clock.now());

            if let Err(error) = self.ledger.create_post(&post).await {
                tracing::error!(
                    platform = %platform,
                    marketplace_id = %product.marketplace_id,
                    error = %error,
                    "Failed to record pending post"
                );
                batch.write_errors += 1;
                continue;
            }
            batch.created += 1;

            let content = PostContent::for_product(product, post.caption.clone());
            let outcome = match publisher.publish(&credentials, &content).await {
                Ok(remote_id) => {
                    tracing::info!(
                        platform = %platform,
                        post_id = %post.id,
                        remote_id = %remote_id,
                        "Published post"
                    );
                    batch.posted += 1;
                    PostOutcome::Posted {
                        posted_at: self.clock.now(),
                        platform_post_id: remote_id,
                    }
                }
                Err(error) => {
                    tracing::error!(
                        platform = %platform,
                        post_id = %post.id,
                        error = %error,
                        "Publish failed"
                    );
                    batch.failed += 1;
                    PostOutcome::Failed {
                        error_message: error.to_string(),
                    }
                }
            };

            if let Err(error) = self.ledger.transition_post(post.id, &outcome).await {
                tracing::error!(post_id = %post.id, error = %error, "Failed to record post outcome");
                batch.write_errors += 1;
            }
        }

        batch
    }

    /// Platforms this run will publish to, with skip reasons for the rest.
    /// A platform missing credentials is excluded, never a run failure.
    fn resolve_targets(
        &self,
        scheduler: &SchedulerConfig,
        integration: &IntegrationConfig,
    ) -> (
        Vec<(Platform, Arc<dyn Publisher>, PlatformCredentials)>,
        Vec<PlatformSkip>,
    ) {
        let mut targets = Vec::new();
        let mut skipped = Vec::new();
        let mut seen = HashSet::new();

        for &platform in &scheduler.platforms {
            if !seen.insert(platform) {
                continue;
            }
            let Some(publisher) = self.publishers.get(platform) else {
                skip(&mut skipped, platform, "no publisher registered");
                continue;
            };
            if !publisher.is_enabled() {
                skip(&mut skipped, platform, "publishing not yet supported");
                continue;
            }
            let Some(credentials) = integration.credentials_for(platform) else {
                skip(&mut skipped, platform, "credentials not configured");
                continue;
            };
            targets.push((platform, Arc::clone(publisher), credentials));
        }

        (targets, skipped)
    }

    fn filter_products(&self, products: Vec<Product>) -> Vec<Product> {
        if self.exclude_patterns.is_empty() {
            return products;
        }
        let before = products.len();
        let kept: Vec<Product> = products
            .into_iter()
            .filter(|p| {
                !self
                    .exclude_patterns
                    .iter()
                    .any(|pattern| pattern.is_match(&p.title))
            })
            .collect();
        if kept.len() < before {
            tracing::debug!(excluded = before - kept.len(), "Excluded products by title pattern");
        }
        kept
    }
}

fn skip(skipped: &mut Vec<PlatformSkip>, platform: Platform, reason: &str) {
    tracing::warn!(platform = %platform, reason = %reason, "Skipping platform");
    skipped.push(PlatformSkip {
        platform,
        reason: reason.to_string(),
    });
}

fn compile_exclude_patterns(patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(error) => {
                tracing::warn!(pattern = %pattern, error = %error, "Invalid exclude pattern");
                None
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod testkit {
    //! Shared in-memory port fakes for domain tests

    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use secrecy::SecretString;
    use time::{Duration, OffsetDateTime};
    use uuid::Uuid;

    use crate::model::{
        FetchQuery, InstagramCredentials, IntegrationConfig, MarketplaceCredentials, Platform,
        PlatformCredentials, Post, PostContent, PostCounts, PostOutcome, PostStatus, Product, Run,
        RunStatus, SchedulerConfig,
    };
    use crate::ports::{
        Clock, ConfigStore, ConfigStoreError, Ledger, LedgerError, ProductSource, PublishError,
        Publisher, SourceError,
    };

    pub fn product(marketplace_id: &str, title: &str) -> Product {
        Product {
            id: Uuid::new_v4(),
            marketplace_id: marketplace_id.to_string(),
            title: title.to_string(),
            description: Some(format!("{title} in detail")),
            price: Some("$19.99".to_string()),
            image_url: Some(format!("https://img.example/{marketplace_id}.jpg")),
            product_url: format!("https://marketplace.example/dp/{marketplace_id}"),
            affiliate_url: format!("https://marketplace.example/dp/{marketplace_id}?tag=promo-20"),
            rating: Some(4.0),
            reviews_count: Some(100),
            category: None,
            fetched_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    pub fn integration_with_instagram() -> IntegrationConfig {
        IntegrationConfig {
            marketplace: Some(MarketplaceCredentials {
                api_key: SecretString::new("test-key".into()),
                api_host: MarketplaceCredentials::DEFAULT_HOST.to_string(),
                affiliate_tag: Some("promo-20".to_string()),
            }),
            instagram: Some(InstagramCredentials {
                access_token: SecretString::new("ig-token".into()),
                user_id: "17841400000000000".to_string(),
            }),
            facebook: None,
            pinterest: None,
        }
    }

    pub struct FakeSource {
        pub products: Mutex<Vec<Product>>,
        pub fail: Mutex<bool>,
        pub delay: Option<std::time::Duration>,
        pub calls: Mutex<u32>,
    }

    impl FakeSource {
        pub fn with_products(products: Vec<Product>) -> Self {
            Self {
                products: Mutex::new(products),
                fail: Mutex::new(false),
                delay: None,
                calls: Mutex::new(0),
            }
        }

        pub fn set_products(&self, products: Vec<Product>) {
            *self.products.lock().unwrap() = products;
        }
    }

    #[async_trait]
    impl ProductSource for FakeSource {
        async fn fetch_products(
            &self,
            _credentials: &MarketplaceCredentials,
            _query: &FetchQuery,
        ) -> Result<Vec<Product>, SourceError> {
            *self.calls.lock().unwrap() += 1;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if *self.fail.lock().unwrap() {
                return Err(SourceError::Api("search endpoint returned 500".to_string()));
            }
            Ok(self.products.lock().unwrap().clone())
        }
    }

    pub struct FakePublisher {
        pub platform: Platform,
        pub enabled: bool,
        pub fail_titles: Mutex<Vec<String>>,
        pub published: Mutex<Vec<String>>,
    }

    impl FakePublisher {
        pub fn new(platform: Platform) -> Self {
            Self {
                platform,
                enabled: true,
                fail_titles: Mutex::new(vec![]),
                published: Mutex::new(vec![]),
            }
        }

        pub fn disabled(platform: Platform) -> Self {
            let mut publisher = Self::new(platform);
            publisher.enabled = false;
            publisher
        }

        pub fn fail_title(&self, title: &str) {
            self.fail_titles.lock().unwrap().push(title.to_string());
        }

        pub fn clear_failures(&self) {
            self.fail_titles.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl Publisher for FakePublisher {
        async fn publish(
            &self,
            _credentials: &PlatformCredentials,
            content: &PostContent,
        ) -> Result<String, PublishError> {
            if self
                .fail_titles
                .lock()
                .unwrap()
                .iter()
                .any(|t| t == &content.title)
            {
                return Err(PublishError::Api("media upload rejected".to_string()));
            }
            let mut published = self.published.lock().unwrap();
            published.push(content.title.clone());
            Ok(format!("remote-{}-{}", self.platform, published.len()))
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }

        fn platform(&self) -> Platform {
            self.platform
        }
    }

    #[derive(Default)]
    pub struct FakeLedger {
        pub products: Mutex<Vec<Product>>,
        pub posts: Mutex<Vec<Post>>,
        pub runs: Mutex<Vec<Run>>,
    }

    impl FakeLedger {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn post_statuses(&self) -> Vec<PostStatus> {
            self.posts.lock().unwrap().iter().map(|p| p.status).collect()
        }
    }

    #[async_trait]
    impl Ledger for FakeLedger {
        async fn upsert_product(&self, product: &Product) -> Result<Product, LedgerError> {
            let mut products = self.products.lock().unwrap();
            if let Some(existing) = products
                .iter_mut()
                .find(|p| p.marketplace_id == product.marketplace_id)
            {
                let id = existing.id;
                *existing = product.clone();
                existing.id = id;
                return Ok(existing.clone());
            }
            products.push(product.clone());
            Ok(product.clone())
        }

        async fn list_products(&self, limit: u32) -> Result<Vec<Product>, LedgerError> {
            let products = self.products.lock().unwrap();
            Ok(products.iter().rev().take(limit as usize).cloned().collect())
        }

        async fn count_products(&self) -> Result<u64, LedgerError> {
            Ok(self.products.lock().unwrap().len() as u64)
        }

        async fn create_post(&self, post: &Post) -> Result<(), LedgerError> {
            self.posts.lock().unwrap().push(post.clone());
            Ok(())
        }

        async fn transition_post(
            &self,
            post_id: Uuid,
            outcome: &PostOutcome,
        ) -> Result<(), LedgerError> {
            let mut posts = self.posts.lock().unwrap();
            let Some(post) = posts.iter_mut().find(|p| p.id == post_id) else {
                return Err(LedgerError::NotFound(post_id.to_string()));
            };
            if post.status != PostStatus::Pending {
                if post.status == outcome.status() {
                    return Ok(());
                }
                return Err(LedgerError::InvalidTransition {
                    post_id,
                    current: post.status,
                });
            }
            match outcome {
                PostOutcome::Posted {
                    posted_at,
                    platform_post_id,
                } => {
                    post.status = PostStatus::Posted;
                    post.posted_at = Some(*posted_at);
                    post.platform_post_id = Some(platform_post_id.clone());
                }
                PostOutcome::Failed { error_message } => {
                    post.status = PostStatus::Failed;
                    post.error_message = Some(error_message.clone());
                }
            }
            Ok(())
        }

        async fn list_posts(&self, limit: u32) -> Result<Vec<Post>, LedgerError> {
            let posts = self.posts.lock().unwrap();
            Ok(posts.iter().rev().take(limit as usize).cloned().collect())
        }

        async fn posts_scheduled_between(
            &self,
            from: OffsetDateTime,
            to: OffsetDateTime,
        ) -> Result<Vec<Post>, LedgerError> {
            let posts = self.posts.lock().unwrap();
            Ok(posts
                .iter()
                .filter(|p| p.scheduled_at >= from && p.scheduled_at < to)
                .cloned()
                .collect())
        }

        async fn count_posts_between(
            &self,
            from: OffsetDateTime,
            to: OffsetDateTime,
        ) -> Result<u64, LedgerError> {
            Ok(self.posts_scheduled_between(from, to).await?.len() as u64)
        }

        async fn posted_marketplace_ids_since(
            &self,
            since: OffsetDateTime,
        ) -> Result<HashSet<String>, LedgerError> {
            let posts = self.posts.lock().unwrap();
            Ok(posts
                .iter()
                .filter(|p| {
                    p.status == PostStatus::Posted
                        && p.posted_at.is_some_and(|posted| posted >= since)
                })
                .map(|p| p.marketplace_id.clone())
                .collect())
        }

        async fn post_totals(&self) -> Result<PostCounts, LedgerError> {
            let posts = self.posts.lock().unwrap();
            let mut counts = PostCounts::default();
            for post in posts.iter() {
                counts.record(post.platform, post.status);
            }
            Ok(counts)
        }

        async fn begin_run(
            &self,
            run: &Run,
            active_since: OffsetDateTime,
        ) -> Result<bool, LedgerError> {
            let mut runs = self.runs.lock().unwrap();
            let blocked = runs.iter().any(|r| {
                r.admin_id == run.admin_id
                    && r.status == RunStatus::Running
                    && r.started_at >= active_since
            });
            if blocked {
                return Ok(false);
            }
            runs.push(run.clone());
            Ok(true)
        }

        async fn complete_run(
            &self,
            run_id: Uuid,
            finished_at: OffsetDateTime,
            posts_created: u32,
        ) -> Result<(), LedgerError> {
            let mut runs = self.runs.lock().unwrap();
            let Some(run) = runs.iter_mut().find(|r| r.id == run_id) else {
                return Err(LedgerError::NotFound(run_id.to_string()));
            };
            run.status = RunStatus::Completed;
            run.finished_at = Some(finished_at);
            run.posts_created = posts_created;
            Ok(())
        }

        async fn fail_run(
            &self,
            run_id: Uuid,
            finished_at: OffsetDateTime,
            error: &str,
        ) -> Result<(), LedgerError> {
            let mut runs = self.runs.lock().unwrap();
            let Some(run) = runs.iter_mut().find(|r| r.id == run_id) else {
                return Err(LedgerError::NotFound(run_id.to_string()));
            };
            run.status = RunStatus::Failed;
            run.finished_at = Some(finished_at);
            run.error_message = Some(error.to_string());
            Ok(())
        }

        async fn recover_stale_runs(&self, cutoff: OffsetDateTime) -> Result<u64, LedgerError> {
            let mut runs = self.runs.lock().unwrap();
            let mut posts = self.posts.lock().unwrap();
            let mut recovered = 0;
            for run in runs.iter_mut() {
                if run.status == RunStatus::Running && run.started_at < cutoff {
                    run.status = RunStatus::Failed;
                    run.error_message = Some("abandoned by crashed process".to_string());
                    for post in posts.iter_mut() {
                        if post.run_id == run.id && post.status == PostStatus::Pending {
                            post.status = PostStatus::Failed;
                            post.error_message = Some("run abandoned before completion".to_string());
                        }
                    }
                    recovered += 1;
                }
            }
            Ok(recovered)
        }

        async fn list_runs(&self, limit: u32) -> Result<Vec<Run>, LedgerError> {
            let runs = self.runs.lock().unwrap();
            Ok(runs.iter().rev().take(limit as usize).cloned().collect())
        }
    }

    pub struct FakeConfigStore {
        pub scheduler: Mutex<SchedulerConfig>,
        pub integration: Mutex<IntegrationConfig>,
    }

    impl FakeConfigStore {
        pub fn new(scheduler: SchedulerConfig, integration: IntegrationConfig) -> Self {
            Self {
                scheduler: Mutex::new(scheduler),
                integration: Mutex::new(integration),
            }
        }

        pub fn active_instagram() -> Self {
            let scheduler = SchedulerConfig {
                is_active: true,
                ..SchedulerConfig::default()
            };
            Self::new(scheduler, integration_with_instagram())
        }

        pub fn set_active(&self, is_active: bool) {
            self.scheduler.lock().unwrap().is_active = is_active;
        }
    }

    #[async_trait]
    impl ConfigStore for FakeConfigStore {
        async fn scheduler_config(
            &self,
            _admin_id: &str,
        ) -> Result<SchedulerConfig, ConfigStoreError> {
            Ok(self.scheduler.lock().unwrap().clone())
        }

        async fn update_scheduler_config(
            &self,
            _admin_id: &str,
            config: &SchedulerConfig,
        ) -> Result<(), ConfigStoreError> {
            *self.scheduler.lock().unwrap() = config.clone();
            Ok(())
        }

        async fn integration_config(
            &self,
            _admin_id: &str,
        ) -> Result<IntegrationConfig, ConfigStoreError> {
            Ok(self.integration.lock().unwrap().clone())
        }

        async fn update_integration_config(
            &self,
            _admin_id: &str,
            config: &IntegrationConfig,
        ) -> Result<(), ConfigStoreError> {
            *self.integration.lock().unwrap() = config.clone();
            Ok(())
        }
    }

    pub struct FakeClock {
        time: Mutex<OffsetDateTime>,
    }

    impl FakeClock {
        pub fn at(time: OffsetDateTime) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        pub fn advance(&self, by: Duration) {
            *self.time.lock().unwrap() += by;
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> OffsetDateTime {
            *self.time.lock().unwrap()
        }
    }
}
