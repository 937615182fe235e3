//! SQLite-backed ledger for products, posts, and runs

use async_trait::async_trait;
use autopromo_domain::{
    Ledger, LedgerError, Platform, Post, PostCounts, PostOutcome, PostStatus, Product, Run,
    RunStatus, RunTrigger,
};
use sqlx::SqlitePool;
use std::collections::HashSet;
use time::{OffsetDateTime, UtcOffset, format_description::well_known::Rfc3339};
use uuid::Uuid;

/// Ledger implementation sharing the adapter pool
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn format_ts(ts: OffsetDateTime) -> Result<String, LedgerError> {
    ts.to_offset(UtcOffset::UTC)
        .replace_nanosecond(0)
        .map_err(|e| LedgerError::Serialization(e.to_string()))?
        .format(&Rfc3339)
        .map_err(|e| LedgerError::Serialization(e.to_string()))
}

fn parse_ts(s: &str) -> Result<OffsetDateTime, LedgerError> {
    OffsetDateTime::parse(s, &Rfc3339).map_err(|e| LedgerError::Serialization(e.to_string()))
}

fn parse_id(s: &str) -> Result<Uuid, LedgerError> {
    Uuid::parse_str(s).map_err(|e| LedgerError::Serialization(e.to_string()))
}

type ProductRow = (
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    String,
    Option<f64>,
    Option<i64>,
    Option<String>,
    String,
);

fn product_from_row(row: ProductRow) -> Result<Product, LedgerError> {
    let (
        id,
        marketplace_id,
        title,
        description,
        price,
        image_url,
        product_url,
        affiliate_url,
        rating,
        reviews_count,
        category,
        fetched_at,
    ) = row;

    Ok(Product {
        id: parse_id(&id)?,
        marketplace_id,
        title,
        description,
        price,
        image_url,
        product_url,
        affiliate_url,
        rating,
        reviews_count,
        category,
        fetched_at: parse_ts(&fetched_at)?,
    })
}

type PostRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
);

fn post_from_row(row: PostRow) -> Result<Post, LedgerError> {
    let (
        id,
        run_id,
        product_id,
        marketplace_id,
        platform,
        caption,
        status,
        scheduled_at,
        posted_at,
        platform_post_id,
        error_message,
    ) = row;

    Ok(Post {
        id: parse_id(&id)?,
        run_id: parse_id(&run_id)?,
        product_id: parse_id(&product_id)?,
        marketplace_id,
        platform: Platform::parse(&platform)
            .ok_or_else(|| LedgerError::Serialization(format!("Unknown platform: {}", platform)))?,
        caption,
        status: PostStatus::parse(&status)
            .ok_or_else(|| LedgerError::Serialization(format!("Unknown post status: {}", status)))?,
        scheduled_at: parse_ts(&scheduled_at)?,
        posted_at: posted_at.as_deref().map(parse_ts).transpose()?,
        platform_post_id,
        error_message,
    })
}

type RunRow = (
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    i64,
    Option<String>,
);

fn run_from_row(row: RunRow) -> Result<Run, LedgerError> {
    let (id, admin_id, trigger, status, started_at, finished_at, posts_created, error_message) =
        row;

    Ok(Run {
        id: parse_id(&id)?,
        admin_id,
        trigger: RunTrigger::parse(&trigger)
            .ok_or_else(|| LedgerError::Serialization(format!("Unknown trigger: {}", trigger)))?,
        status: RunStatus::parse(&status)
            .ok_or_else(|| LedgerError::Serialization(format!("Unknown run status: {}", status)))?,
        started_at: parse_ts(&started_at)?,
        finished_at: finished_at.as_deref().map(parse_ts).transpose()?,
        posts_created: u32::try_from(posts_created)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?,
        error_message,
    })
}

const PRODUCT_COLUMNS: &str = "id, marketplace_id, title, description, price, image_url, \
     product_url, affiliate_url, rating, reviews_count, category, fetched_at";

const POST_COLUMNS: &str = "id, run_id, product_id, marketplace_id, platform, caption, status, \
     scheduled_at, posted_at, platform_post_id, error_message";

const RUN_COLUMNS: &str = "id, admin_id, trigger_source, status, started_at, finished_at, \
     posts_created, error_message";

#[async_trait]
impl Ledger for SqliteLedger {
    async fn upsert_product(&self, product: &Product) -> Result<Product, LedgerError> {
        let fetched_at = format_ts(product.fetched_at)?;

        let row: ProductRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO products ({PRODUCT_COLUMNS})
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(marketplace_id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                price = excluded.price,
                image_url = excluded.image_url,
                product_url = excluded.product_url,
                affiliate_url = excluded.affiliate_url,
                rating = excluded.rating,
                reviews_count = excluded.reviews_count,
                category = excluded.category,
                fetched_at = excluded.fetched_at
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product.id.to_string())
        .bind(&product.marketplace_id)
        .bind(&product.title)
        .bind(&product.description)
        .bind(&product.price)
        .bind(&product.image_url)
        .bind(&product.product_url)
        .bind(&product.affiliate_url)
        .bind(product.rating)
        .bind(product.reviews_count)
        .bind(&product.category)
        .bind(&fetched_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

        product_from_row(row)
    }

    async fn list_products(&self, limit: u32) -> Result<Vec<Product>, LedgerError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY fetched_at DESC LIMIT ?"
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

        rows.into_iter().map(product_from_row).collect()
    }

    async fn count_products(&self) -> Result<u64, LedgerError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| LedgerError::Database(e.to_string()))?;

        Ok(count.0 as u64)
    }

    async fn create_post(&self, post: &Post) -> Result<(), LedgerError> {
        let scheduled_at = format_ts(post.scheduled_at)?;
        let posted_at = post.posted_at.map(format_ts).transpose()?;

        sqlx::query(&format!(
            "INSERT INTO posts ({POST_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(post.id.to_string())
        .bind(post.run_id.to_string())
        .bind(post.product_id.to_string())
        .bind(&post.marketplace_id)
        .bind(post.platform.as_str())
        .bind(&post.caption)
        .bind(post.status.as_str())
        .bind(&scheduled_at)
        .bind(&posted_at)
        .bind(&post.platform_post_id)
        .bind(&post.error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

        Ok(())
    }

    async fn transition_post(
        &self,
        post_id: Uuid,
        outcome: &PostOutcome,
    ) -> Result<(), LedgerError> {
        let result = match outcome {
            PostOutcome::Posted {
                posted_at,
                platform_post_id,
            } => {
                let posted_at = format_ts(*posted_at)?;
                sqlx::query(
                    r#"
                    UPDATE posts SET status = 'posted', posted_at = ?, platform_post_id = ?
                    WHERE id = ? AND status = 'pending'
                    "#,
                )
                .bind(&posted_at)
                .bind(platform_post_id)
                .bind(post_id.to_string())
                .execute(&self.pool)
                .await
                .map_err(|e| LedgerError::Database(e.to_string()))?
            }
            PostOutcome::Failed { error_message } => sqlx::query(
                r#"
                UPDATE posts SET status = 'failed', error_message = ?
                WHERE id = ? AND status = 'pending'
                "#,
            )
            .bind(error_message)
            .bind(post_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| LedgerError::Database(e.to_string()))?,
        };

        if result.rows_affected() > 0 {
            return Ok(());
        }

        // Nothing was pending: distinguish a repeat of the same outcome
        // from a conflicting one.
        let row: Option<(String,)> = sqlx::query_as("SELECT status FROM posts WHERE id = ?")
            .bind(post_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| LedgerError::Database(e.to_string()))?;

        let Some((status,)) = row else {
            return Err(LedgerError::NotFound(post_id.to_string()));
        };

        let current = PostStatus::parse(&status)
            .ok_or_else(|| LedgerError::Serialization(format!("Unknown post status: {}", status)))?;

        if current == outcome.status() {
            Ok(())
        } else {
            Err(LedgerError::InvalidTransition { post_id, current })
        }
    }

    async fn list_posts(&self, limit: u32) -> Result<Vec<Post>, LedgerError> {
        let rows: Vec<PostRow> = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM posts ORDER BY scheduled_at DESC LIMIT ?"
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

        rows.into_iter().map(post_from_row).collect()
    }

    async fn posts_scheduled_between(
        &self,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> Result<Vec<Post>, LedgerError> {
        let from = format_ts(from)?;
        let to = format_ts(to)?;

        let rows: Vec<PostRow> = sqlx::query_as(&format!(
            r#"
            SELECT {POST_COLUMNS} FROM posts
            WHERE scheduled_at >= ? AND scheduled_at < ?
            ORDER BY scheduled_at ASC
            "#
        ))
        .bind(&from)
        .bind(&to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

        rows.into_iter().map(post_from_row).collect()
    }

    async fn count_posts_between(
        &self,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> Result<u64, LedgerError> {
        let from = format_ts(from)?;
        let to = format_ts(to)?;

        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM posts WHERE scheduled_at >= ? AND scheduled_at < ?",
        )
        .bind(&from)
        .bind(&to)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

        Ok(count.0 as u64)
    }

    async fn posted_marketplace_ids_since(
        &self,
        since: OffsetDateTime,
    ) -> Result<HashSet<String>, LedgerError> {
        let since = format_ts(since)?;

        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT marketplace_id FROM posts
            WHERE status = 'posted' AND posted_at IS NOT NULL AND posted_at >= ?
            "#,
        )
        .bind(&since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn post_totals(&self) -> Result<PostCounts, LedgerError> {
        let rows: Vec<(String, String, i64)> =
            sqlx::query_as("SELECT status, platform, COUNT(*) FROM posts GROUP BY status, platform")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| LedgerError::Database(e.to_string()))?;

        let mut counts = PostCounts::default();
        for (status, platform, count) in rows {
            let count = count as u64;
            counts.total += count;
            match PostStatus::parse(&status) {
                Some(PostStatus::Posted) => counts.posted += count,
                Some(PostStatus::Failed) => counts.failed += count,
                Some(PostStatus::Pending) => counts.pending += count,
                None => tracing::warn!(status = %status, "Unknown post status in ledger"),
            }
            match Platform::parse(&platform) {
                Some(Platform::Instagram) => counts.instagram += count,
                Some(Platform::Facebook) => counts.facebook += count,
                Some(Platform::Pinterest) => counts.pinterest += count,
                None => tracing::warn!(platform = %platform, "Unknown platform in ledger"),
            }
        }

        Ok(counts)
    }

    async fn begin_run(&self, run: &Run, active_since: OffsetDateTime) -> Result<bool, LedgerError> {
        let started_at = format_ts(run.started_at)?;
        let active_since = format_ts(active_since)?;

        // Guard and insert in one statement so two processes cannot both
        // slip past the check.
        let result = sqlx::query(
            r#"
            INSERT INTO runs (id, admin_id, trigger_source, status, started_at, posts_created)
            SELECT ?, ?, ?, ?, ?, 0
            WHERE NOT EXISTS (
                SELECT 1 FROM runs
                WHERE admin_id = ? AND status = 'running' AND started_at >= ?
            )
            "#,
        )
        .bind(run.id.to_string())
        .bind(&run.admin_id)
        .bind(run.trigger.as_str())
        .bind(run.status.as_str())
        .bind(&started_at)
        .bind(&run.admin_id)
        .bind(&active_since)
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn complete_run(
        &self,
        run_id: Uuid,
        finished_at: OffsetDateTime,
        posts_created: u32,
    ) -> Result<(), LedgerError> {
        let finished_at = format_ts(finished_at)?;

        let result = sqlx::query(
            "UPDATE runs SET status = 'completed', finished_at = ?, posts_created = ? WHERE id = ?",
        )
        .bind(&finished_at)
        .bind(posts_created as i64)
        .bind(run_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound(run_id.to_string()));
        }

        Ok(())
    }

    async fn fail_run(
        &self,
        run_id: Uuid,
        finished_at: OffsetDateTime,
        error: &str,
    ) -> Result<(), LedgerError> {
        let finished_at = format_ts(finished_at)?;

        let result = sqlx::query(
            "UPDATE runs SET status = 'failed', finished_at = ?, error_message = ? WHERE id = ?",
        )
        .bind(&finished_at)
        .bind(error)
        .bind(run_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound(run_id.to_string()));
        }

        Ok(())
    }

    async fn recover_stale_runs(&self, cutoff: OffsetDateTime) -> Result<u64, LedgerError> {
        let cutoff = format_ts(cutoff)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| LedgerError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            UPDATE posts SET status = 'failed', error_message = 'run abandoned before completion'
            WHERE status = 'pending'
              AND run_id IN (SELECT id FROM runs WHERE status = 'running' AND started_at < ?)
            "#,
        )
        .bind(&cutoff)
        .execute(&mut *tx)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

        let result = sqlx::query(
            r#"
            UPDATE runs SET status = 'failed', error_message = 'abandoned by crashed process'
            WHERE status = 'running' AND started_at < ?
            "#,
        )
        .bind(&cutoff)
        .execute(&mut *tx)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| LedgerError::Database(e.to_string()))?;

        let recovered = result.rows_affected();
        if recovered > 0 {
            tracing::warn!(recovered, "Recovered stale runs left by a previous process");
        }

        Ok(recovered)
    }

    async fn list_runs(&self, limit: u32) -> Result<Vec<Run>, LedgerError> {
        let rows: Vec<RunRow> = sqlx::query_as(&format!(
            "SELECT {RUN_COLUMNS} FROM runs ORDER BY started_at DESC LIMIT ?"
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

        rows.into_iter().map(run_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::connect_in_memory;
    use time::Duration;
    use time::macros::datetime;

    async fn ledger() -> SqliteLedger {
        let pool = connect_in_memory().await.unwrap();
        SqliteLedger::new(pool)
    }

    fn sample_product(marketplace_id: &str, title: &str) -> Product {
        Product {
            id: Uuid::new_v4(),
            marketplace_id: marketplace_id.to_string(),
            title: title.to_string(),
            description: Some("A fine thing".to_string()),
            price: Some("$19.99".to_string()),
            image_url: Some("https://img.example.com/p.jpg".to_string()),
            product_url: format!("https://example.com/dp/{}", marketplace_id),
            affiliate_url: format!("https://example.com/dp/{}?tag=t-20", marketplace_id),
            rating: Some(4.2),
            reviews_count: Some(321),
            category: Some("Gadgets".to_string()),
            fetched_at: datetime!(2025-06-15 09:00:00 UTC),
        }
    }

    async fn started_run(ledger: &SqliteLedger, started_at: OffsetDateTime) -> Run {
        let run = Run::started("default", RunTrigger::Manual, started_at);
        let begun = ledger
            .begin_run(&run, started_at - Duration::minutes(30))
            .await
            .unwrap();
        assert!(begun);
        run
    }

    async fn pending_post(
        ledger: &SqliteLedger,
        run: &Run,
        marketplace_id: &str,
        scheduled_at: OffsetDateTime,
    ) -> Post {
        let product = ledger
            .upsert_product(&sample_product(marketplace_id, "Widget"))
            .await
            .unwrap();
        let post = Post::pending(
            run.id,
            &product,
            Platform::Instagram,
            "caption".to_string(),
            scheduled_at,
        );
        ledger.create_post(&post).await.unwrap();
        post
    }

    #[tokio::test]
    async fn test_upsert_product_keeps_internal_id() {
        let ledger = ledger().await;

        let first = ledger
            .upsert_product(&sample_product("B0ABCD1234", "Old Title"))
            .await
            .unwrap();

        let mut refreshed = sample_product("B0ABCD1234", "New Title");
        refreshed.price = Some("$24.99".to_string());
        let second = ledger.upsert_product(&refreshed).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.title, "New Title");
        assert_eq!(second.price.as_deref(), Some("$24.99"));
        assert_eq!(ledger.count_products().await.unwrap(), 1);

        let listed = ledger.list_products(10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "New Title");
    }

    #[tokio::test]
    async fn test_post_transitions_are_idempotent_and_guarded() {
        let ledger = ledger().await;
        let run = started_run(&ledger, datetime!(2025-06-15 10:00:00 UTC)).await;
        let post = pending_post(&ledger, &run, "B0ABCD1234", datetime!(2025-06-15 10:00:05 UTC))
            .await;

        let outcome = PostOutcome::Posted {
            posted_at: datetime!(2025-06-15 10:00:07 UTC),
            platform_post_id: "ig-1".to_string(),
        };
        ledger.transition_post(post.id, &outcome).await.unwrap();

        let posts = ledger.list_posts(10).await.unwrap();
        let stored = &posts[0];
        assert_eq!(stored.status, PostStatus::Posted);
        assert_eq!(stored.platform_post_id.as_deref(), Some("ig-1"));
        assert_eq!(
            stored.posted_at,
            Some(datetime!(2025-06-15 10:00:07 UTC))
        );

        // Repeating the same outcome is a no-op.
        ledger.transition_post(post.id, &outcome).await.unwrap();

        // A conflicting outcome is refused.
        let conflicting = PostOutcome::Failed {
            error_message: "late failure".to_string(),
        };
        let result = ledger.transition_post(post.id, &conflicting).await;
        assert!(matches!(
            result,
            Err(LedgerError::InvalidTransition {
                current: PostStatus::Posted,
                ..
            })
        ));

        // Unknown posts are not found.
        let result = ledger.transition_post(Uuid::new_v4(), &conflicting).await;
        assert!(matches!(result, Err(LedgerError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_begin_run_refuses_concurrent_but_ignores_stale() {
        let ledger = ledger().await;
        let now = datetime!(2025-06-15 10:00:00 UTC);

        let first = Run::started("default", RunTrigger::Interval, now);
        assert!(
            ledger
                .begin_run(&first, now - Duration::minutes(30))
                .await
                .unwrap()
        );

        // Second attempt while the first is fresh is refused.
        let second = Run::started("default", RunTrigger::Manual, now);
        assert!(
            !ledger
                .begin_run(&second, now - Duration::minutes(30))
                .await
                .unwrap()
        );

        // An hour later the first row is stale and no longer blocks.
        let later = now + Duration::hours(1);
        let third = Run::started("default", RunTrigger::Interval, later);
        assert!(
            ledger
                .begin_run(&third, later - Duration::minutes(30))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_window_queries_use_half_open_ranges() {
        let ledger = ledger().await;
        let run = started_run(&ledger, datetime!(2025-06-15 00:10:00 UTC)).await;

        pending_post(&ledger, &run, "B000000001", datetime!(2025-06-14 23:59:59 UTC)).await;
        pending_post(&ledger, &run, "B000000002", datetime!(2025-06-15 00:00:00 UTC)).await;
        pending_post(&ledger, &run, "B000000003", datetime!(2025-06-15 12:00:00 UTC)).await;
        pending_post(&ledger, &run, "B000000004", datetime!(2025-06-16 00:00:00 UTC)).await;

        let from = datetime!(2025-06-15 00:00:00 UTC);
        let to = datetime!(2025-06-16 00:00:00 UTC);

        assert_eq!(ledger.count_posts_between(from, to).await.unwrap(), 2);

        let window = ledger.posts_scheduled_between(from, to).await.unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].marketplace_id, "B000000002");
        assert_eq!(window[1].marketplace_id, "B000000003");

        // Newest first for the console view.
        let listed = ledger.list_posts(10).await.unwrap();
        assert_eq!(listed[0].marketplace_id, "B000000004");
    }

    #[tokio::test]
    async fn test_posted_ids_exclude_failed_and_old_posts() {
        let ledger = ledger().await;
        let run = started_run(&ledger, datetime!(2025-06-15 10:00:00 UTC)).await;

        let fresh = pending_post(&ledger, &run, "B0FRESH001", datetime!(2025-06-15 10:00:01 UTC))
            .await;
        let failed = pending_post(&ledger, &run, "B0FAILED01", datetime!(2025-06-15 10:00:02 UTC))
            .await;
        let old = pending_post(&ledger, &run, "B0OLD00001", datetime!(2025-06-10 10:00:00 UTC))
            .await;

        ledger
            .transition_post(
                fresh.id,
                &PostOutcome::Posted {
                    posted_at: datetime!(2025-06-15 10:00:03 UTC),
                    platform_post_id: "ig-1".to_string(),
                },
            )
            .await
            .unwrap();
        ledger
            .transition_post(
                failed.id,
                &PostOutcome::Failed {
                    error_message: "rejected".to_string(),
                },
            )
            .await
            .unwrap();
        ledger
            .transition_post(
                old.id,
                &PostOutcome::Posted {
                    posted_at: datetime!(2025-06-10 10:00:01 UTC),
                    platform_post_id: "ig-0".to_string(),
                },
            )
            .await
            .unwrap();

        let since = datetime!(2025-06-12 10:00:00 UTC);
        let posted = ledger.posted_marketplace_ids_since(since).await.unwrap();

        assert!(posted.contains("B0FRESH001"));
        assert!(!posted.contains("B0FAILED01"));
        assert!(!posted.contains("B0OLD00001"));
    }

    #[tokio::test]
    async fn test_recover_stale_runs_fails_runs_and_orphaned_posts() {
        let ledger = ledger().await;
        let crashed_at = datetime!(2025-06-15 08:00:00 UTC);
        let run = started_run(&ledger, crashed_at).await;
        let orphan = pending_post(&ledger, &run, "B0ORPHAN01", crashed_at).await;

        let cutoff = datetime!(2025-06-15 09:30:00 UTC);
        let recovered = ledger.recover_stale_runs(cutoff).await.unwrap();
        assert_eq!(recovered, 1);

        let runs = ledger.list_runs(10).await.unwrap();
        assert_eq!(runs[0].status, RunStatus::Failed);
        assert_eq!(
            runs[0].error_message.as_deref(),
            Some("abandoned by crashed process")
        );

        let posts = ledger.list_posts(10).await.unwrap();
        let recovered_post = posts.iter().find(|p| p.id == orphan.id).unwrap();
        assert_eq!(recovered_post.status, PostStatus::Failed);
        assert_eq!(
            recovered_post.error_message.as_deref(),
            Some("run abandoned before completion")
        );

        // Recovery is idempotent.
        assert_eq!(ledger.recover_stale_runs(cutoff).await.unwrap(), 0);

        // A recovered admin can start a fresh run immediately.
        let now = datetime!(2025-06-15 10:00:00 UTC);
        let next = Run::started("default", RunTrigger::Interval, now);
        assert!(
            ledger
                .begin_run(&next, now - Duration::minutes(30))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_post_totals_and_run_lifecycle() {
        let ledger = ledger().await;
        let run = started_run(&ledger, datetime!(2025-06-15 10:00:00 UTC)).await;

        let posted = pending_post(&ledger, &run, "B000000001", datetime!(2025-06-15 10:00:01 UTC))
            .await;
        let failed = pending_post(&ledger, &run, "B000000002", datetime!(2025-06-15 10:00:02 UTC))
            .await;
        pending_post(&ledger, &run, "B000000003", datetime!(2025-06-15 10:00:03 UTC)).await;

        ledger
            .transition_post(
                posted.id,
                &PostOutcome::Posted {
                    posted_at: datetime!(2025-06-15 10:00:04 UTC),
                    platform_post_id: "ig-1".to_string(),
                },
            )
            .await
            .unwrap();
        ledger
            .transition_post(
                failed.id,
                &PostOutcome::Failed {
                    error_message: "boom".to_string(),
                },
            )
            .await
            .unwrap();

        let totals = ledger.post_totals().await.unwrap();
        assert_eq!(totals.total, 3);
        assert_eq!(totals.posted, 1);
        assert_eq!(totals.failed, 1);
        assert_eq!(totals.pending, 1);
        assert_eq!(totals.instagram, 3);

        ledger
            .complete_run(run.id, datetime!(2025-06-15 10:01:00 UTC), 3)
            .await
            .unwrap();

        let runs = ledger.list_runs(10).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, RunStatus::Completed);
        assert_eq!(runs[0].posts_created, 3);
        assert_eq!(
            runs[0].finished_at,
            Some(datetime!(2025-06-15 10:01:00 UTC))
        );

        let missing = ledger
            .complete_run(Uuid::new_v4(), datetime!(2025-06-15 10:01:00 UTC), 0)
            .await;
        assert!(matches!(missing, Err(LedgerError::NotFound(_))));
    }
}
