//! SQLite-backed store for per-admin scheduler and integration settings
//!
//! List fields are stored as JSON arrays of plain strings; secrets are
//! exposed only at this boundary and land in ordinary TEXT columns.

use async_trait::async_trait;
use autopromo_domain::{
    ConfigStore, ConfigStoreError, FacebookCredentials, InstagramCredentials, IntegrationConfig,
    MarketplaceCredentials, PinterestCredentials, Platform, SchedulerConfig, format_post_time,
    parse_post_time,
};
use secrecy::{ExposeSecret, SecretString};
use sqlx::SqlitePool;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Config store implementation sharing the adapter pool
pub struct SqliteConfigStore {
    pool: SqlitePool,
}

impl SqliteConfigStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn now_string() -> Result<String, ConfigStoreError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|e| ConfigStoreError::Serialization(e.to_string()))
}

#[async_trait]
impl ConfigStore for SqliteConfigStore {
    async fn scheduler_config(&self, admin_id: &str) -> Result<SchedulerConfig, ConfigStoreError> {
        let row: Option<(bool, i64, String, String)> = sqlx::query_as(
            r#"
            SELECT is_active, posts_per_day, post_times, platforms
            FROM scheduler_configs WHERE admin_id = ?
            "#,
        )
        .bind(admin_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ConfigStoreError::Database(e.to_string()))?;

        let Some((is_active, posts_per_day, post_times, platforms)) = row else {
            return Ok(SchedulerConfig::default());
        };

        let post_times: Vec<String> = serde_json::from_str(&post_times)
            .map_err(|e| ConfigStoreError::Serialization(e.to_string()))?;
        let post_times = post_times
            .iter()
            .map(|s| {
                parse_post_time(s).ok_or_else(|| {
                    ConfigStoreError::Serialization(format!("Invalid post time: {}", s))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let platforms: Vec<String> = serde_json::from_str(&platforms)
            .map_err(|e| ConfigStoreError::Serialization(e.to_string()))?;
        let platforms = platforms
            .iter()
            .map(|s| {
                Platform::parse(s).ok_or_else(|| {
                    ConfigStoreError::Serialization(format!("Unknown platform: {}", s))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SchedulerConfig {
            is_active,
            posts_per_day: posts_per_day as u32,
            post_times,
            platforms,
        })
    }

    async fn update_scheduler_config(
        &self,
        admin_id: &str,
        config: &SchedulerConfig,
    ) -> Result<(), ConfigStoreError> {
        let post_times: Vec<String> = config
            .post_times
            .iter()
            .copied()
            .map(format_post_time)
            .collect();
        let post_times = serde_json::to_string(&post_times)
            .map_err(|e| ConfigStoreError::Serialization(e.to_string()))?;

        let platforms: Vec<&str> = config.platforms.iter().map(|p| p.as_str()).collect();
        let platforms = serde_json::to_string(&platforms)
            .map_err(|e| ConfigStoreError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO scheduler_configs (admin_id, is_active, posts_per_day, post_times, platforms, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(admin_id) DO UPDATE SET
                is_active = excluded.is_active,
                posts_per_day = excluded.posts_per_day,
                post_times = excluded.post_times,
                platforms = excluded.platforms,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(admin_id)
        .bind(config.is_active)
        .bind(config.posts_per_day as i64)
        .bind(&post_times)
        .bind(&platforms)
        .bind(&now_string()?)
        .execute(&self.pool)
        .await
        .map_err(|e| ConfigStoreError::Database(e.to_string()))?;

        Ok(())
    }

    async fn integration_config(
        &self,
        admin_id: &str,
    ) -> Result<IntegrationConfig, ConfigStoreError> {
        #[allow(clippy::type_complexity)]
        let row: Option<(
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
        )> = sqlx::query_as(
            r#"
            SELECT rapidapi_key, rapidapi_host, affiliate_tag,
                   instagram_access_token, instagram_user_id,
                   facebook_access_token, facebook_page_id,
                   pinterest_access_token, pinterest_board_id
            FROM integration_configs WHERE admin_id = ?
            "#,
        )
        .bind(admin_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ConfigStoreError::Database(e.to_string()))?;

        let Some((
            rapidapi_key,
            rapidapi_host,
            affiliate_tag,
            instagram_token,
            instagram_user_id,
            facebook_token,
            facebook_page_id,
            pinterest_token,
            pinterest_board_id,
        )) = row
        else {
            return Ok(IntegrationConfig::default());
        };

        let marketplace = rapidapi_key.map(|key| MarketplaceCredentials {
            api_key: SecretString::new(key.into()),
            api_host: rapidapi_host
                .unwrap_or_else(|| MarketplaceCredentials::DEFAULT_HOST.to_string()),
            affiliate_tag,
        });

        let instagram = match (instagram_token, instagram_user_id) {
            (Some(access_token), Some(user_id)) => Some(InstagramCredentials {
                access_token: SecretString::new(access_token.into()),
                user_id,
            }),
            _ => None,
        };

        let facebook = match (facebook_token, facebook_page_id) {
            (Some(access_token), Some(page_id)) => Some(FacebookCredentials {
                access_token: SecretString::new(access_token.into()),
                page_id,
            }),
            _ => None,
        };

        let pinterest = match (pinterest_token, pinterest_board_id) {
            (Some(access_token), Some(board_id)) => Some(PinterestCredentials {
                access_token: SecretString::new(access_token.into()),
                board_id,
            }),
            _ => None,
        };

        Ok(IntegrationConfig {
            marketplace,
            instagram,
            facebook,
            pinterest,
        })
    }

    async fn update_integration_config(
        &self,
        admin_id: &str,
        config: &IntegrationConfig,
    ) -> Result<(), ConfigStoreError> {
        let marketplace = config.marketplace.as_ref();
        let instagram = config.instagram.as_ref();
        let facebook = config.facebook.as_ref();
        let pinterest = config.pinterest.as_ref();

        sqlx::query(
            r#"
            INSERT INTO integration_configs (
                admin_id, rapidapi_key, rapidapi_host, affiliate_tag,
                instagram_access_token, instagram_user_id,
                facebook_access_token, facebook_page_id,
                pinterest_access_token, pinterest_board_id, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(admin_id) DO UPDATE SET
                rapidapi_key = excluded.rapidapi_key,
                rapidapi_host = excluded.rapidapi_host,
                affiliate_tag = excluded.affiliate_tag,
                instagram_access_token = excluded.instagram_access_token,
                instagram_user_id = excluded.instagram_user_id,
                facebook_access_token = excluded.facebook_access_token,
                facebook_page_id = excluded.facebook_page_id,
                pinterest_access_token = excluded.pinterest_access_token,
                pinterest_board_id = excluded.pinterest_board_id,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(admin_id)
        .bind(marketplace.map(|m| m.api_key.expose_secret().to_string()))
        .bind(marketplace.map(|m| m.api_host.clone()))
        .bind(marketplace.and_then(|m| m.affiliate_tag.clone()))
        .bind(instagram.map(|i| i.access_token.expose_secret().to_string()))
        .bind(instagram.map(|i| i.user_id.clone()))
        .bind(facebook.map(|f| f.access_token.expose_secret().to_string()))
        .bind(facebook.map(|f| f.page_id.clone()))
        .bind(pinterest.map(|p| p.access_token.expose_secret().to_string()))
        .bind(pinterest.map(|p| p.board_id.clone()))
        .bind(&now_string()?)
        .execute(&self.pool)
        .await
        .map_err(|e| ConfigStoreError::Database(e.to_string()))?;

        Ok(())
    }
}
