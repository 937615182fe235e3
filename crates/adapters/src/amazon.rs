//! RapidAPI Amazon adapter for fetching promotable products

use async_trait::async_trait;
use autopromo_domain::{FetchQuery, MarketplaceCredentials, Product, ProductSource, SourceError};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

/// Product source backed by a RapidAPI Amazon data provider.
///
/// The host lives in the credentials so different RapidAPI providers with
/// the same `product-search` shape can be swapped without a code change.
pub struct RapidApiProductSource {
    client: Client,
    base_url: Option<String>,
}

impl RapidApiProductSource {
    pub fn new() -> Self {
        Self::with_base_url(None)
    }

    /// Override the request base URL (for tests); `None` derives it from
    /// the credential host
    pub fn with_base_url(base_url: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self { client, base_url }
    }
}

impl Default for RapidApiProductSource {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    results: Option<Vec<SearchItem>>,
}

#[derive(Deserialize)]
struct SearchItem {
    #[serde(default)]
    asin: String,
    #[serde(default)]
    title: String,
    description: Option<String>,
    price: Option<PriceField>,
    image: Option<String>,
    #[serde(default)]
    url: String,
    rating: Option<f64>,
    reviews_count: Option<i64>,
    category: Option<String>,
}

#[derive(Deserialize)]
struct PriceField {
    raw: Option<String>,
}

#[async_trait]
impl ProductSource for RapidApiProductSource {
    async fn fetch_products(
        &self,
        credentials: &MarketplaceCredentials,
        query: &FetchQuery,
    ) -> Result<Vec<Product>, SourceError> {
        let base = match &self.base_url {
            Some(base) => base.clone(),
            None => format!("https://{}", credentials.api_host),
        };
        let url = format!("{}/product-search", base);

        tracing::info!(query = %query.query, "Fetching products from marketplace");

        let mut request = self
            .client
            .get(&url)
            .header("X-RapidAPI-Key", credentials.api_key.expose_secret())
            .header("X-RapidAPI-Host", &credentials.api_host)
            .query(&[("query", query.query.as_str()), ("page", "1")]);

        if let Some(category) = &query.category {
            request = request.query(&[("category", category.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        if response.status() == 401 || response.status() == 403 {
            return Err(SourceError::Auth("Invalid RapidAPI key".to_string()));
        }

        if response.status() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(SourceError::RateLimited(retry_after));
        }

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Api(format!(
                "Product search failed: {}",
                body
            )));
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Api(e.to_string()))?;

        let fetched_at = OffsetDateTime::now_utc();
        let products: Vec<Product> = search
            .results
            .unwrap_or_default()
            .into_iter()
            .filter(|item| !item.asin.is_empty())
            .take(query.page_size)
            .map(|item| {
                let affiliate_url = match credentials.affiliate_tag.as_deref() {
                    Some(tag) if !tag.is_empty() => format!("{}?tag={}", item.url, tag),
                    _ => item.url.clone(),
                };

                Product {
                    id: Uuid::new_v4(),
                    marketplace_id: item.asin,
                    title: item.title,
                    description: item.description.filter(|d| !d.is_empty()),
                    price: item.price.and_then(|p| p.raw).filter(|p| !p.is_empty()),
                    image_url: item.image.filter(|i| !i.is_empty()),
                    product_url: item.url,
                    affiliate_url,
                    rating: item.rating,
                    reviews_count: item.reviews_count,
                    category: item.category.filter(|c| !c.is_empty()),
                    fetched_at,
                }
            })
            .collect();

        tracing::info!(count = products.len(), "Fetched products");

        Ok(products)
    }
}
