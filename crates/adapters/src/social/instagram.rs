//! Instagram Graph API publisher
//!
//! Publishing is the Graph API's two-step dance: create a media container
//! for the image, then publish the container. Both calls are form-encoded
//! POSTs authenticated by the access token in the body.

use async_trait::async_trait;
use autopromo_domain::{Platform, PlatformCredentials, PostContent, PublishError, Publisher};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::time::Duration;

const GRAPH_API_VERSION: &str = "v18.0";

/// Publisher for Instagram business accounts via the Graph API
pub struct InstagramPublisher {
    client: Client,
    base_url: String,
}

impl InstagramPublisher {
    pub fn new() -> Self {
        Self::with_base_url("https://graph.facebook.com".to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self { client, base_url }
    }
}

impl Default for InstagramPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct GraphObjectResponse {
    id: String,
}

async fn read_graph_response(
    response: reqwest::Response,
) -> Result<GraphObjectResponse, PublishError> {
    if response.status() == 401 || response.status() == 403 {
        return Err(PublishError::Auth(
            "Invalid Instagram access token".to_string(),
        ));
    }

    if response.status() == 429 {
        return Err(PublishError::RateLimited);
    }

    if !response.status().is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(PublishError::Api(format!("Graph API error: {}", body)));
    }

    response
        .json()
        .await
        .map_err(|e| PublishError::Api(e.to_string()))
}

#[async_trait]
impl Publisher for InstagramPublisher {
    async fn publish(
        &self,
        credentials: &PlatformCredentials,
        content: &PostContent,
    ) -> Result<String, PublishError> {
        let PlatformCredentials::Instagram(credentials) = credentials else {
            return Err(PublishError::ConfigMissing("instagram".to_string()));
        };

        let Some(image_url) = content.image_url.as_deref() else {
            return Err(PublishError::InvalidContent(
                "Instagram requires a product image".to_string(),
            ));
        };

        // Step 1: create the media container
        let container_url = format!(
            "{}/{}/{}/media",
            self.base_url, GRAPH_API_VERSION, credentials.user_id
        );

        let response = self
            .client
            .post(&container_url)
            .form(&[
                ("image_url", image_url),
                ("caption", content.caption.as_str()),
                ("access_token", credentials.access_token.expose_secret()),
            ])
            .send()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        let container = read_graph_response(response).await?;

        // Step 2: publish the container
        let publish_url = format!(
            "{}/{}/{}/media_publish",
            self.base_url, GRAPH_API_VERSION, credentials.user_id
        );

        let response = self
            .client
            .post(&publish_url)
            .form(&[
                ("creation_id", container.id.as_str()),
                ("access_token", credentials.access_token.expose_secret()),
            ])
            .send()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        let published = read_graph_response(response).await?;

        tracing::info!(post_id = %published.id, title = %content.title, "Published to Instagram");

        Ok(published.id)
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn platform(&self) -> Platform {
        Platform::Instagram
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autopromo_domain::InstagramCredentials;
    use secrecy::SecretString;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn instagram_credentials() -> PlatformCredentials {
        PlatformCredentials::Instagram(InstagramCredentials {
            access_token: SecretString::new("ig-token".into()),
            user_id: "17890001".to_string(),
        })
    }

    fn sample_content() -> PostContent {
        PostContent {
            caption: "Wireless Earbuds\n\nShop now: https://example.com/dp/B0A?tag=t-20\n\n#ad"
                .to_string(),
            image_url: Some("https://img.example.com/earbuds.jpg".to_string()),
            link: "https://example.com/dp/B0A?tag=t-20".to_string(),
            title: "Wireless Earbuds".to_string(),
        }
    }

    #[tokio::test]
    async fn test_publish_two_step_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v18.0/17890001/media"))
            .and(body_string_contains("access_token=ig-token"))
            .and(body_string_contains("image_url="))
            .and(body_string_contains("caption="))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "container-42"})),
            )
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v18.0/17890001/media_publish"))
            .and(body_string_contains("creation_id=container-42"))
            .and(body_string_contains("access_token=ig-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "ig-post-9"})),
            )
            .mount(&mock_server)
            .await;

        let publisher = InstagramPublisher::with_base_url(mock_server.uri());

        let post_id = publisher
            .publish(&instagram_credentials(), &sample_content())
            .await
            .unwrap();

        assert_eq!(post_id, "ig-post-9");
    }

    #[tokio::test]
    async fn test_publish_requires_an_image() {
        let publisher = InstagramPublisher::with_base_url("http://unused.invalid".to_string());

        let content = PostContent {
            image_url: None,
            ..sample_content()
        };

        let result = publisher.publish(&instagram_credentials(), &content).await;

        assert!(matches!(result, Err(PublishError::InvalidContent(_))));
    }

    #[tokio::test]
    async fn test_publish_rejects_wrong_credential_kind() {
        let publisher = InstagramPublisher::with_base_url("http://unused.invalid".to_string());

        let credentials =
            PlatformCredentials::Facebook(autopromo_domain::FacebookCredentials {
                access_token: SecretString::new("fb-token".into()),
                page_id: "123".to_string(),
            });

        let result = publisher.publish(&credentials, &sample_content()).await;

        assert!(matches!(result, Err(PublishError::ConfigMissing(_))));
    }

    #[tokio::test]
    async fn test_publish_auth_error_on_container_step() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v18.0/17890001/media"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let publisher = InstagramPublisher::with_base_url(mock_server.uri());

        let result = publisher
            .publish(&instagram_credentials(), &sample_content())
            .await;

        assert!(matches!(result, Err(PublishError::Auth(_))));
    }

    #[tokio::test]
    async fn test_publish_rate_limited() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v18.0/17890001/media"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let publisher = InstagramPublisher::with_base_url(mock_server.uri());

        let result = publisher
            .publish(&instagram_credentials(), &sample_content())
            .await;

        assert!(matches!(result, Err(PublishError::RateLimited)));
    }

    #[tokio::test]
    async fn test_publish_surfaces_publish_step_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v18.0/17890001/media"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "container-42"})),
            )
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v18.0/17890001/media_publish"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string(r#"{"error":{"message":"Media expired"}}"#),
            )
            .mount(&mock_server)
            .await;

        let publisher = InstagramPublisher::with_base_url(mock_server.uri());

        let result = publisher
            .publish(&instagram_credentials(), &sample_content())
            .await;

        match result {
            Err(PublishError::Api(message)) => assert!(message.contains("Media expired")),
            other => panic!("expected API error, got {:?}", other),
        }
    }
}
