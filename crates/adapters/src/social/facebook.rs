//! Facebook page publisher (not yet implemented)

use async_trait::async_trait;
use autopromo_domain::{Platform, PlatformCredentials, PostContent, PublishError, Publisher};

/// Placeholder publisher so Facebook targets are skipped, not errored
#[derive(Debug, Default)]
pub struct FacebookPublisher;

impl FacebookPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Publisher for FacebookPublisher {
    async fn publish(
        &self,
        _credentials: &PlatformCredentials,
        _content: &PostContent,
    ) -> Result<String, PublishError> {
        Err(PublishError::ConfigMissing(
            "Facebook publishing is not yet supported".to_string(),
        ))
    }

    fn is_enabled(&self) -> bool {
        false
    }

    fn platform(&self) -> Platform {
        Platform::Facebook
    }
}
