//! Pinterest board publisher (not yet implemented)

use async_trait::async_trait;
use autopromo_domain::{Platform, PlatformCredentials, PostContent, PublishError, Publisher};

/// Placeholder publisher so Pinterest targets are skipped, not errored
#[derive(Debug, Default)]
pub struct PinterestPublisher;

impl PinterestPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Publisher for PinterestPublisher {
    async fn publish(
        &self,
        _credentials: &PlatformCredentials,
        _content: &PostContent,
    ) -> Result<String, PublishError> {
        Err(PublishError::ConfigMissing(
            "Pinterest publishing is not yet supported".to_string(),
        ))
    }

    fn is_enabled(&self) -> bool {
        false
    }

    fn platform(&self) -> Platform {
        Platform::Pinterest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_pinterest_and_disabled() {
        let publisher = PinterestPublisher::new();

        assert!(!publisher.is_enabled());
        assert_eq!(publisher.platform(), Platform::Pinterest);
    }
}
