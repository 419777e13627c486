//! Extractor interface: the pluggable retailer-specific scraping leaf (§6, §9).

use async_trait::async_trait;

use crate::domain::error::DispatchError;
use crate::domain::models::ObservationPayload;

/// A single retailer's extraction leaf. The core never needs to know the
/// retailer beyond routing by host (§9 "Multiple Class Hierarchies for
/// Extractors").
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<ObservationPayload, DispatchError>;
}

/// Maps a product's URL host to the extractor responsible for it.
pub trait ExtractorRegistry: Send + Sync {
    fn resolve(&self, host: &str) -> Option<std::sync::Arc<dyn Extractor>>;
}
