//! Persistence port for ObservationResult (C5).

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::error::DatabaseError;
use crate::domain::models::ObservationResult;

#[async_trait]
pub trait ObservationRepository: Send + Sync {
    async fn insert(&self, result: &ObservationResult) -> Result<(), DatabaseError>;

    /// Most recent observation for a product, if any (§4.4 step 1).
    async fn latest_for_product(&self, product_id: Uuid) -> Result<Option<ObservationResult>, DatabaseError>;

    /// Observations for a product within the trailing `days`, used by the
    /// Priority Scorer's volatility factor (§4.1).
    async fn recent_for_product(&self, product_id: Uuid, days: u32) -> Result<Vec<ObservationResult>, DatabaseError>;
}
