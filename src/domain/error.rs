//! Domain error types for the price-monitoring core.
//!
//! Each enum maps onto the error taxonomy of §7/§11: every variant knows
//! whether it is transient (worth retrying) or permanent, via
//! `is_transient()`/`is_permanent()` const-fn classifiers.

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the Scheduler (C3).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("monitoring config not found for product: {0}")]
    ConfigNotFound(Uuid),
    #[error("concurrent update to monitoring config {0} detected, retry")]
    ConcurrentUpdate(Uuid),
    #[error("invalid priority score: {0}, must be in [1, 10]")]
    InvalidPriorityScore(u8),
}

impl SchedulerError {
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::ConcurrentUpdate(_))
    }
}

/// Errors raised by the Queue Dispatcher & Worker Pool (C4).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no extractor registered for retailer: {0}")]
    NoExtractorForRetailer(String),
    #[error("retailer concurrency ceiling reached: {0}")]
    RetailerCeilingReached(String),
    #[error("extractor call timed out after {0}s")]
    ExtractorTimeout(u64),
    #[error("extractor returned server error: {0}")]
    ExtractorServerError(String),
    #[error("extractor returned invalid or missing price")]
    SemanticExtractFailure,
    #[error("task hard deadline exceeded")]
    HardDeadlineExceeded,
}

impl DispatchError {
    /// Transient: network timeout, extractor 5xx (§7).
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::ExtractorTimeout(_) | Self::ExtractorServerError(_))
    }

    /// Semantic/fatal: terminal for the task, no retry (§7).
    pub const fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::NoExtractorForRetailer(_) | Self::SemanticExtractFailure | Self::HardDeadlineExceeded
        )
    }
}

/// Errors raised by the Result Analyzer (C5).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyzerError {
    #[error("negative time differential in observation timestamps")]
    InvalidInput,
    #[error("per-product exclusion could not be acquired for {0}")]
    ExclusionUnavailable(Uuid),
}

/// Errors raised by the Alert Rule Engine (C6).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlertRuleError {
    #[error("rule {0} references an unknown event field")]
    UnknownField(String),
}

/// Errors raised by the Notification Pipeline (C7).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    #[error("channel adapter not registered: {0:?}")]
    ChannelNotRegistered(String),
    #[error("channel adapter send failed: {0}")]
    SendFailed(String),
    #[error("delivery exhausted max retry attempts")]
    MaxAttemptsExceeded,
}

impl NotificationError {
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::SendFailed(_))
    }
}

/// Errors related to database operations. Structurally unchanged from the
/// persistence layer's original shape (§12).
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Migration failed: {0}")]
    MigrationFailed(String),
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("Row not found")]
    RowNotFound,
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl DatabaseError {
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionFailed(_) | Self::TransactionFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_error_transient_vs_permanent() {
        assert!(DispatchError::ExtractorTimeout(30).is_transient());
        assert!(!DispatchError::ExtractorTimeout(30).is_permanent());
        assert!(DispatchError::SemanticExtractFailure.is_permanent());
        assert!(!DispatchError::SemanticExtractFailure.is_transient());
    }

    #[test]
    fn scheduler_error_concurrent_update_is_transient() {
        let id = Uuid::new_v4();
        assert!(SchedulerError::ConcurrentUpdate(id).is_transient());
        assert!(!SchedulerError::ConfigNotFound(id).is_transient());
    }

    #[test]
    fn database_error_is_transient() {
        assert!(DatabaseError::ConnectionFailed("timeout".into()).is_transient());
        assert!(!DatabaseError::ConstraintViolation("unique".into()).is_transient());
    }
}
