//! Infrastructure layer
//!
//! Cross-cutting concerns that sit outside the domain/services/adapters
//! hexagon: configuration loading and structured logging.

pub mod config;
pub mod logging;
