use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::OrderError;

#[derive(Debug, Error)]
pub enum DiagramError {
    #[error("Diagram is already initialized")]
    AlreadyInitialized,
    #[error("Diagram is not initialized; call init first")]
    NotInitialized,
    #[error("History percentage must be a finite number, got {0}")]
    InvalidHistoryPercentage(f64),
    #[error("Order rejected: {0}")]
    Order(#[from] OrderError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
