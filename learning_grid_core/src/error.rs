use std::time::Duration;

use crate::{ResourceId, catalog::CatalogError, config::ConfigError, grid::GridError};

/// Errors surfaced by session commands.
///
/// None of these are fatal: a failed command leaves the session unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    InvalidPosition(#[from] GridError),
    #[error("Resource '{0}' is not in the catalog")]
    UnknownResource(ResourceId),
    #[error("Route '{0}' does not exist")]
    UnknownRoute(String),
    #[error("Summary request timed out after {0:?}")]
    SummaryTimedOut(Duration),
    #[error("A reflection needs both a summary and a reflection text")]
    EmptyReflection,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
