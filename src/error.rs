//! Typed errors for the query / reshape / page pipeline.
//!
//! Application plumbing (config, terminal, export) uses `color_eyre::Result`;
//! everything a page render can fail with is one of these.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Failures raised while executing a query against the warehouse.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// The service could not be reached (DNS, refused, reset, timeout).
    #[error("connection error: {reason}")]
    Connectivity { reason: String },
    /// The service answered with an error status or a failed job.
    #[error("warehouse returned {status}: {message}")]
    Service { status: u16, message: String },
    /// The response body did not match the expected payload.
    #[error("could not decode warehouse response: {0}")]
    Decode(String),
    #[error(transparent)]
    Frame(#[from] PolarsError),
}

impl WarehouseError {
    pub fn connectivity(reason: impl Into<String>) -> Self {
        Self::Connectivity {
            reason: reason.into(),
        }
    }
}

/// Failures of a single page render cycle.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),
    /// Nothing selected; the noun names what should be selected ("district").
    #[error("Please select at least one {0}.")]
    EmptySelection(String),
    /// Selected keys that are not rows of the pivot table.
    #[error("Not in the table: {}", .0.join(", "))]
    UnknownSelection(Vec<String>),
    /// The query result lacks a column the page reshapes.
    #[error("Column '{column}' missing from result of query '{query}'")]
    MissingColumn { query: String, column: String },
    #[error(transparent)]
    Frame(#[from] PolarsError),
}

impl DashboardError {
    /// Underlying connectivity reason, if this is a network failure.
    pub fn connectivity_reason(&self) -> Option<&str> {
        match self {
            Self::Warehouse(WarehouseError::Connectivity { reason }) => Some(reason),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::EmptySelection(_) | Self::UnknownSelection(_))
    }
}
