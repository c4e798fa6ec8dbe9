//! User-facing error message formatting.
//!
//! Uses typed error matching (DashboardError / WarehouseError / PolarsError
//! variants) rather than string parsing.

use crate::error::{DashboardError, WarehouseError};
use polars::prelude::PolarsError;

/// Format a render failure as the single message shown to the user.
pub fn user_message(err: &DashboardError) -> String {
    match err {
        DashboardError::Warehouse(w) => user_message_from_warehouse(w),
        DashboardError::Frame(pe) => user_message_from_polars(pe),
        DashboardError::EmptySelection(_)
        | DashboardError::UnknownSelection(_)
        | DashboardError::MissingColumn { .. } => err.to_string(),
    }
}

pub fn user_message_from_warehouse(err: &WarehouseError) -> String {
    match err {
        WarehouseError::Connectivity { reason } => format!(
            "This dashboard requires internet access. Connection error: {}",
            reason
        ),
        WarehouseError::Service { status, message } => match status {
            401 | 403 => format!(
                "The warehouse rejected the credentials ({}). Check the access token. {}",
                status, message
            ),
            404 => format!("Table or project not found: {}", message),
            _ => format!("Query failed ({}): {}", status, message),
        },
        WarehouseError::Decode(msg) => format!("Unexpected response from the warehouse: {}", msg),
        WarehouseError::Frame(pe) => user_message_from_polars(pe),
    }
}

/// Format a PolarsError as a user-facing message by matching on its variant.
pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!(
            "Column not found: {}. The query result may have changed shape.",
            msg
        ),
        PE::Duplicate(msg) => format!("Duplicate column in result: {}", msg),
        PE::NoData(msg) => format!("No data: {}", msg),
        PE::SchemaMismatch(msg) => format!("Schema mismatch: {}", msg),
        PE::ShapeMismatch(msg) => format!("Row shape mismatch: {}", msg),
        PE::InvalidOperation(msg) => format!("Operation not allowed: {}", msg),
        PE::ComputeError(msg) => format!("Could not reshape the result: {}", msg),
        PE::Context { error, msg } => {
            let inner = user_message_from_polars(error);
            format!("{}: {}", msg, inner)
        }
        #[allow(unreachable_patterns)]
        _ => err.to_string(),
    }
}
