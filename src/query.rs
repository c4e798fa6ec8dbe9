//! Fixed query templates and the query runner.
//!
//! No user input is ever interpolated into SQL: selections are applied after
//! retrieval, in memory (see `filter`).

use std::time::Instant;

use polars::prelude::DataFrame;

use crate::error::{DashboardError, WarehouseError};
use crate::warehouse::WarehouseClient;

/// A named, fixed SQL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryTemplate {
    pub name: &'static str,
    pub sql: &'static str,
}

/// Long-form incident counts per district and year (source of the district pivot).
pub const DISTRICT_YEAR_COUNTS: QueryTemplate = QueryTemplate {
    name: "district_year_counts",
    sql: "SELECT pddistrict, year, crime_count FROM `clouddatamining.crimecount`",
};

/// District series for the area chart.
pub const DISTRICT_YEAR_SERIES: QueryTemplate = QueryTemplate {
    name: "district_year_series",
    sql: "SELECT * FROM `clouddatamining.crimecount` WHERE year > 2006",
};

/// Long-form incident counts per category and month (source of the monthly pivot).
pub const CATEGORY_MONTH_COUNTS: QueryTemplate = QueryTemplate {
    name: "category_month_counts",
    sql: "SELECT category, month, crime_count FROM `clouddatamining.category_count_by_month`",
};

/// Category series for the line chart.
pub const CATEGORY_MONTH_SERIES: QueryTemplate = QueryTemplate {
    name: "category_month_series",
    sql: "SELECT * FROM `clouddatamining.category_count_by_month`",
};

/// Incident coordinates with their category.
pub const INCIDENT_LOCATIONS: QueryTemplate = QueryTemplate {
    name: "incident_locations",
    sql: "SELECT * FROM `clouddatamining.locationdata`",
};

/// Rows returned by one query execution. Immutable once built.
#[derive(Debug, Clone)]
pub struct QueryResult {
    frame: DataFrame,
}

impl QueryResult {
    pub fn new(frame: DataFrame) -> Self {
        Self { frame }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.column(name).is_ok()
    }
}

impl From<DataFrame> for QueryResult {
    fn from(frame: DataFrame) -> Self {
        Self::new(frame)
    }
}

/// Execute a template once. No retries: a failure is returned as-is.
pub fn run_query(
    warehouse: &dyn WarehouseClient,
    template: &QueryTemplate,
) -> Result<QueryResult, WarehouseError> {
    let started = Instant::now();
    match warehouse.query(template.sql) {
        Ok(result) => {
            tracing::debug!(
                query = template.name,
                rows = result.height(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "query finished"
            );
            Ok(result)
        }
        Err(e) => {
            tracing::warn!(query = template.name, error = %e, "query failed");
            Err(e)
        }
    }
}

/// Check that `result` carries every column the caller is about to reshape.
pub fn require_columns(
    template: &QueryTemplate,
    result: &QueryResult,
    columns: &[&str],
) -> Result<(), DashboardError> {
    for column in columns {
        if !result.has_column(column) {
            return Err(DashboardError::MissingColumn {
                query: template.name.to_string(),
                column: column.to_string(),
            });
        }
    }
    Ok(())
}
