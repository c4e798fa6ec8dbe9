//! Row filtering by selection and axis recasting for chart encodings.

use polars::prelude::*;

use crate::chart_data::YScale;
use crate::error::DashboardError;
use crate::query::QueryResult;
use crate::selection::Selection;

/// How the x column is interpreted by the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisKind {
    /// Values are points in time; labels parse as numbers ("2007")
    Temporal,
    /// Values are unordered names placed at evenly spaced positions
    Nominal,
}

/// Type change applied to the axis column before charting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AxisRecast {
    /// Cast to text (year 2007 → "2007")
    Text,
    /// Cast to text and plot in the given label order
    Ordered(Vec<String>),
    /// Leave the column as returned
    Keep,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mark {
    /// Filled area under each series; series overlap, never stack
    Area { opacity: f64 },
    Line,
}

/// Which columns feed the chart and how.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// Column matched against the selection
    pub category: String,
    pub axis: String,
    pub axis_kind: AxisKind,
    pub recast: AxisRecast,
    pub value: String,
    /// Column splitting rows into colored series
    pub color: Option<String>,
    pub mark: Mark,
    pub y_scale: YScale,
}

/// Chart encoding of a `FilteredSeries`, after recasting.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartEncoding {
    pub x: String,
    pub x_kind: AxisKind,
    pub y: String,
    pub color: Option<String>,
    /// Explicit x label order, when the axis has one
    pub sort: Option<Vec<String>>,
    pub mark: Mark,
    pub y_scale: YScale,
}

/// Query rows restricted to a selection, in their original order.
#[derive(Debug, Clone)]
pub struct FilteredSeries {
    frame: DataFrame,
    encoding: ChartEncoding,
}

impl FilteredSeries {
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn encoding(&self) -> &ChartEncoding {
        &self.encoding
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }
}

/// Keep the rows of `result` whose `projection.category` is in `selection`
/// and recast the axis column as the projection asks.
pub fn filter_project(
    result: &QueryResult,
    selection: &Selection,
    projection: &Projection,
) -> Result<FilteredSeries, DashboardError> {
    let source = result.frame();
    // Surface a missing value column here rather than at draw time
    source.column(&projection.value)?;

    let mut frame = filter_rows(result, &projection.category, selection)?;

    let sort = match &projection.recast {
        AxisRecast::Keep => None,
        AxisRecast::Text => {
            recast_to_text(&mut frame, &projection.axis)?;
            None
        }
        AxisRecast::Ordered(order) => {
            recast_to_text(&mut frame, &projection.axis)?;
            Some(order.clone())
        }
    };

    tracing::trace!(
        kept = frame.height(),
        of = source.height(),
        selected = selection.len(),
        "filtered {}",
        projection.category
    );

    Ok(FilteredSeries {
        frame,
        encoding: ChartEncoding {
            x: projection.axis.clone(),
            x_kind: projection.axis_kind,
            y: projection.value.clone(),
            color: projection.color.clone(),
            sort,
            mark: projection.mark,
            y_scale: projection.y_scale,
        },
    })
}

/// Rows of `result` whose `column` (compared as text) is in `selection`,
/// in their original order.
pub fn filter_rows(
    result: &QueryResult,
    column: &str,
    selection: &Selection,
) -> Result<DataFrame, DashboardError> {
    let source = result.frame();
    let keys = source.column(column)?.cast(&DataType::String)?;
    let mask: BooleanChunked = keys
        .str()?
        .into_iter()
        .map(|c| Some(c.is_some_and(|c| selection.contains(c))))
        .collect();
    Ok(source.filter(&mask)?)
}

fn recast_to_text(frame: &mut DataFrame, column: &str) -> PolarsResult<()> {
    let text = frame.column(column)?.cast(&DataType::String)?;
    frame.with_column(text)?;
    Ok(())
}
