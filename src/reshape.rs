//! Long-form → wide-form pivot of query results.
//!
//! `reshape_pivot` reproduces `PIVOT (MAX(value) FOR bucket IN (...))`: one
//! row per category in the source, one column per whitelisted bucket in
//! whitelist order, null where no observation exists.

use std::collections::{BTreeSet, HashMap};

use chrono::Month;
use polars::lazy::frame::pivot::pivot_stable;
use polars::prelude::*;

use crate::error::DashboardError;
use crate::query::QueryResult;
use crate::selection::Selection;

const BUCKET_TEXT: &str = "__bucket";

/// The fixed, ordered set of bucket labels a pivot produces columns for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSet {
    labels: Vec<String>,
}

impl BucketSet {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Years `first..=last` as text ("2007", ...).
    pub fn years(first: i32, last: i32) -> Self {
        Self::new((first..=last).map(|y| y.to_string()))
    }

    /// January..December.
    pub fn calendar_months() -> Self {
        Self::new(calendar_month_names())
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// Month names in calendar order.
pub fn calendar_month_names() -> Vec<String> {
    let mut month = Month::January;
    let mut names = Vec::with_capacity(12);
    for _ in 0..12 {
        names.push(month.name().to_string());
        month = month.succ();
    }
    names
}

#[derive(Debug, Clone)]
pub struct PivotSpec {
    /// Column whose values become row keys
    pub category: String,
    /// Column whose values become column headers
    pub bucket: String,
    /// Column aggregated with MAX into each cell
    pub value: String,
    pub buckets: BucketSet,
}

impl PivotSpec {
    pub fn new(category: &str, bucket: &str, value: &str, buckets: BucketSet) -> Self {
        Self {
            category: category.to_string(),
            bucket: bucket.to_string(),
            value: value.to_string(),
            buckets,
        }
    }
}

/// Wide-form table: a category column followed by one column per bucket.
#[derive(Debug, Clone)]
pub struct PivotTable {
    frame: DataFrame,
    category: String,
    buckets: Vec<String>,
}

impl PivotTable {
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn category_column(&self) -> &str {
        &self.category
    }

    pub fn buckets(&self) -> &[String] {
        &self.buckets
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Row keys in table order.
    pub fn categories(&self) -> Vec<String> {
        self.frame
            .column(&self.category)
            .ok()
            .and_then(|c| c.str().ok())
            .map(|ca| ca.into_iter().flatten().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Cell for (category, bucket); `None` for null cells and unknown keys.
    pub fn value(&self, category: &str, bucket: &str) -> Option<f64> {
        let row = self.categories().iter().position(|c| c == category)?;
        let column = self.frame.column(bucket).ok()?;
        column.get(row).ok()?.extract::<f64>()
    }

    /// Rows for the selected keys, in category order. Every key must be a row.
    pub fn select(&self, selection: &Selection) -> Result<PivotTable, DashboardError> {
        let missing = selection.missing_from(&self.categories());
        if !missing.is_empty() {
            return Err(DashboardError::UnknownSelection(missing));
        }
        self.filter_rows(|c| selection.contains(c))
    }

    /// Rows equal to `key`; empty when the key is not a row.
    pub fn matching(&self, key: &str) -> Result<PivotTable, DashboardError> {
        self.filter_rows(|c| c == key)
    }

    fn filter_rows(&self, keep: impl Fn(&str) -> bool) -> Result<PivotTable, DashboardError> {
        let mask: BooleanChunked = self
            .frame
            .column(&self.category)?
            .str()?
            .into_iter()
            .map(|c| Some(c.is_some_and(&keep)))
            .collect();
        Ok(PivotTable {
            frame: self.frame.filter(&mask)?,
            category: self.category.clone(),
            buckets: self.buckets.clone(),
        })
    }
}

/// Pivot `result` into a `PivotTable` per `spec`. Aggregation is always MAX.
///
/// Rows whose bucket is not whitelisted fill no cell but still contribute
/// their category. Rows with a null category are dropped.
pub fn reshape_pivot(result: &QueryResult, spec: &PivotSpec) -> Result<PivotTable, DashboardError> {
    let source = result.frame();
    let category = source.column(&spec.category)?.cast(&DataType::String)?;
    let bucket_text = source.column(&spec.bucket)?.cast(&DataType::String)?;
    let value = source.column(&spec.value)?;
    let value_dtype = value.dtype().clone();

    let categories: Vec<String> = category
        .str()?
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let long = DataFrame::new(vec![
        category.clone(),
        bucket_text.with_name(PlSmallStr::from_static(BUCKET_TEXT)),
        value.clone(),
    ])?;
    let whitelisted: BooleanChunked = long
        .column(BUCKET_TEXT)?
        .str()?
        .into_iter()
        .map(|b| Some(b.is_some_and(|b| spec.buckets.contains(b))))
        .collect();
    let long = long.filter(&whitelisted)?;

    let mut columns = Vec::with_capacity(spec.buckets.len() + 1);
    columns.push(Column::new(
        PlSmallStr::from(spec.category.as_str()),
        categories.clone(),
    ));

    if long.height() == 0 {
        for label in spec.buckets.labels() {
            columns.push(Column::full_null(
                PlSmallStr::from(label.as_str()),
                categories.len(),
                &value_dtype,
            ));
        }
    } else {
        let wide = pivot_stable(
            &long,
            [BUCKET_TEXT],
            Some([spec.category.as_str()]),
            Some([spec.value.as_str()]),
            false,
            Some(col(PlSmallStr::from_static("")).max()),
            None,
        )?;

        // Row of each category in the pivot output
        let rows: HashMap<String, IdxSize> = wide
            .column(&spec.category)?
            .str()?
            .into_iter()
            .enumerate()
            .filter_map(|(i, c)| c.map(|c| (c.to_string(), i as IdxSize)))
            .collect();
        let gather: IdxCa = categories.iter().map(|c| rows.get(c).copied()).collect();

        for label in spec.buckets.labels() {
            let column = match wide.column(label) {
                Ok(cells) => cells.take(&gather)?,
                Err(_) => Column::full_null(
                    PlSmallStr::from(label.as_str()),
                    categories.len(),
                    &value_dtype,
                ),
            };
            columns.push(column);
        }
    }

    let frame = DataFrame::new(columns)?;
    tracing::trace!(
        rows = frame.height(),
        buckets = spec.buckets.len(),
        "pivoted {} by {}",
        spec.category,
        spec.bucket
    );

    Ok(PivotTable {
        frame,
        category: spec.category.clone(),
        buckets: spec.buckets.labels().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_order_is_fixed() {
        let months = calendar_month_names();
        assert_eq!(months.len(), 12);
        assert_eq!(months[0], "January");
        assert_eq!(months[1], "February");
        assert_eq!(months[11], "December");
    }

    #[test]
    fn years_are_text() {
        let years = BucketSet::years(2007, 2017);
        assert_eq!(years.len(), 11);
        assert!(years.contains("2007"));
        assert!(!years.contains("2006"));
    }

    #[test]
    fn pivot_takes_max_and_leaves_gaps_null() {
        let df = df!(
            "pddistrict" => &["PARK", "PARK", "BAYVIEW", "MISSION"],
            "year" => &[2008i64, 2008, 2007, 2003],
            "crime_count" => &[10i64, 12, 7, 99]
        )
        .unwrap();
        let spec = PivotSpec::new(
            "pddistrict",
            "year",
            "crime_count",
            BucketSet::years(2007, 2009),
        );
        let table = reshape_pivot(&QueryResult::new(df), &spec).unwrap();

        assert_eq!(table.categories(), vec!["BAYVIEW", "MISSION", "PARK"]);
        assert_eq!(
            table.frame().get_column_names_str(),
            vec!["pddistrict", "2007", "2008", "2009"]
        );
        assert_eq!(table.value("PARK", "2008"), Some(12.0));
        assert_eq!(table.value("PARK", "2007"), None);
        assert_eq!(table.value("BAYVIEW", "2007"), Some(7.0));
        // Only out-of-range buckets: the row exists, every cell is null
        assert_eq!(table.value("MISSION", "2007"), None);
        assert_eq!(table.frame().column("2009").unwrap().null_count(), 3);
    }

    #[test]
    fn select_rejects_unknown_keys() {
        let df = df!(
            "pddistrict" => &["PARK", "BAYVIEW"],
            "year" => &[2010i64, 2010],
            "crime_count" => &[1i64, 2]
        )
        .unwrap();
        let spec = PivotSpec::new("pddistrict", "year", "crime_count", BucketSet::years(2010, 2010));
        let table = reshape_pivot(&QueryResult::new(df), &spec).unwrap();

        let picked = table
            .select(&Selection::from_keys(["PARK", "BAYVIEW"]))
            .unwrap();
        assert_eq!(picked.categories(), vec!["BAYVIEW", "PARK"]);

        match table.select(&Selection::from_keys(["PARK", "PIER"])) {
            Err(DashboardError::UnknownSelection(keys)) => assert_eq!(keys, vec!["PIER"]),
            other => panic!("expected UnknownSelection, got {:?}", other),
        }
        assert!(table.matching("PIER").unwrap().is_empty());
        assert_eq!(table.matching("PARK").unwrap().height(), 1);
    }
}
