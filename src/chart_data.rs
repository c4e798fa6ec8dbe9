//! Turn a `FilteredSeries` into plottable point series: one series per color
//! group, x positions from the encoding and y bounds from the scale.

use std::collections::BTreeMap;

use polars::prelude::*;

use crate::error::DashboardError;
use crate::filter::{AxisKind, FilteredSeries, Mark};

/// Y-axis domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YScale {
    /// From zero (or the minimum, when negative) to the maximum
    Zero,
    /// Exactly [min, max] of the plotted values
    FitData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub name: String,
    /// Points sorted by x
    pub points: Vec<(f64, f64)>,
}

/// Everything a renderer needs to draw the chart.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedChart {
    pub series: Vec<ChartSeries>,
    /// Tick positions and their labels, in x order
    pub x_labels: Vec<(f64, String)>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_title: String,
    pub y_title: String,
    pub mark: Mark,
}

impl PreparedChart {
    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.points.is_empty())
    }
}

fn text_values(frame: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let column = frame.column(name)?.cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Build per-group point series from `series`. Rows with a null or
/// unplaceable x, or a null or non-finite y, are skipped.
pub fn prepare_chart(series: &FilteredSeries) -> Result<PreparedChart, DashboardError> {
    let frame = series.frame();
    let encoding = series.encoding();

    let xs = text_values(frame, &encoding.x)?;
    let ys: Vec<Option<f64>> = frame
        .column(&encoding.y)?
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .collect();
    let groups = match &encoding.color {
        Some(color) => text_values(frame, color)?,
        None => vec![Some(encoding.y.clone()); frame.height()],
    };

    // Label order for nominal axes without an explicit sort: first appearance
    let order: Option<Vec<String>> = match (&encoding.sort, encoding.x_kind) {
        (Some(order), _) => Some(order.clone()),
        (None, AxisKind::Nominal) => {
            let mut seen: Vec<String> = Vec::new();
            for x in xs.iter().flatten() {
                if !seen.contains(x) {
                    seen.push(x.clone());
                }
            }
            Some(seen)
        }
        (None, AxisKind::Temporal) => None,
    };

    let position = |label: &str| -> Option<f64> {
        match &order {
            Some(order) => order.iter().position(|o| o == label).map(|i| i as f64),
            None => label.trim().parse::<f64>().ok(),
        }
    };

    let mut grouped: BTreeMap<String, Vec<(f64, f64)>> = BTreeMap::new();
    let mut temporal_labels: BTreeMap<i64, String> = BTreeMap::new();
    for ((x, y), group) in xs.iter().zip(ys.iter()).zip(groups.iter()) {
        let (Some(x), Some(y), Some(group)) = (x, y, group) else {
            continue;
        };
        let Some(px) = position(x.as_str()) else {
            continue;
        };
        if !px.is_finite() || !y.is_finite() {
            continue;
        }
        if order.is_none() {
            temporal_labels.insert(px.round() as i64, x.clone());
        }
        grouped.entry(group.clone()).or_default().push((px, *y));
    }

    let series: Vec<ChartSeries> = grouped
        .into_iter()
        .map(|(name, mut points)| {
            points.sort_by(|a, b| a.0.total_cmp(&b.0));
            ChartSeries { name, points }
        })
        .collect();

    let x_labels: Vec<(f64, String)> = match &order {
        Some(order) => order
            .iter()
            .enumerate()
            .map(|(i, l)| (i as f64, l.clone()))
            .collect(),
        None => temporal_labels
            .into_iter()
            .map(|(x, l)| (x as f64, l))
            .collect(),
    };

    let x_bounds = match &order {
        Some(order) if !order.is_empty() => [0.0, (order.len() - 1) as f64],
        _ => padded(bounds(series.iter().flat_map(|s| s.points.iter().map(|p| p.0))), 0.5),
    };
    let [y_min, y_max] = bounds(series.iter().flat_map(|s| s.points.iter().map(|p| p.1)));
    let y_bounds = match encoding.y_scale {
        YScale::Zero => padded([y_min.min(0.0), y_max], 1.0),
        YScale::FitData => padded([y_min, y_max], 1.0),
    };

    Ok(PreparedChart {
        series,
        x_labels,
        x_bounds,
        y_bounds,
        x_title: encoding.x.clone(),
        y_title: encoding.y.clone(),
        mark: encoding.mark,
    })
}

/// [min, max] of `values`, or [0, 1] when there are none.
fn bounds(values: impl Iterator<Item = f64>) -> [f64; 2] {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for v in values {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if lo > hi {
        [0.0, 1.0]
    } else {
        [lo, hi]
    }
}

/// Widen a zero-width range so axes stay drawable.
fn padded([lo, hi]: [f64; 2], pad: f64) -> [f64; 2] {
    if hi > lo {
        [lo, hi]
    } else {
        [lo - pad, hi + pad]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{filter_project, AxisRecast, Projection};
    use crate::query::QueryResult;
    use crate::reshape::calendar_month_names;
    use crate::selection::Selection;

    fn monthly() -> FilteredSeries {
        let result = QueryResult::new(
            df!(
                "category" => &["ASSAULT", "ASSAULT", "ASSAULT", "ARSON"],
                "month" => &["March", "January", "February", "January"],
                "crime_count" => &[300i64, 100, 250, 9]
            )
            .unwrap(),
        );
        let projection = Projection {
            category: "category".into(),
            axis: "month".into(),
            axis_kind: AxisKind::Nominal,
            recast: AxisRecast::Ordered(calendar_month_names()),
            value: "crime_count".into(),
            color: None,
            mark: Mark::Line,
            y_scale: YScale::FitData,
        };
        filter_project(&result, &Selection::single("ASSAULT"), &projection).unwrap()
    }

    #[test]
    fn months_follow_calendar_order() {
        let chart = prepare_chart(&monthly()).unwrap();
        assert_eq!(chart.series.len(), 1);
        assert_eq!(
            chart.series[0].points,
            vec![(0.0, 100.0), (1.0, 250.0), (2.0, 300.0)]
        );
        assert_eq!(chart.x_labels.len(), 12);
        assert_eq!(chart.x_labels[0], (0.0, "January".to_string()));
        assert_eq!(chart.x_bounds, [0.0, 11.0]);
        assert_eq!(chart.y_bounds, [100.0, 300.0]);
    }

    #[test]
    fn temporal_axis_groups_by_color() {
        let result = QueryResult::new(
            df!(
                "pddistrict" => &["PARK", "BAYVIEW", "PARK", "BAYVIEW"],
                "year" => &[2008i64, 2007, 2007, 2008],
                "crime_count" => &[20i64, 5, 10, 15]
            )
            .unwrap(),
        );
        let projection = Projection {
            category: "pddistrict".into(),
            axis: "year".into(),
            axis_kind: AxisKind::Temporal,
            recast: AxisRecast::Text,
            value: "crime_count".into(),
            color: Some("pddistrict".into()),
            mark: Mark::Area { opacity: 0.3 },
            y_scale: YScale::Zero,
        };
        let filtered =
            filter_project(&result, &Selection::from_keys(["PARK", "BAYVIEW"]), &projection)
                .unwrap();
        let chart = prepare_chart(&filtered).unwrap();

        let names: Vec<&str> = chart.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["BAYVIEW", "PARK"]);
        assert_eq!(chart.series[1].points, vec![(2007.0, 10.0), (2008.0, 20.0)]);
        assert_eq!(
            chart.x_labels,
            vec![(2007.0, "2007".to_string()), (2008.0, "2008".to_string())]
        );
        assert_eq!(chart.y_bounds, [0.0, 20.0]);
    }

    #[test]
    fn empty_series_has_drawable_bounds() {
        let result = QueryResult::new(monthly().frame().clone());
        let projection = Projection {
            category: "category".into(),
            axis: "month".into(),
            axis_kind: AxisKind::Temporal,
            recast: AxisRecast::Keep,
            value: "crime_count".into(),
            color: None,
            mark: Mark::Line,
            y_scale: YScale::Zero,
        };
        let filtered = filter_project(&result, &Selection::single("NONE"), &projection).unwrap();
        let chart = prepare_chart(&filtered).unwrap();
        assert!(chart.is_empty());
        assert!(chart.x_bounds[1] > chart.x_bounds[0]);
        assert!(chart.y_bounds[1] > chart.y_bounds[0]);
    }
}
