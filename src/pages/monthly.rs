//! Incidents per category and calendar month: one category at a time, line chart.

use crate::chart_data::YScale;
use crate::config::MonthlyPageConfig;
use crate::error::DashboardError;
use crate::filter::{filter_project, AxisKind, AxisRecast, Mark, Projection};
use crate::query::{
    require_columns, run_query, QueryResult, CATEGORY_MONTH_COUNTS, CATEGORY_MONTH_SERIES,
};
use crate::reshape::{calendar_month_names, reshape_pivot, BucketSet, PivotSpec, PivotTable};
use crate::selection::{Selection, SelectionMode};
use crate::warehouse::WarehouseClient;

use super::{defaults_among, Page, PageId, PageView, Visual};

pub const CATEGORY: &str = "category";
pub const MONTH: &str = "month";
pub const CRIME_COUNT: &str = "crime_count";

pub struct MonthlyPage {
    defaults: Vec<String>,
}

pub struct MonthlyData {
    pub table: PivotTable,
    pub series: QueryResult,
}

impl MonthlyPage {
    pub fn new(config: &MonthlyPageConfig) -> Self {
        Self {
            defaults: config.default_selection.clone(),
        }
    }

    pub fn projection(&self) -> Projection {
        Projection {
            category: CATEGORY.to_string(),
            axis: MONTH.to_string(),
            axis_kind: AxisKind::Nominal,
            recast: AxisRecast::Ordered(calendar_month_names()),
            value: CRIME_COUNT.to_string(),
            color: None,
            mark: Mark::Line,
            y_scale: YScale::FitData,
        }
    }
}

impl Page for MonthlyPage {
    type Data = MonthlyData;

    fn id(&self) -> PageId {
        PageId::Monthly
    }

    fn title(&self) -> &'static str {
        "Crimes per month - Category-Wise"
    }

    fn selection_mode(&self) -> SelectionMode {
        SelectionMode::Single
    }

    fn noun(&self) -> &'static str {
        "category"
    }

    fn fetch(&self, warehouse: &dyn WarehouseClient) -> Result<MonthlyData, DashboardError> {
        let series = run_query(warehouse, &CATEGORY_MONTH_SERIES)?;
        let counts = run_query(warehouse, &CATEGORY_MONTH_COUNTS)?;
        require_columns(&CATEGORY_MONTH_SERIES, &series, &[CATEGORY, MONTH, CRIME_COUNT])?;
        require_columns(&CATEGORY_MONTH_COUNTS, &counts, &[CATEGORY, MONTH, CRIME_COUNT])?;

        let spec = PivotSpec::new(CATEGORY, MONTH, CRIME_COUNT, BucketSet::calendar_months());
        let table = reshape_pivot(&counts, &spec)?;
        Ok(MonthlyData { table, series })
    }

    fn choices(&self, data: &MonthlyData) -> Result<Vec<String>, DashboardError> {
        Ok(data.table.categories())
    }

    fn default_selection(&self, choices: &[String]) -> Selection {
        defaults_among(&self.defaults, choices)
            .keys()
            .first()
            .map(|k| Selection::single(k.clone()))
            .unwrap_or_default()
    }

    /// Only the first selected key is shown. A key that is not a row yields
    /// an empty table rather than an error.
    fn view(&self, data: &MonthlyData, selection: &Selection) -> Result<PageView, DashboardError> {
        let key = selection
            .keys()
            .first()
            .ok_or_else(|| DashboardError::EmptySelection(self.noun().to_string()))?;
        let table = data.table.matching(key)?;
        let series = filter_project(
            &data.series,
            &Selection::single(key.clone()),
            &self.projection(),
        )?;
        Ok(PageView {
            table_title: self.title().to_string(),
            table: Some(table.frame().clone()),
            visual: Visual::Chart(series),
        })
    }
}
