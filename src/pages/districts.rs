//! Incidents per police district and year: pivot table plus overlapping area chart.

use crate::chart_data::YScale;
use crate::config::DistrictsPageConfig;
use crate::error::DashboardError;
use crate::filter::{filter_project, AxisKind, AxisRecast, Mark, Projection};
use crate::query::{require_columns, run_query, QueryResult, DISTRICT_YEAR_COUNTS, DISTRICT_YEAR_SERIES};
use crate::reshape::{reshape_pivot, BucketSet, PivotSpec, PivotTable};
use crate::selection::{Selection, SelectionMode};
use crate::warehouse::WarehouseClient;

use super::{defaults_among, Page, PageId, PageView, Visual};

pub const DISTRICT: &str = "pddistrict";
pub const YEAR: &str = "year";
pub const CRIME_COUNT: &str = "crime_count";

pub struct DistrictsPage {
    defaults: Vec<String>,
    buckets: BucketSet,
    opacity: f64,
}

pub struct DistrictsData {
    pub table: PivotTable,
    pub series: QueryResult,
}

impl DistrictsPage {
    pub fn new(config: &DistrictsPageConfig) -> Self {
        Self {
            defaults: config.default_selection.clone(),
            buckets: BucketSet::years(config.first_year, config.last_year),
            opacity: config.chart_opacity,
        }
    }

    pub fn buckets(&self) -> &BucketSet {
        &self.buckets
    }

    pub fn projection(&self) -> Projection {
        Projection {
            category: DISTRICT.to_string(),
            axis: YEAR.to_string(),
            axis_kind: AxisKind::Temporal,
            recast: AxisRecast::Text,
            value: CRIME_COUNT.to_string(),
            color: Some(DISTRICT.to_string()),
            mark: Mark::Area {
                opacity: self.opacity,
            },
            y_scale: YScale::Zero,
        }
    }
}

impl Page for DistrictsPage {
    type Data = DistrictsData;

    fn id(&self) -> PageId {
        PageId::Districts
    }

    fn title(&self) -> &'static str {
        "Crimes reported by districts"
    }

    fn selection_mode(&self) -> SelectionMode {
        SelectionMode::Multi
    }

    fn noun(&self) -> &'static str {
        "district"
    }

    fn fetch(&self, warehouse: &dyn WarehouseClient) -> Result<DistrictsData, DashboardError> {
        let counts = run_query(warehouse, &DISTRICT_YEAR_COUNTS)?;
        let series = run_query(warehouse, &DISTRICT_YEAR_SERIES)?;
        require_columns(&DISTRICT_YEAR_COUNTS, &counts, &[DISTRICT, YEAR, CRIME_COUNT])?;
        require_columns(&DISTRICT_YEAR_SERIES, &series, &[DISTRICT, YEAR, CRIME_COUNT])?;

        let spec = PivotSpec::new(DISTRICT, YEAR, CRIME_COUNT, self.buckets.clone());
        let table = reshape_pivot(&counts, &spec)?;
        Ok(DistrictsData { table, series })
    }

    fn choices(&self, data: &DistrictsData) -> Result<Vec<String>, DashboardError> {
        Ok(data.table.categories())
    }

    fn default_selection(&self, choices: &[String]) -> Selection {
        defaults_among(&self.defaults, choices)
    }

    fn view(&self, data: &DistrictsData, selection: &Selection) -> Result<PageView, DashboardError> {
        let table = data.table.select(selection)?;
        let series = filter_project(&data.series, selection, &self.projection())?;
        Ok(PageView {
            table_title: self.title().to_string(),
            table: Some(table.frame().clone()),
            visual: Visual::Chart(series),
        })
    }
}
