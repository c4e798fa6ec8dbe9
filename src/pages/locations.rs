//! Incident locations for one category, aggregated into a hexagon layer.

use polars::prelude::*;

use crate::config::LocationsPageConfig;
use crate::error::DashboardError;
use crate::filter::filter_rows;
use crate::map_layer::{build_map_layer, HexagonSettings, ViewState};
use crate::query::{require_columns, run_query, QueryResult, INCIDENT_LOCATIONS};
use crate::selection::{Selection, SelectionMode};
use crate::warehouse::WarehouseClient;

use super::{defaults_among, Page, PageId, PageView, Visual};

pub const CATEGORY: &str = "category";
pub const LONGITUDE: &str = "long";
pub const LATITUDE: &str = "lat";

pub struct LocationsPage {
    defaults: Vec<String>,
    excluded: Vec<String>,
    view: ViewState,
    settings: HexagonSettings,
}

impl LocationsPage {
    pub fn new(config: &LocationsPageConfig) -> Self {
        Self {
            defaults: config.default_selection.clone(),
            excluded: config.excluded_categories.clone(),
            view: ViewState::from_config(config),
            settings: HexagonSettings::from_config(config),
        }
    }
}

impl Page for LocationsPage {
    type Data = QueryResult;

    fn id(&self) -> PageId {
        PageId::Locations
    }

    fn title(&self) -> &'static str {
        "Crimes Location by Category"
    }

    fn selection_mode(&self) -> SelectionMode {
        SelectionMode::Single
    }

    fn noun(&self) -> &'static str {
        "category"
    }

    fn fetch(&self, warehouse: &dyn WarehouseClient) -> Result<QueryResult, DashboardError> {
        let locations = run_query(warehouse, &INCIDENT_LOCATIONS)?;
        require_columns(&INCIDENT_LOCATIONS, &locations, &[CATEGORY, LONGITUDE, LATITUDE])?;
        Ok(locations)
    }

    /// Distinct categories in order of first appearance, minus the excluded ones.
    fn choices(&self, data: &QueryResult) -> Result<Vec<String>, DashboardError> {
        let categories = data.frame().column(CATEGORY)?.cast(&DataType::String)?;
        let mut choices: Vec<String> = Vec::new();
        for category in categories.str()?.into_iter().flatten() {
            if self.excluded.iter().any(|e| e == category) {
                continue;
            }
            if !choices.iter().any(|c| c == category) {
                choices.push(category.to_string());
            }
        }
        Ok(choices)
    }

    fn default_selection(&self, choices: &[String]) -> Selection {
        defaults_among(&self.defaults, choices)
            .keys()
            .first()
            .map(|k| Selection::single(k.clone()))
            .unwrap_or_default()
    }

    fn view(&self, data: &QueryResult, selection: &Selection) -> Result<PageView, DashboardError> {
        let key = selection
            .keys()
            .first()
            .ok_or_else(|| DashboardError::EmptySelection(self.noun().to_string()))?;
        let rows = filter_rows(data, CATEGORY, &Selection::single(key.clone()))?;
        let layer = build_map_layer(&rows, LONGITUDE, LATITUDE, self.view, self.settings)?;
        Ok(PageView {
            table_title: self.title().to_string(),
            table: None,
            visual: Visual::Map(layer),
        })
    }
}
