//! Dashboard pages and the render cycle shared by all of them.
//!
//! A render fetches the page's query results, derives the selector choices,
//! checks the selection and builds a `PageView`. Any failure ends the cycle
//! with a single `Notice`; nothing is partially rendered.

use std::time::{Duration, Instant};

use polars::prelude::DataFrame;

use crate::config::PagesConfig;
use crate::error::DashboardError;
use crate::error_display::user_message;
use crate::filter::FilteredSeries;
use crate::map_layer::MapLayer;
use crate::selection::{Selection, SelectionMode, SelectorState};
use crate::warehouse::WarehouseClient;

pub mod districts;
pub mod locations;
pub mod monthly;

pub use districts::DistrictsPage;
pub use locations::LocationsPage;
pub use monthly::MonthlyPage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageId {
    Districts,
    Monthly,
    Locations,
}

impl PageId {
    pub const ALL: [PageId; 3] = [PageId::Districts, PageId::Monthly, PageId::Locations];

    pub fn as_str(self) -> &'static str {
        match self {
            PageId::Districts => "districts",
            PageId::Monthly => "monthly",
            PageId::Locations => "locations",
        }
    }

    pub fn parse(name: &str) -> Option<PageId> {
        PageId::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(name.trim()))
    }

    pub fn index(self) -> usize {
        match self {
            PageId::Districts => 0,
            PageId::Monthly => 1,
            PageId::Locations => 2,
        }
    }

    pub fn next(self) -> PageId {
        PageId::ALL[(self.index() + 1) % PageId::ALL.len()]
    }

    pub fn prev(self) -> PageId {
        PageId::ALL[(self.index() + PageId::ALL.len() - 1) % PageId::ALL.len()]
    }
}

impl From<crimeboard_cli::PageArg> for PageId {
    fn from(arg: crimeboard_cli::PageArg) -> Self {
        match arg {
            crimeboard_cli::PageArg::Districts => PageId::Districts,
            crimeboard_cli::PageArg::Monthly => PageId::Monthly,
            crimeboard_cli::PageArg::Locations => PageId::Locations,
        }
    }
}

/// What the renderer draws below the table.
#[derive(Debug, Clone)]
pub enum Visual {
    Chart(FilteredSeries),
    Map(MapLayer),
}

/// A successfully built page.
#[derive(Debug, Clone)]
pub struct PageView {
    pub table_title: String,
    /// Pivot rows for the selection; the map page has none
    pub table: Option<DataFrame>,
    pub visual: Visual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// The user must change the selection
    Validation,
    /// The warehouse could not be reached
    Connectivity,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    View(PageView),
    Notice(Notice),
}

/// Result of one render cycle.
#[derive(Debug, Clone)]
pub struct RenderResult {
    pub page: PageId,
    pub heading: String,
    /// Selector choices; empty when fetching failed
    pub choices: Vec<String>,
    /// Selection the view was built for
    pub selection: Selection,
    pub outcome: Outcome,
    pub elapsed: Duration,
}

impl RenderResult {
    pub fn view(&self) -> Option<&PageView> {
        match &self.outcome {
            Outcome::View(view) => Some(view),
            Outcome::Notice(_) => None,
        }
    }

    pub fn notice(&self) -> Option<&Notice> {
        match &self.outcome {
            Outcome::Notice(notice) => Some(notice),
            Outcome::View(_) => None,
        }
    }
}

/// One dashboard page: its queries, its choices and how it turns a
/// selection into a view.
pub trait Page {
    /// Query results (and derived tables) the page works from
    type Data;

    fn id(&self) -> PageId;
    fn title(&self) -> &'static str;
    fn selection_mode(&self) -> SelectionMode;
    /// What one selected key is called ("district")
    fn noun(&self) -> &'static str;

    /// Run every query of the page.
    fn fetch(&self, warehouse: &dyn WarehouseClient) -> Result<Self::Data, DashboardError>;
    fn choices(&self, data: &Self::Data) -> Result<Vec<String>, DashboardError>;
    fn default_selection(&self, choices: &[String]) -> Selection;
    fn view(&self, data: &Self::Data, selection: &Selection) -> Result<PageView, DashboardError>;
}

/// Render `page` for `selection`.
pub fn render_page<P: Page + ?Sized>(
    page: &P,
    warehouse: &dyn WarehouseClient,
    selection: &Selection,
) -> RenderResult {
    render_with(page, warehouse, |_| selection.clone())
}

/// Render `page` for the selector's selection, first feeding the selector
/// the fresh choices (and the page defaults, on its first render).
pub fn render_selector<P: Page + ?Sized>(
    page: &P,
    warehouse: &dyn WarehouseClient,
    selector: &mut SelectorState,
) -> RenderResult {
    render_with(page, warehouse, |choices| {
        let defaults = page.default_selection(choices);
        selector.set_choices(choices.to_vec(), &defaults);
        selector.selection().clone()
    })
}

fn render_with<P: Page + ?Sized>(
    page: &P,
    warehouse: &dyn WarehouseClient,
    pick: impl FnOnce(&[String]) -> Selection,
) -> RenderResult {
    let started = Instant::now();
    let finish = |choices: Vec<String>, selection: Selection, outcome: Outcome| RenderResult {
        page: page.id(),
        heading: page.title().to_string(),
        choices,
        selection,
        outcome,
        elapsed: started.elapsed(),
    };

    let data = match page.fetch(warehouse) {
        Ok(data) => data,
        Err(e) => return finish(Vec::new(), Selection::new(), Outcome::Notice(notice_for(page.id(), &e))),
    };

    let choices = match page.choices(&data) {
        Ok(choices) => choices,
        Err(e) => return finish(Vec::new(), Selection::new(), Outcome::Notice(notice_for(page.id(), &e))),
    };

    let selection = pick(&choices);
    if selection.is_empty() {
        let e = DashboardError::EmptySelection(page.noun().to_string());
        return finish(choices, selection, Outcome::Notice(notice_for(page.id(), &e)));
    }

    let outcome = match page.view(&data, &selection) {
        Ok(view) => Outcome::View(view),
        Err(e) => Outcome::Notice(notice_for(page.id(), &e)),
    };
    let result = finish(choices, selection, outcome);
    tracing::debug!(
        page = page.id().as_str(),
        selected = result.selection.len(),
        elapsed_ms = result.elapsed.as_millis() as u64,
        ok = result.view().is_some(),
        "page rendered"
    );
    result
}

/// Classify a render failure. Unexpected failures are logged.
fn notice_for(page: PageId, err: &DashboardError) -> Notice {
    let kind = if err.is_validation() {
        NoticeKind::Validation
    } else if err.connectivity_reason().is_some() {
        NoticeKind::Connectivity
    } else {
        NoticeKind::Failure
    };
    match kind {
        NoticeKind::Validation => {}
        NoticeKind::Connectivity => tracing::warn!(page = page.as_str(), error = %err, "warehouse unreachable"),
        NoticeKind::Failure => tracing::error!(page = page.as_str(), error = %err, "page render failed"),
    }
    Notice {
        kind,
        message: user_message(err),
    }
}

/// The three pages, built from config and addressed by `PageId`.
pub struct Dashboard {
    districts: DistrictsPage,
    monthly: MonthlyPage,
    locations: LocationsPage,
}

impl Dashboard {
    pub fn new(config: &PagesConfig) -> Self {
        Self {
            districts: DistrictsPage::new(&config.districts),
            monthly: MonthlyPage::new(&config.monthly),
            locations: LocationsPage::new(&config.locations),
        }
    }

    pub fn districts(&self) -> &DistrictsPage {
        &self.districts
    }

    pub fn monthly(&self) -> &MonthlyPage {
        &self.monthly
    }

    pub fn locations(&self) -> &LocationsPage {
        &self.locations
    }

    pub fn title(&self, id: PageId) -> &'static str {
        match id {
            PageId::Districts => self.districts.title(),
            PageId::Monthly => self.monthly.title(),
            PageId::Locations => self.locations.title(),
        }
    }

    pub fn selection_mode(&self, id: PageId) -> SelectionMode {
        match id {
            PageId::Districts => self.districts.selection_mode(),
            PageId::Monthly => self.monthly.selection_mode(),
            PageId::Locations => self.locations.selection_mode(),
        }
    }

    pub fn noun(&self, id: PageId) -> &'static str {
        match id {
            PageId::Districts => self.districts.noun(),
            PageId::Monthly => self.monthly.noun(),
            PageId::Locations => self.locations.noun(),
        }
    }

    pub fn render(
        &self,
        id: PageId,
        warehouse: &dyn WarehouseClient,
        selection: &Selection,
    ) -> RenderResult {
        match id {
            PageId::Districts => render_page(&self.districts, warehouse, selection),
            PageId::Monthly => render_page(&self.monthly, warehouse, selection),
            PageId::Locations => render_page(&self.locations, warehouse, selection),
        }
    }

    pub fn render_selector(
        &self,
        id: PageId,
        warehouse: &dyn WarehouseClient,
        selector: &mut SelectorState,
    ) -> RenderResult {
        match id {
            PageId::Districts => render_selector(&self.districts, warehouse, selector),
            PageId::Monthly => render_selector(&self.monthly, warehouse, selector),
            PageId::Locations => render_selector(&self.locations, warehouse, selector),
        }
    }
}

/// Configured defaults that are actual choices, in configured order.
pub(crate) fn defaults_among(defaults: &[String], choices: &[String]) -> Selection {
    defaults
        .iter()
        .filter(|d| choices.contains(d))
        .cloned()
        .collect()
}
