mod common;

use common::{full_warehouse, keys, FakeWarehouse};
use crimeboard::config::PagesConfig;
use crimeboard::pages::{render_page, render_selector, DistrictsPage, LocationsPage, MonthlyPage};
use crimeboard::query::{
    CATEGORY_MONTH_COUNTS, CATEGORY_MONTH_SERIES, DISTRICT_YEAR_COUNTS, DISTRICT_YEAR_SERIES,
};
use crimeboard::{Dashboard, NoticeKind, PageId, Selection, SelectionMode, SelectorState, Visual};
use polars::prelude::*;

fn districts() -> DistrictsPage {
    DistrictsPage::new(&PagesConfig::default().districts)
}

#[test]
fn test_empty_selection_is_a_validation_notice() {
    let warehouse = full_warehouse();
    let result = render_page(&districts(), &warehouse, &Selection::new());

    assert!(result.view().is_none());
    let notice = result.notice().expect("notice");
    assert_eq!(notice.kind, NoticeKind::Validation);
    assert_eq!(notice.message, "Please select at least one district.");
    // Choices are still offered so the user can fix the selection
    assert_eq!(result.choices, keys(&["BAYVIEW", "MISSION", "PARK", "TENDERLOIN"]));
}

#[test]
fn test_both_queries_run_even_without_selection() {
    let warehouse = full_warehouse();
    render_page(&districts(), &warehouse, &Selection::new());
    let calls = warehouse.calls();
    assert!(calls.contains(&DISTRICT_YEAR_COUNTS.sql.to_string()));
    assert!(calls.contains(&DISTRICT_YEAR_SERIES.sql.to_string()));
}

#[test]
fn test_two_districts_give_two_sorted_rows() {
    let warehouse = full_warehouse();
    let result = render_page(
        &districts(),
        &warehouse,
        &Selection::from_keys(["PARK", "BAYVIEW"]),
    );
    let view = result.view().expect("view");
    let table = view.table.as_ref().expect("table");

    assert_eq!(table.height(), 2);
    let names: Vec<&str> = table
        .column("pddistrict")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(names, vec!["BAYVIEW", "PARK"]);
    assert_eq!(table.width(), 12);
    assert_eq!(view.table_title, "Crimes reported by districts");

    let Visual::Chart(series) = &view.visual else {
        panic!("districts page draws a chart");
    };
    // Series rows keep their query order and drop TENDERLOIN
    assert_eq!(series.height(), 4);
    let years = series.frame().column("year").unwrap();
    assert_eq!(years.dtype(), &DataType::String);
}

#[test]
fn test_unknown_district_is_reported() {
    let warehouse = full_warehouse();
    let result = render_page(
        &districts(),
        &warehouse,
        &Selection::from_keys(["PARK", "PIER"]),
    );
    let notice = result.notice().expect("notice");
    assert_eq!(notice.kind, NoticeKind::Validation);
    assert!(notice.message.contains("PIER"));
}

#[test]
fn test_connectivity_failure_keeps_reason() {
    let warehouse = FakeWarehouse::new().unreachable("timeout");
    let result = render_page(&districts(), &warehouse, &Selection::single("PARK"));
    let notice = result.notice().expect("notice");
    assert_eq!(notice.kind, NoticeKind::Connectivity);
    assert!(notice.message.contains("timeout"));
    assert!(notice.message.contains("requires internet access"));
    assert!(result.choices.is_empty());
}

#[test]
fn test_missing_column_is_a_failure() {
    let warehouse = FakeWarehouse::new()
        .with(
            &DISTRICT_YEAR_COUNTS,
            df!("pddistrict" => &["PARK"], "year" => &[2007i64]).unwrap(),
        )
        .with(&DISTRICT_YEAR_SERIES, common::district_series());
    let result = render_page(&districts(), &warehouse, &Selection::single("PARK"));
    let notice = result.notice().expect("notice");
    assert_eq!(notice.kind, NoticeKind::Failure);
    assert!(notice.message.contains("crime_count"));
}

#[test]
fn test_selector_seeds_configured_defaults() {
    let warehouse = full_warehouse();
    let page = districts();
    let mut selector = SelectorState::new(SelectionMode::Multi);
    let result = render_selector(&page, &warehouse, &mut selector);

    assert_eq!(selector.selection(), &Selection::from_keys(["PARK", "BAYVIEW"]));
    assert_eq!(result.view().unwrap().table.as_ref().unwrap().height(), 2);

    // A cleared selection stays cleared on the next render
    selector.clear();
    let result = render_selector(&page, &warehouse, &mut selector);
    assert_eq!(result.notice().unwrap().kind, NoticeKind::Validation);
}

#[test]
fn test_monthly_shows_one_category_in_calendar_order() {
    let warehouse = full_warehouse();
    let page = MonthlyPage::new(&PagesConfig::default().monthly);
    let result = render_page(&page, &warehouse, &Selection::single("ASSAULT"));
    let view = result.view().expect("view");

    let table = view.table.as_ref().unwrap();
    assert_eq!(table.height(), 1);
    let columns = table.get_column_names_str();
    assert_eq!(columns[0], "category");
    assert_eq!(columns[1], "January");
    assert_eq!(columns[12], "December");

    let Visual::Chart(series) = &view.visual else {
        panic!("monthly page draws a chart");
    };
    assert_eq!(series.height(), 3);
    let order = series.encoding().sort.as_ref().expect("explicit month order");
    assert_eq!(order.len(), 12);
    assert_eq!(order[2], "March");
}

#[test]
fn test_monthly_unknown_category_renders_empty_table() {
    let warehouse = full_warehouse();
    let page = MonthlyPage::new(&PagesConfig::default().monthly);
    let result = render_page(&page, &warehouse, &Selection::single("BURGLARY"));
    let view = result.view().expect("view");
    assert_eq!(view.table.as_ref().unwrap().height(), 0);
    let calls = warehouse.calls();
    assert!(calls.contains(&CATEGORY_MONTH_COUNTS.sql.to_string()));
    assert!(calls.contains(&CATEGORY_MONTH_SERIES.sql.to_string()));
}

#[test]
fn test_locations_excludes_configured_categories() {
    let warehouse = full_warehouse();
    let page = LocationsPage::new(&PagesConfig::default().locations);
    let mut selector = SelectorState::new(SelectionMode::Single);
    let result = render_selector(&page, &warehouse, &mut selector);

    assert_eq!(result.choices, keys(&["ROBBERY", "ASSAULT"]));
    assert_eq!(selector.selection(), &Selection::single("ROBBERY"));

    let view = result.view().expect("view");
    assert!(view.table.is_none());
    let Visual::Map(layer) = &view.visual else {
        panic!("locations page draws a map");
    };
    // One ROBBERY row has no longitude
    assert_eq!(layer.points, 2);
    assert_eq!(layer.bins.len(), 1);
    assert_eq!(layer.bins[0].count, 2);
    assert_eq!(layer.bins.iter().map(|b| b.count).sum::<usize>(), layer.points);
}

#[test]
fn test_dashboard_dispatches_by_page() {
    let warehouse = full_warehouse();
    let dashboard = Dashboard::new(&PagesConfig::default());
    for id in PageId::ALL {
        let mut selector = SelectorState::new(dashboard.selection_mode(id));
        let result = dashboard.render_selector(id, &warehouse, &mut selector);
        assert_eq!(result.page, id);
        assert_eq!(result.heading, dashboard.title(id));
        assert!(result.view().is_some(), "{} should render", id.as_str());
    }
}
