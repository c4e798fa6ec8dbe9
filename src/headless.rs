//! One-shot rendering for `--print`, `--export-table` and `--export-chart`.

use std::fmt::Write as _;
use std::path::Path;

use color_eyre::eyre::eyre;
use color_eyre::Result;

use crate::chart_data::prepare_chart;
use crate::chart_export::{write_chart_png, write_table_csv};
use crate::config::DisplayConfig;
use crate::pages::{Dashboard, NoticeKind, PageId, RenderResult, Visual};
use crate::selection::{Selection, SelectorState};
use crate::warehouse::WarehouseClient;
use crate::widgets::datatable::format_frame_text;

/// Bins listed in the text report of the map page.
const REPORT_BINS: usize = 10;

/// Render `page` once. Without an explicit selection the configured defaults
/// apply, exactly as on the first interactive render.
pub fn render_once(
    dashboard: &Dashboard,
    warehouse: &dyn WarehouseClient,
    page: PageId,
    selection: Option<&Selection>,
) -> RenderResult {
    match selection {
        Some(selection) => dashboard.render(page, warehouse, selection),
        None => {
            let mut selector = SelectorState::new(dashboard.selection_mode(page));
            dashboard.render_selector(page, warehouse, &mut selector)
        }
    }
}

/// Plain text rendering of a render result.
pub fn format_report(result: &RenderResult, display: &DisplayConfig) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "{}", result.heading)?;
    writeln!(out, "{}", "=".repeat(result.heading.chars().count()))?;
    if !result.selection.is_empty() {
        writeln!(out, "Selected: {}", result.selection.keys().join(", "))?;
    }
    writeln!(out)?;

    if let Some(notice) = result.notice() {
        let label = match notice.kind {
            NoticeKind::Validation => "warning",
            NoticeKind::Connectivity | NoticeKind::Failure => "error",
        };
        writeln!(out, "{}: {}", label, notice.message)?;
        return Ok(out);
    }

    let Some(view) = result.view() else {
        return Ok(out);
    };
    if let Some(table) = &view.table {
        out.push_str(&format_frame_text(table, &display.null_text)?);
        writeln!(out)?;
    }
    match &view.visual {
        Visual::Chart(series) => {
            let chart = prepare_chart(series)?;
            writeln!(out, "{} by {}", chart.y_title, chart.x_title)?;
            for s in &chart.series {
                let (lo, hi) = s
                    .points
                    .iter()
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                        (lo.min(p.1), hi.max(p.1))
                    });
                if s.points.is_empty() {
                    writeln!(out, "  {}: no points", s.name)?;
                } else {
                    writeln!(
                        out,
                        "  {}: {} points, min {}, max {}",
                        s.name,
                        s.points.len(),
                        lo,
                        hi
                    )?;
                }
            }
        }
        Visual::Map(layer) => {
            writeln!(
                out,
                "{} incidents in {} hexagons of {} m",
                layer.points,
                layer.bins.len(),
                layer.settings.radius_m
            )?;
            for bin in layer.bins.iter().take(REPORT_BINS) {
                writeln!(
                    out,
                    "  ({:.5}, {:.5})  {:>6}  elevation {:.0}",
                    bin.latitude, bin.longitude, bin.count, bin.elevation
                )?;
            }
        }
    }
    Ok(out)
}

/// Write the table and/or chart of a successful render.
pub fn export_result(
    result: &RenderResult,
    table_path: Option<&Path>,
    chart_path: Option<&Path>,
) -> Result<()> {
    let view = match (result.view(), result.notice()) {
        (Some(view), _) => view,
        (None, Some(notice)) => return Err(eyre!("Nothing to export: {}", notice.message)),
        (None, None) => return Err(eyre!("Nothing to export")),
    };

    if let Some(path) = table_path {
        let table = view
            .table
            .as_ref()
            .ok_or_else(|| eyre!("The {} page has no table", result.page.as_str()))?;
        write_table_csv(path, table)?;
        tracing::info!(path = %path.display(), rows = table.height(), "exported table");
    }
    if let Some(path) = chart_path {
        let Visual::Chart(series) = &view.visual else {
            return Err(eyre!("The {} page has no chart", result.page.as_str()));
        };
        let chart = prepare_chart(series)?;
        write_chart_png(path, &chart, &result.heading)?;
        tracing::info!(path = %path.display(), series = chart.series.len(), "exported chart");
    }
    Ok(())
}
