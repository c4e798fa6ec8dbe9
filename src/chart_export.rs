//! Page export: the pivot table as CSV (polars writer) and the chart as PNG
//! (plotters bitmap).

use color_eyre::eyre::eyre;
use color_eyre::Result;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

use crate::chart_data::PreparedChart;
use crate::filter::Mark;

const PNG_SIZE: (u32, u32) = (960, 540);

/// Label for an x position: the category label when one sits there, else the number.
fn x_tick_label(chart: &PreparedChart, x: f64) -> String {
    chart
        .x_labels
        .iter()
        .find(|(pos, _)| (pos - x).abs() < 1e-6)
        .map(|(_, label)| label.clone())
        .unwrap_or_default()
}

/// Format a y tick: integer when whole, else two decimals.
fn format_tick(v: f64) -> String {
    if (v - v.round()).abs() < 1e-10 {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v)
    }
}

/// Write `chart` to PNG using the plotters bitmap backend.
pub fn write_chart_png(path: &Path, chart: &PreparedChart, title: &str) -> Result<()> {
    use plotters::prelude::*;

    if chart.is_empty() {
        return Err(eyre!("No data to export"));
    }

    let root = BitMapBackend::new(path, PNG_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let [x_min, x_max] = chart.x_bounds;
    let [y_min, y_max] = chart.y_bounds;

    let mut builder = ChartBuilder::on(&root);
    builder
        .caption(title, ("sans-serif", 22))
        .margin(30)
        .x_label_area_size(40)
        .y_label_area_size(60);
    let mut plot = builder.build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    let x_formatter = |x: &f64| x_tick_label(chart, *x);
    let y_formatter = |y: &f64| format_tick(*y);
    plot.configure_mesh()
        .x_desc(chart.x_title.as_str())
        .y_desc(chart.y_title.as_str())
        // One tick per labelled position
        .x_labels(chart.x_labels.len().max(2))
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&y_formatter)
        .draw()?;

    let colors = [
        RGBColor(31, 119, 180),
        RGBColor(255, 127, 14),
        RGBColor(44, 160, 44),
        RGBColor(214, 39, 40),
        RGBColor(148, 103, 189),
        RGBColor(140, 86, 75),
        RGBColor(227, 119, 194),
    ];

    for (idx, s) in chart.series.iter().enumerate() {
        if s.points.is_empty() {
            continue;
        }
        let color = colors[idx % colors.len()];
        if let Mark::Area { opacity } = chart.mark {
            let baseline = y_min.max(0.0).min(y_max);
            plot.draw_series(
                AreaSeries::new(s.points.iter().copied(), baseline, color.mix(opacity))
                    .border_style(color),
            )?;
        }
        plot.draw_series(LineSeries::new(s.points.iter().copied(), color.stroke_width(2)))?
            .label(s.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    plot.configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Write `df` as CSV with a header row. Nulls become empty fields.
pub fn write_table_csv(path: &Path, df: &DataFrame) -> Result<()> {
    let mut file = File::create(path)?;
    let mut df = df.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;
    file.sync_all()?;
    Ok(())
}
