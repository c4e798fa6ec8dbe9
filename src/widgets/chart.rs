//! Chart widget for a `PreparedChart`: one dataset per series, with areas
//! drawn as dense vertical strokes under a line.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    symbols,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, LegendPosition, Paragraph, Widget},
};

use crate::chart_data::PreparedChart;
use crate::config::Theme;
use crate::filter::Mark;

pub struct ChartView<'a> {
    chart: &'a PreparedChart,
    theme: &'a Theme,
    title: &'a str,
}

impl<'a> ChartView<'a> {
    pub fn new(chart: &'a PreparedChart, theme: &'a Theme, title: &'a str) -> Self {
        Self {
            chart,
            theme,
            title,
        }
    }
}

impl Widget for ChartView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.get("table_border")))
            .title(format!(" {} ", self.title));
        let inner = block.inner(area);
        block.render(area, buf);

        if self.chart.is_empty() {
            Paragraph::new("No data points for the current selection")
                .style(Style::default().fg(self.theme.get("text_secondary")))
                .centered()
                .render(inner, buf);
            return;
        }

        // Fill strokes need to outlive the datasets borrowing them
        let fills: Vec<Vec<(f64, f64)>> = match self.chart.mark {
            Mark::Area { .. } => {
                let samples = usize::from(inner.width.max(1)) * 2;
                self.chart
                    .series
                    .iter()
                    .map(|s| densify(&s.points, self.chart.x_bounds, samples))
                    .collect()
            }
            Mark::Line => Vec::new(),
        };

        let mut datasets: Vec<Dataset> = Vec::new();
        if let Mark::Area { opacity } = self.chart.mark {
            for (i, fill) in fills.iter().enumerate() {
                let mut style = Style::default().fg(self.theme.series_color(i));
                if opacity < 0.5 {
                    style = style.add_modifier(Modifier::DIM);
                }
                datasets.push(
                    Dataset::default()
                        .marker(symbols::Marker::Braille)
                        .graph_type(GraphType::Bar)
                        .style(style)
                        .data(fill),
                );
            }
        }
        for (i, series) in self.chart.series.iter().enumerate() {
            datasets.push(
                Dataset::default()
                    .name(series.name.as_str())
                    .marker(symbols::Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(Style::default().fg(self.theme.series_color(i)))
                    .data(&series.points),
            );
        }

        let label_style = Style::default().fg(self.theme.get("text_primary"));
        let [x_min, x_max] = self.chart.x_bounds;
        let [y_min, y_max] = self.chart.y_bounds;
        let x_labels: Vec<Span> = axis_ticks(
            &self.chart.x_labels,
            self.chart.x_bounds,
            inner.width.saturating_sub(8),
        )
        .into_iter()
        .map(|l| Span::styled(l, label_style))
        .collect();
        let y_labels = vec![
            Span::styled(format_axis_label(y_min), label_style),
            Span::styled(format_axis_label((y_min + y_max) / 2.0), label_style),
            Span::styled(format_axis_label(y_max), label_style),
        ];

        let x_axis = Axis::default()
            .title(Span::styled(self.chart.x_title.as_str(), label_style))
            .bounds([x_min, x_max])
            .style(Style::default().fg(self.theme.get("text_secondary")))
            .labels(x_labels);
        let y_axis = Axis::default()
            .title(Span::styled(self.chart.y_title.as_str(), label_style))
            .bounds([y_min, y_max])
            .style(Style::default().fg(self.theme.get("text_secondary")))
            .labels(y_labels);

        Chart::new(datasets)
            .x_axis(x_axis)
            .y_axis(y_axis)
            .legend_position(Some(LegendPosition::TopRight))
            .render(inner, buf);
    }
}

/// Linear interpolation of `points` at `samples` evenly spaced x positions
/// inside the series' own x range.
fn densify(points: &[(f64, f64)], [lo, hi]: [f64; 2], samples: usize) -> Vec<(f64, f64)> {
    if points.len() < 2 || samples < 2 || hi <= lo {
        return points.to_vec();
    }
    let first = points[0].0;
    let last = points[points.len() - 1].0;
    let step = (hi - lo) / (samples - 1) as f64;
    let mut out = Vec::with_capacity(samples);
    let mut segment = 0;
    for i in 0..samples {
        let x = lo + step * i as f64;
        if x < first || x > last {
            continue;
        }
        while segment + 2 < points.len() && x > points[segment + 1].0 {
            segment += 1;
        }
        let (x0, y0) = points[segment];
        let (x1, y1) = points[segment + 1];
        let y = if x1 > x0 {
            y0 + (y1 - y0) * (x - x0) / (x1 - x0)
        } else {
            y0
        };
        out.push((x, y));
    }
    out
}

/// Axis labels that land on real tick positions. Ratatui spaces labels
/// evenly, so the slot count must divide the labelled span. Long labels are
/// cut to three characters when the full set does not fit `width`.
fn axis_ticks(labels: &[(f64, String)], [lo, hi]: [f64; 2], width: u16) -> Vec<String> {
    if labels.is_empty() {
        return vec![format_axis_label(lo), format_axis_label(hi)];
    }
    let width = usize::from(width.max(1));
    let label_at = |x: f64| -> String {
        labels
            .iter()
            .find(|(pos, _)| (pos - x).abs() < 0.5)
            .map(|(_, l)| l.clone())
            .unwrap_or_default()
    };
    let span = (hi - lo).round().max(0.0) as usize;
    if span == 0 || (hi - lo - span as f64).abs() > 1e-9 {
        return vec![label_at(lo), label_at(hi)];
    }

    let widest = labels.iter().map(|(_, l)| l.chars().count()).max().unwrap_or(1);
    // Largest divisor of the span whose labels fit
    let gaps_for = |label_width: usize| -> usize {
        let max_slots = (width / (label_width + 1)).max(2);
        (1..=span)
            .rev()
            .find(|g| span % g == 0 && *g < max_slots)
            .unwrap_or(1)
    };
    let full = gaps_for(widest);
    let short = gaps_for(widest.min(3));
    let (gaps, truncate) = if short > full { (short, true) } else { (full, false) };

    let step = span / gaps;
    (0..=gaps)
        .map(|i| {
            let label = label_at(lo + (i * step) as f64);
            if truncate {
                label.chars().take(3).collect()
            } else {
                label
            }
        })
        .collect()
}

fn format_axis_label(v: f64) -> String {
    if v.abs() >= 1e6 {
        format!("{:.2e}", v)
    } else if v.fract() == 0.0 || v.abs() >= 100.0 {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart_data::ChartSeries;

    fn months() -> Vec<(f64, String)> {
        crate::reshape::calendar_month_names()
            .into_iter()
            .enumerate()
            .map(|(i, m)| (i as f64, m))
            .collect()
    }

    #[test]
    fn ticks_use_every_month_when_wide() {
        let ticks = axis_ticks(&months(), [0.0, 11.0], 200);
        assert_eq!(ticks.len(), 12);
        assert_eq!(ticks[0], "January");
        assert_eq!(ticks[11], "December");
    }

    #[test]
    fn ticks_abbreviate_when_narrow() {
        let ticks = axis_ticks(&months(), [0.0, 11.0], 60);
        assert_eq!(ticks.len(), 12);
        assert_eq!(ticks[1], "Feb");
    }

    #[test]
    fn year_ticks_divide_the_span() {
        let years: Vec<(f64, String)> = (2007..=2017).map(|y| (y as f64, y.to_string())).collect();
        let ticks = axis_ticks(&years, [2007.0, 2017.0], 20);
        assert_eq!(ticks, vec!["2007", "2012", "2017"]);
    }

    #[test]
    fn densify_interpolates_between_points() {
        let points = vec![(0.0, 0.0), (2.0, 10.0)];
        let dense = densify(&points, [0.0, 2.0], 5);
        assert_eq!(dense.len(), 5);
        assert_eq!(dense[2], (1.0, 5.0));
        assert_eq!(dense[4], (2.0, 10.0));
    }

    #[test]
    fn renders_legend_names() {
        let chart = PreparedChart {
            series: vec![ChartSeries {
                name: "PARK".into(),
                points: vec![(2007.0, 10.0), (2008.0, 12.0)],
            }],
            x_labels: vec![(2007.0, "2007".into()), (2008.0, "2008".into())],
            x_bounds: [2007.0, 2008.0],
            y_bounds: [0.0, 12.0],
            x_title: "year".into(),
            y_title: "crime_count".into(),
            mark: Mark::Area { opacity: 0.3 },
        };
        let theme = Theme::default();
        let area = Rect::new(0, 0, 60, 20);
        let mut buf = Buffer::empty(area);
        ChartView::new(&chart, &theme, "Districts").render(area, &mut buf);
        let text: String = buf.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("PARK"));
        assert!(text.contains("Districts"));
    }
}
