//! Hexagon layer on a canvas around the configured view.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    symbols,
    widgets::{
        canvas::{Canvas, Line as CanvasLine, Points},
        Block, Borders, Paragraph, Widget,
    },
};

use crate::config::Theme;
use crate::map_layer::MapLayer;

/// Share of the visible latitude span taken by the tallest column.
const MAX_COLUMN_SHARE: f64 = 0.4;

pub struct MapView<'a> {
    layer: &'a MapLayer,
    theme: &'a Theme,
    title: &'a str,
}

impl<'a> MapView<'a> {
    pub fn new(layer: &'a MapLayer, theme: &'a Theme, title: &'a str) -> Self {
        Self {
            layer,
            theme,
            title,
        }
    }

    fn summary(&self) -> String {
        let mut text = format!(
            "{} incidents in {} hexagons of {:.0} m",
            self.layer.points,
            self.layer.bins.len(),
            self.layer.settings.radius_m
        );
        if let Some(densest) = self.layer.bins.first() {
            text.push_str(&format!(
                ", densest {} at ({:.4}, {:.4})",
                densest.count, densest.latitude, densest.longitude
            ));
        }
        if let Some(center) = self
            .layer
            .pick(self.layer.view.longitude, self.layer.view.latitude)
        {
            text.push_str(&format!(", {} at view center", center.count));
        }
        text
    }
}

impl Widget for MapView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.get("table_border")))
            .title(format!(" {} ", self.title));
        let inner = block.inner(area);
        block.render(area, buf);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Fill(1), Constraint::Length(1)])
            .split(inner);

        Paragraph::new(self.summary())
            .style(Style::default().fg(self.theme.get("text_secondary")))
            .render(layout[1], buf);

        let canvas_area = layout[0];
        if canvas_area.height == 0 || canvas_area.width == 0 {
            return;
        }
        // Terminal cells are about twice as tall as wide
        let aspect = f64::from(canvas_area.width) / (f64::from(canvas_area.height) * 2.0);
        let view = self.layer.view;
        let (half_lon, half_lat) = view.half_extent(aspect);
        let x_bounds = [view.longitude - half_lon, view.longitude + half_lon];
        let y_bounds = [view.latitude - half_lat, view.latitude + half_lat];

        let max_count = self.layer.max_count();
        let max_elevation = self
            .layer
            .bins
            .iter()
            .map(|b| b.elevation)
            .fold(0.0, f64::max);
        let column_scale = if max_elevation > 0.0 {
            2.0 * half_lat * MAX_COLUMN_SHARE * view.pitch.to_radians().sin() / max_elevation
        } else {
            0.0
        };
        let low = self.theme.get("map_low");
        let high = self.theme.get("map_high");
        let layer = self.layer;

        Canvas::default()
            .marker(symbols::Marker::Braille)
            .x_bounds(x_bounds)
            .y_bounds(y_bounds)
            .paint(|ctx| {
                // Lowest first so dense columns draw on top
                for bin in layer.bins.iter().rev() {
                    let t = if max_count > 0 {
                        bin.count as f64 / max_count as f64
                    } else {
                        0.0
                    };
                    let color = blend(low, high, t);
                    if layer.settings.extruded && column_scale > 0.0 {
                        ctx.draw(&CanvasLine {
                            x1: bin.longitude,
                            y1: bin.latitude,
                            x2: bin.longitude,
                            y2: bin.latitude + bin.elevation * column_scale,
                            color,
                        });
                    } else {
                        ctx.draw(&Points {
                            coords: &[(bin.longitude, bin.latitude)],
                            color,
                        });
                    }
                }
            })
            .render(canvas_area, buf);
    }
}

/// Color between `low` (t = 0) and `high` (t = 1). Non-RGB colors switch at
/// the midpoint.
pub fn blend(low: Color, high: Color, t: f64) -> Color {
    let t = t.clamp(0.0, 1.0);
    match (low, high) {
        (Color::Rgb(r1, g1, b1), Color::Rgb(r2, g2, b2)) => {
            let mix = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8;
            Color::Rgb(mix(r1, r2), mix(g1, g2), mix(b1, b2))
        }
        _ if t < 0.5 => low,
        _ => high,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LocationsPageConfig;
    use crate::map_layer::{hexbin, HexagonSettings, ViewState};

    #[test]
    fn blend_interpolates_rgb() {
        let low = Color::Rgb(0, 0, 0);
        let high = Color::Rgb(200, 100, 50);
        assert_eq!(blend(low, high, 0.0), low);
        assert_eq!(blend(low, high, 1.0), high);
        assert_eq!(blend(low, high, 0.5), Color::Rgb(100, 50, 25));
        assert_eq!(blend(Color::Green, Color::Red, 0.7), Color::Red);
    }

    #[test]
    fn summary_reports_counts() {
        let config = LocationsPageConfig::default();
        let layer = hexbin(
            [(-122.4, 37.76), (-122.4, 37.76), (-122.3, 37.7)],
            ViewState::from_config(&config),
            HexagonSettings::from_config(&config),
        );
        let theme = Theme::default();
        let view = MapView::new(&layer, &theme, "Robbery");
        let summary = view.summary();
        assert!(summary.starts_with("3 incidents in 2 hexagons of 200 m"));
        assert!(summary.contains("densest 2"));
        assert!(summary.ends_with("2 at view center"));
    }
}
