use std::borrow::Cow;

use polars::prelude::*;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Row, StatefulWidget, Table, TableState, Widget},
};

/// Text of one cell. Whole floats print without a fraction so MAX-pivoted
/// counts read as integers.
pub fn cell_text<'a>(value: &'a AnyValue<'a>, null_text: &'a str) -> Cow<'a, str> {
    match value {
        AnyValue::Null => Cow::Borrowed(null_text),
        AnyValue::Float64(v) if v.fract() == 0.0 && v.abs() < 1e15 => {
            Cow::Owned(format!("{:.0}", v))
        }
        AnyValue::Float32(v) if v.fract() == 0.0 && v.abs() < 1e7 => Cow::Owned(format!("{:.0}", v)),
        other => other.str_value(),
    }
}

/// All cells of `df` as text, row-major.
pub fn frame_cells(df: &DataFrame, null_text: &str) -> PolarsResult<Vec<Vec<String>>> {
    let mut rows = vec![Vec::with_capacity(df.width()); df.height()];
    for column in df.get_columns() {
        for (row_index, row) in rows.iter_mut().enumerate() {
            let value = column.get(row_index)?;
            row.push(cell_text(&value, null_text).into_owned());
        }
    }
    Ok(rows)
}

/// Plain aligned text rendering used by `--print`.
pub fn format_frame_text(df: &DataFrame, null_text: &str) -> PolarsResult<String> {
    let headers: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let rows = frame_cells(df, null_text)?;

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (cell, width))| {
                // Key column left aligned, values right aligned
                if i == 0 {
                    format!("{:<width$}", cell, width = width)
                } else {
                    format!("{:>width$}", cell, width = width)
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&line(&headers));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    out.push('\n');
    for row in &rows {
        out.push_str(&line(row));
        out.push('\n');
    }
    Ok(out)
}

/// Pivot table view: title in the border, category column first, columns
/// sized to content and dropped from the right when they do not fit.
pub struct PivotTableView<'a> {
    df: &'a DataFrame,
    title: &'a str,
    null_text: &'a str,
    row_numbers: bool,
    header_fg: Color,
    border_fg: Color,
    cell_padding: u16,
}

impl<'a> PivotTableView<'a> {
    pub fn new(df: &'a DataFrame, title: &'a str) -> Self {
        Self {
            df,
            title,
            null_text: "-",
            row_numbers: false,
            header_fg: Color::White,
            border_fg: Color::Cyan,
            cell_padding: 2,
        }
    }

    pub fn with_null_text(mut self, null_text: &'a str) -> Self {
        self.null_text = null_text;
        self
    }

    pub fn with_row_numbers(mut self, row_numbers: bool) -> Self {
        self.row_numbers = row_numbers;
        self
    }

    pub fn with_colors(mut self, header_fg: Color, border_fg: Color) -> Self {
        self.header_fg = header_fg;
        self.border_fg = border_fg;
        self
    }
}

impl StatefulWidget for PivotTableView<'_> {
    type State = TableState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.border_fg))
            .title(format!(" {} ", self.title));
        let inner = block.inner(area);
        block.render(area, buf);

        let (height, cols) = self.df.shape();
        let mut headers: Vec<String> = self
            .df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        let mut rows: Vec<Vec<String>> = match frame_cells(self.df, self.null_text) {
            Ok(rows) => rows,
            Err(e) => {
                Line::from(format!("Could not display table: {}", e)).render(inner, buf);
                return;
            }
        };
        if self.row_numbers {
            headers.insert(0, "#".to_string());
            for (i, row) in rows.iter_mut().enumerate() {
                row.insert(0, (i + 1).to_string());
            }
        }
        let cols = cols + usize::from(self.row_numbers);

        // Each column as wide as its content; stop adding columns once the
        // next one would overflow
        let mut widths: Vec<u16> = Vec::with_capacity(cols);
        let mut used_width = 0u16;
        for col_index in 0..cols {
            let content = rows
                .iter()
                .map(|row| row[col_index].chars().count())
                .max()
                .unwrap_or(0)
                .max(headers[col_index].chars().count()) as u16;
            if used_width + content > inner.width && col_index > 0 {
                break;
            }
            widths.push(content.min(inner.width));
            used_width = used_width.saturating_add(content + self.cell_padding);
        }
        let visible_columns = widths.len();

        if height == 0 {
            Line::from(Span::styled(
                "No rows",
                Style::default().add_modifier(Modifier::DIM),
            ))
            .render(Rect { y: inner.y.saturating_add(1), ..inner }, buf);
        }

        let rows: Vec<Row> = rows
            .into_iter()
            .map(|row| {
                let cells: Vec<Cell> = row
                    .into_iter()
                    .take(visible_columns)
                    .enumerate()
                    .map(|(i, text)| {
                        let line = if i == 0 {
                            Line::from(text)
                        } else {
                            Line::from(text).right_aligned()
                        };
                        Cell::from(line)
                    })
                    .collect();
                Row::new(cells)
            })
            .collect();
        let header: Vec<Span> = headers
            .into_iter()
            .take(visible_columns)
            .map(|name| Span::styled(name, Style::default().add_modifier(Modifier::BOLD)))
            .collect();

        StatefulWidget::render(
            Table::new(rows, widths)
                .column_spacing(self.cell_padding)
                .header(Row::new(header).style(Style::default().fg(self.header_fg)))
                .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED)),
            inner,
            buf,
            state,
        );
    }
}
