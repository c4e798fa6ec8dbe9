use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    widgets::{Paragraph, Widget},
};

const CONTROLS: [(&str, &str); 8] = [
    ("Tab", "Page"),
    ("↑↓", "Move"),
    ("Space", "Select"),
    ("c", "Clear"),
    ("r", "Reload"),
    ("e", "Export"),
    ("?", "Help"),
    ("q", "Quit"),
];

/// Key bar along the bottom edge, with the row count of the current table.
#[derive(Default)]
pub struct Controls {
    pub row_count: Option<usize>,
    pub dimmed: bool,
    pub background: Option<Color>,
}

impl Controls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row_count(mut self, row_count: Option<usize>) -> Self {
        self.row_count = row_count;
        self
    }

    pub fn with_dimmed(mut self, dimmed: bool) -> Self {
        self.dimmed = dimmed;
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }
}

impl Widget for &Controls {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut constraints = CONTROLS.iter().fold(vec![], |mut acc, (key, action)| {
            acc.push(Constraint::Length(key.chars().count() as u16 + 2));
            acc.push(Constraint::Length(action.chars().count() as u16 + 1));
            acc
        });
        if self.row_count.is_some() {
            constraints.push(Constraint::Length(15)); // "Rows: 12345"
        }
        constraints.push(Constraint::Fill(1));

        let layout = Layout::new(Direction::Horizontal, constraints).split(area);
        let bg = self.background.unwrap_or(Color::DarkGray);
        let base_style = if self.dimmed {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        for (i, (key, action)) in CONTROLS.iter().enumerate() {
            let j = i * 2;
            Paragraph::new(*key)
                .style(base_style.bold())
                .centered()
                .render(layout[j], buf);
            Paragraph::new(*action)
                .style(base_style.bg(bg))
                .render(layout[j + 1], buf);
        }

        let mut fill_start_idx = CONTROLS.len() * 2;
        if let Some(count) = self.row_count {
            Paragraph::new(format!("Rows: {}", count))
                .style(base_style.bg(bg).fg(if self.dimmed {
                    Color::DarkGray
                } else {
                    Color::White
                }))
                .right_aligned()
                .render(layout[fill_start_idx], buf);
            fill_start_idx += 1;
        }

        Paragraph::new("")
            .style(base_style.bg(bg))
            .render(layout[fill_start_idx], buf);
    }
}

/// Lines of the help overlay.
pub const HELP_LINES: [&str; 11] = [
    "Tab / Shift-Tab   next / previous page",
    "1 2 3             jump to a page",
    "Up Down j k       move in the selector",
    "Home End          first / last choice",
    "Space Enter       select the choice under the cursor",
    "c                 clear the selection (districts)",
    "r                 reload the page from the warehouse",
    "e                 export the table to CSV and the chart to PNG",
    "d                 toggle the debug line",
    "?                 toggle this help",
    "q Esc             quit",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shows_row_count() {
        let area = Rect::new(0, 0, 120, 1);
        let mut buf = Buffer::empty(area);
        (&Controls::new().with_row_count(Some(2))).render(area, &mut buf);
        let text: String = buf.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Rows: 2"));
        assert!(text.contains("Reload"));
    }

    #[test]
    fn keys_are_bold_and_actions_are_not() {
        let area = Rect::new(0, 0, 120, 1);
        let mut buf = Buffer::empty(area);
        (&Controls::new()).render(area, &mut buf);
        // "Tab" is centered in a five cell slot, "Page" follows it
        assert_eq!(buf[(1, 0)].symbol(), "T");
        assert!(buf[(1, 0)].modifier.contains(ratatui::style::Modifier::BOLD));
        assert_eq!(buf[(5, 0)].symbol(), "P");
        assert!(!buf[(5, 0)].modifier.contains(ratatui::style::Modifier::BOLD));
    }
}
