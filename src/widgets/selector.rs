use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, StatefulWidget, Widget},
};

use crate::config::Theme;
use crate::selection::{SelectionMode, SelectorState};

/// Multiselect or select box over a page's choices.
pub struct Selector<'a> {
    state: &'a SelectorState,
    theme: &'a Theme,
    label: &'a str,
    focused: bool,
}

impl<'a> Selector<'a> {
    pub fn new(state: &'a SelectorState, theme: &'a Theme, label: &'a str) -> Self {
        Self {
            state,
            theme,
            label,
            focused: true,
        }
    }

    pub fn with_focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }
}

fn marker(mode: SelectionMode, selected: bool) -> &'static str {
    match (mode, selected) {
        (SelectionMode::Multi, true) => "[x] ",
        (SelectionMode::Multi, false) => "[ ] ",
        (SelectionMode::Single, true) => "(•) ",
        (SelectionMode::Single, false) => "( ) ",
    }
}

impl Widget for Selector<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let selection = self.state.selection();
        let title = match self.state.mode() {
            SelectionMode::Multi => format!(" {} ({}) ", self.label, selection.len()),
            SelectionMode::Single => format!(" {} ", self.label),
        };
        let border = if self.focused {
            self.theme.get("primary")
        } else {
            self.theme.get("dimmed")
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(title);

        let marked = Style::default().fg(self.theme.get("selector_marked"));
        let unmarked = Style::default().fg(self.theme.get("text_primary"));
        let items: Vec<ListItem> = self
            .state
            .choices()
            .iter()
            .map(|choice| {
                let selected = selection.contains(choice);
                let style = if selected { marked } else { unmarked };
                ListItem::new(Line::from(vec![
                    Span::styled(marker(self.state.mode(), selected), style),
                    Span::styled(choice.as_str(), style),
                ]))
            })
            .collect();

        let mut list_state = ListState::default();
        if !self.state.choices().is_empty() {
            list_state.select(Some(self.state.cursor()));
        }
        let highlight = if self.focused {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        StatefulWidget::render(
            List::new(items).block(block).highlight_style(highlight),
            area,
            buf,
            &mut list_state,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::Selection;

    #[test]
    fn marks_selected_choices() {
        let mut state = SelectorState::new(SelectionMode::Multi);
        state.set_choices(
            vec!["BAYVIEW".to_string(), "PARK".to_string()],
            &Selection::single("PARK"),
        );
        let theme = Theme::default();
        let area = Rect::new(0, 0, 24, 5);
        let mut buf = Buffer::empty(area);
        Selector::new(&state, &theme, "District").render(area, &mut buf);
        let rows: Vec<String> = (0..area.height)
            .map(|y| (0..area.width).map(|x| buf[(x, y)].symbol()).collect())
            .collect();
        assert!(rows[0].contains("District (1)"));
        assert!(rows[1].contains("[ ] BAYVIEW"));
        assert!(rows[2].contains("[x] PARK"));
    }
}
