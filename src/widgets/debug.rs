use std::time::Duration;

use crossterm::event::KeyEvent;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::{Paragraph, Widget},
};

use crate::warehouse::CacheStats;

/// One-line status of the running app, shown with `--debug` or `d`.
#[derive(Debug, Default)]
pub struct DebugState {
    pub enabled: bool,
    pub show_cache: bool,
    pub show_timing: bool,
    pub num_events: usize,
    pub num_frames: usize,
    pub last_key: Option<String>,
    pub page: &'static str,
    pub last_render: Option<Duration>,
    pub cache: Option<CacheStats>,
}

impl DebugState {
    pub fn on_key(&mut self, event: &KeyEvent) {
        self.last_key = Some(format!("{:?}", event.code));
    }

    pub fn line(&self) -> String {
        let mut parts = vec![
            format!("page={}", self.page),
            format!("events={}", self.num_events),
            format!("frames={}", self.num_frames),
        ];
        if let Some(key) = &self.last_key {
            parts.push(format!("key={}", key));
        }
        if self.show_timing {
            if let Some(elapsed) = self.last_render {
                parts.push(format!("render={}ms", elapsed.as_millis()));
            }
        }
        if self.show_cache {
            if let Some(stats) = &self.cache {
                parts.push(format!(
                    "cache hits={} misses={} entries={}",
                    stats.hits, stats.misses, stats.entries
                ));
            }
        }
        parts.join("  ")
    }
}

impl Widget for &DebugState {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(self.line())
            .style(Style::default().fg(Color::Black).bg(Color::Yellow))
            .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_includes_enabled_sections() {
        let mut state = DebugState {
            page: "districts",
            show_timing: true,
            last_render: Some(Duration::from_millis(42)),
            cache: Some(CacheStats {
                hits: 3,
                misses: 2,
                entries: 2,
            }),
            ..Default::default()
        };
        let line = state.line();
        assert!(line.starts_with("page=districts"));
        assert!(line.contains("render=42ms"));
        assert!(!line.contains("cache"));

        state.show_cache = true;
        assert!(state.line().contains("cache hits=3 misses=2 entries=2"));
    }
}
