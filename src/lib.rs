use color_eyre::eyre::eyre;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::PathBuf;
use std::time::Duration;

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, TableState, Wrap};
use ratatui::{buffer::Buffer, layout::Rect, widgets::StatefulWidget, widgets::Widget};

pub mod cache;
pub mod chart_data;
pub mod chart_export;
pub mod config;
pub mod error;
pub mod error_display;
pub mod filter;
pub mod headless;
pub mod logging;
pub mod map_layer;
pub mod pages;
pub mod query;
pub mod reshape;
pub mod selection;
pub mod warehouse;
pub mod widgets;

pub use cache::{CacheManager, QueryCache};
pub use config::{
    rgb_to_256_color, rgb_to_basic_ansi, AppConfig, ColorParser, ConfigManager, DisplayConfig,
    Theme,
};
pub use crimeboard_cli::{Args, PageArg};
pub use error::{DashboardError, WarehouseError};
pub use pages::{Dashboard, Notice, NoticeKind, Outcome, PageId, PageView, RenderResult, Visual};
pub use selection::{Selection, SelectionMode, SelectorState};
pub use warehouse::{BigQueryClient, CachedWarehouse, WarehouseClient};

use chart_data::{prepare_chart, PreparedChart};
use widgets::chart::ChartView;
use widgets::controls::{Controls, HELP_LINES};
use widgets::datatable::PivotTableView;
use widgets::debug::DebugState;
use widgets::map::MapView;
use widgets::selector::Selector;

/// Application name used for cache directory and other app-specific paths
pub const APP_NAME: &str = "crimeboard";

const SELECTOR_WIDTH: u16 = 32;

/// Build the warehouse client from config: BigQuery, memoized unless the
/// cache is disabled.
pub fn build_warehouse(config: &AppConfig) -> Result<Box<dyn WarehouseClient>> {
    if config.warehouse.project_id.trim().is_empty() {
        return Err(eyre!(
            "No GCP project configured. Set [warehouse] project_id in the config file or pass --project"
        ));
    }
    let client = BigQueryClient::new(&config.warehouse);
    if config.cache.enabled {
        let ttl = Duration::from_secs(config.cache.ttl_secs);
        Ok(Box::new(CachedWarehouse::new(client, ttl)))
    } else {
        Ok(Box::new(client))
    }
}

/// Start page: `--page` when given, else `[display] start_page`.
pub fn start_page(args: &Args, config: &AppConfig) -> PageId {
    args.page
        .map(PageId::from)
        .or_else(|| PageId::parse(&config.display.start_page))
        .unwrap_or(PageId::Districts)
}

#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    /// Show the loading state for a page, then render it
    Load(PageId),
    /// Internal event to run the page render after the UI shows "Loading"
    DoLoad(PageId),
    /// Drop memoized query results and render the active page again
    Reload,
    Export,
    Exit,
    Crash(String),
    Resize(u16, u16), // resized (width, height)
}

/// Per-page UI state: the selector and the latest render.
struct PageSlot {
    selector: SelectorState,
    result: Option<RenderResult>,
    chart: Option<PreparedChart>,
    table_state: TableState,
}

impl PageSlot {
    fn new(mode: SelectionMode) -> Self {
        Self {
            selector: SelectorState::new(mode),
            result: None,
            chart: None,
            table_state: TableState::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Status {
    Info(String),
    Error(String),
}

pub struct App {
    warehouse: Box<dyn WarehouseClient>,
    dashboard: Dashboard,
    theme: Theme,
    display: DisplayConfig,
    active: PageId,
    slots: [PageSlot; 3],
    loading: Option<PageId>,
    status: Option<Status>,
    show_help: bool,
    export_dir: PathBuf,
    debug: DebugState,
}

impl App {
    pub fn new(warehouse: Box<dyn WarehouseClient>, config: &AppConfig, theme: Theme) -> Self {
        let dashboard = Dashboard::new(&config.pages);
        let slots = PageId::ALL.map(|id| PageSlot::new(dashboard.selection_mode(id)));
        let debug = DebugState {
            enabled: config.debug.enabled,
            show_cache: config.debug.show_cache,
            show_timing: config.debug.show_timing,
            page: PageId::Districts.as_str(),
            ..Default::default()
        };
        Self {
            warehouse,
            dashboard,
            theme,
            display: config.display.clone(),
            active: PageId::Districts,
            slots,
            loading: None,
            status: None,
            show_help: false,
            export_dir: PathBuf::from("."),
            debug,
        }
    }

    pub fn enable_debug(&mut self) {
        self.debug.enabled = true;
    }

    pub fn with_export_dir(mut self, dir: PathBuf) -> Self {
        self.export_dir = dir;
        self
    }

    /// Open on `page`, optionally with an explicit selection instead of the
    /// configured defaults. Returns the event that performs the first render.
    pub fn start(&mut self, page: PageId, selection: Option<Selection>) -> AppEvent {
        self.active = page;
        self.debug.page = page.as_str();
        if let Some(selection) = selection {
            let mode = self.dashboard.selection_mode(page);
            self.slot_mut(page).selector = SelectorState::with_selection(mode, selection);
        }
        AppEvent::Load(page)
    }

    pub fn active_page(&self) -> PageId {
        self.active
    }

    pub fn selector(&self, page: PageId) -> &SelectorState {
        &self.slots[page.index()].selector
    }

    pub fn last_result(&self, page: PageId) -> Option<&RenderResult> {
        self.slots[page.index()].result.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    /// Current status line text, if any.
    pub fn status(&self) -> Option<&str> {
        match &self.status {
            Some(Status::Info(s)) | Some(Status::Error(s)) => Some(s),
            None => None,
        }
    }

    fn slot_mut(&mut self, page: PageId) -> &mut PageSlot {
        &mut self.slots[page.index()]
    }

    /// Run the render cycle for `page` and keep its result.
    pub fn render_page(&mut self, page: PageId) {
        let warehouse = self.warehouse.as_ref();
        let dashboard = &self.dashboard;
        let slot = &mut self.slots[page.index()];
        let result = dashboard.render_selector(page, warehouse, &mut slot.selector);

        slot.chart = None;
        if let Some(Visual::Chart(series)) = result.view().map(|v| &v.visual) {
            match prepare_chart(series) {
                Ok(chart) => slot.chart = Some(chart),
                Err(e) => {
                    tracing::error!(page = page.as_str(), error = %e, "chart preparation failed");
                    self.status = Some(Status::Error(error_display::user_message(&e)));
                }
            }
        }
        slot.table_state = TableState::default();
        self.debug.last_render = Some(result.elapsed);
        self.debug.cache = self.warehouse.cache_stats();
        slot.result = Some(result);
        self.loading = None;
    }

    pub fn event(&mut self, event: &AppEvent) -> Option<AppEvent> {
        self.debug.num_events += 1;
        match event {
            AppEvent::Key(key) => self.key(key),
            AppEvent::Load(page) => {
                self.loading = Some(*page);
                self.status = None;
                Some(AppEvent::DoLoad(*page))
            }
            AppEvent::DoLoad(page) => {
                self.render_page(*page);
                None
            }
            AppEvent::Reload => {
                self.warehouse.invalidate();
                tracing::info!(page = self.active.as_str(), "reloading from warehouse");
                Some(AppEvent::Load(self.active))
            }
            AppEvent::Export => {
                self.status = Some(match self.export_active() {
                    Ok(paths) => Status::Info(format!("Exported {}", paths.join(", "))),
                    Err(e) => Status::Error(format!("Export failed: {}", e)),
                });
                None
            }
            AppEvent::Resize(_, _) => None,
            AppEvent::Exit | AppEvent::Crash(_) => None,
        }
    }

    fn key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        self.debug.on_key(event);

        if event.modifiers.contains(KeyModifiers::CONTROL) && event.code == KeyCode::Char('c') {
            return Some(AppEvent::Exit);
        }
        if self.show_help {
            self.show_help = false;
            return None;
        }
        // Keys wait while a render is pending
        if self.loading.is_some() {
            return None;
        }

        let selector = &mut self.slots[self.active.index()].selector;
        match event.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(AppEvent::Exit),
            KeyCode::Tab => self.switch_page(self.active.next()),
            KeyCode::BackTab => self.switch_page(self.active.prev()),
            KeyCode::Char('1') => self.switch_page(PageId::Districts),
            KeyCode::Char('2') => self.switch_page(PageId::Monthly),
            KeyCode::Char('3') => self.switch_page(PageId::Locations),
            KeyCode::Up | KeyCode::Char('k') => {
                selector.cursor_up();
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                selector.cursor_down();
                None
            }
            KeyCode::Home | KeyCode::Char('g') => {
                selector.cursor_first();
                None
            }
            KeyCode::End | KeyCode::Char('G') => {
                selector.cursor_last();
                None
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                if selector.activate() {
                    Some(AppEvent::Load(self.active))
                } else {
                    None
                }
            }
            KeyCode::Char('c') => {
                if selector.clear() {
                    Some(AppEvent::Load(self.active))
                } else {
                    None
                }
            }
            KeyCode::Char('r') => Some(AppEvent::Reload),
            KeyCode::Char('e') => Some(AppEvent::Export),
            KeyCode::Char('d') => {
                self.debug.enabled = !self.debug.enabled;
                None
            }
            KeyCode::Char('?') => {
                self.show_help = true;
                None
            }
            _ => None,
        }
    }

    /// Every page switch is an interaction, so the page renders again.
    fn switch_page(&mut self, page: PageId) -> Option<AppEvent> {
        self.active = page;
        self.debug.page = page.as_str();
        Some(AppEvent::Load(page))
    }

    /// Export the active page's table (CSV) and chart (PNG) into the export directory.
    fn export_active(&self) -> Result<Vec<String>> {
        let slot = &self.slots[self.active.index()];
        let result = slot
            .result
            .as_ref()
            .ok_or_else(|| eyre!("The page has not been rendered yet"))?;
        let view = result
            .view()
            .ok_or_else(|| eyre!("The page shows no data"))?;

        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let stem = format!("{}-{}-{}", APP_NAME, self.active.as_str(), stamp);
        let table_path = view
            .table
            .as_ref()
            .map(|_| self.export_dir.join(format!("{}.csv", stem)));
        let chart_path = matches!(view.visual, Visual::Chart(_))
            .then(|| self.export_dir.join(format!("{}.png", stem)));
        if table_path.is_none() && chart_path.is_none() {
            return Err(eyre!("The {} page has nothing to export", self.active.as_str()));
        }

        headless::export_result(result, table_path.as_deref(), chart_path.as_deref())?;
        Ok(table_path
            .iter()
            .chain(chart_path.iter())
            .map(|p| p.display().to_string())
            .collect())
    }

    fn render_tabs(&self, area: Rect, buf: &mut Buffer) {
        let mut spans: Vec<Span> = Vec::new();
        for (i, id) in PageId::ALL.iter().enumerate() {
            let label = format!(" {} {} ", i + 1, self.dashboard.title(*id));
            let style = if *id == self.active {
                Style::default()
                    .fg(self.theme.get("primary"))
                    .add_modifier(Modifier::BOLD | Modifier::REVERSED)
            } else {
                Style::default().fg(self.theme.get("text_secondary"))
            };
            spans.push(Span::styled(label, style));
            spans.push(Span::raw(" "));
        }
        match &self.status {
            Some(Status::Info(msg)) => {
                spans.push(Span::styled(msg.as_str(), Style::default().fg(self.theme.get("secondary"))))
            }
            Some(Status::Error(msg)) => {
                spans.push(Span::styled(msg.as_str(), Style::default().fg(self.theme.get("error"))))
            }
            None => {}
        }
        Paragraph::new(Line::from(spans))
            .style(Style::default().bg(self.theme.get("controls_bg")))
            .render(area, buf);
    }

    fn render_content(&mut self, area: Rect, buf: &mut Buffer) {
        let slot = &mut self.slots[self.active.index()];
        let theme = &self.theme;

        if self.loading == Some(self.active) || slot.result.is_none() {
            Paragraph::new(format!("Loading {}...", self.dashboard.title(self.active)))
                .style(Style::default().fg(theme.get("text_secondary")))
                .centered()
                .block(Block::default().borders(Borders::ALL))
                .render(area, buf);
            return;
        }
        let Some(result) = slot.result.as_ref() else {
            return;
        };

        let view = match &result.outcome {
            Outcome::View(view) => view,
            Outcome::Notice(notice) => {
                let color = match notice.kind {
                    NoticeKind::Validation => theme.get("warning"),
                    NoticeKind::Connectivity | NoticeKind::Failure => theme.get("error"),
                };
                Paragraph::new(notice.message.as_str())
                    .style(Style::default().fg(color))
                    .wrap(Wrap { trim: true })
                    .block(
                        Block::default()
                            .borders(Borders::ALL)
                            .border_style(Style::default().fg(color))
                            .title(format!(" {} ", result.heading)),
                    )
                    .render(area, buf);
                return;
            }
        };

        let visual_area = match &view.table {
            Some(table) => {
                let chart_pct = self.display.chart_height_percent;
                let layout = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Percentage(100 - chart_pct),
                        Constraint::Percentage(chart_pct),
                    ])
                    .split(area);
                PivotTableView::new(table, &view.table_title)
                    .with_null_text(&self.display.null_text)
                    .with_row_numbers(self.display.row_numbers)
                    .with_colors(theme.get("table_header"), theme.get("table_border"))
                    .render(layout[0], buf, &mut slot.table_state);
                layout[1]
            }
            None => area,
        };

        match &view.visual {
            Visual::Chart(_) => {
                if let Some(chart) = &slot.chart {
                    let title = format!("{} by {}", chart.y_title, chart.x_title);
                    ChartView::new(chart, theme, &title).render(visual_area, buf);
                }
            }
            Visual::Map(layer) => {
                let title = format!("{}: {}", view.table_title, result.selection.keys().join(", "));
                MapView::new(layer, theme, &title).render(visual_area, buf);
            }
        }
    }

    fn render_help(&self, area: Rect, buf: &mut Buffer) {
        let popup = centered_rect(area, 70, 60);
        Clear.render(popup, buf);
        let lines: Vec<Line> = HELP_LINES.iter().map(|l| Line::from(*l)).collect();
        Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.get("primary")))
                    .title(" Help "),
            )
            .render(popup, buf);
    }
}

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.debug.num_frames += 1;

        let mut constraints = vec![
            Constraint::Length(1), // Page tabs and status
            Constraint::Fill(1),
            Constraint::Length(1), // Controls
        ];
        if self.debug.enabled {
            constraints.push(Constraint::Length(1));
        }
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        self.render_tabs(layout[0], buf);

        let main = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SELECTOR_WIDTH), Constraint::Fill(1)])
            .split(layout[1]);
        let noun = self.dashboard.noun(self.active);
        let label = capitalize(noun);
        Selector::new(&self.slots[self.active.index()].selector, &self.theme, &label)
            .with_focused(!self.show_help)
            .render(main[0], buf);
        self.render_content(main[1], buf);

        let row_count = self.slots[self.active.index()]
            .result
            .as_ref()
            .and_then(|r| r.view())
            .and_then(|v| v.table.as_ref())
            .map(|t| t.height());
        let controls = Controls::new()
            .with_row_count(row_count)
            .with_dimmed(self.show_help || self.loading.is_some())
            .with_background(self.theme.get("controls_bg"));
        controls.render(layout[2], buf);

        if self.debug.enabled {
            self.debug.render(layout[3], buf);
        }
        if self.show_help {
            self.render_help(area, buf);
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn centered_rect(r: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalizes_nouns() {
        assert_eq!(capitalize("district"), "District");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn build_warehouse_requires_project() {
        let config = AppConfig::default();
        let err = build_warehouse(&config).err().expect("missing project is an error");
        assert!(err.to_string().contains("project_id"));
    }

    #[test]
    fn start_page_prefers_cli() {
        let mut config = AppConfig::default();
        config.display.start_page = "monthly".to_string();
        let args = <Args as clap::Parser>::parse_from(["crimeboard"]);
        assert_eq!(start_page(&args, &config), PageId::Monthly);
        let args = <Args as clap::Parser>::parse_from(["crimeboard", "--page", "locations"]);
        assert_eq!(start_page(&args, &config), PageId::Locations);
    }
}
