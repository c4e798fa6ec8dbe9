use color_eyre::eyre::eyre;
use color_eyre::Result;
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use supports_color::Stream;

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Default configuration template (commented TOML)
    pub fn generate_default_config(&self) -> String {
        DEFAULT_CONFIG_TEMPLATE.to_string()
    }

    /// Write the default template to `config.toml`. Refuses to overwrite unless `force`.
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;

        Ok(config_path)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version
    pub version: String,
    pub warehouse: WarehouseConfig,
    pub cache: CacheConfig,
    pub pages: PagesConfig,
    pub display: DisplayConfig,
    pub performance: PerformanceConfig,
    pub theme: ThemeConfig,
    pub logging: LoggingConfig,
    pub debug: DebugConfig,
}

/// BigQuery connection settings. Credentials come from the environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WarehouseConfig {
    /// Project billed for the queries
    pub project_id: String,
    pub location: Option<String>,
    pub endpoint: String,
    /// Name of the environment variable holding an OAuth access token
    pub access_token_env: String,
    pub timeout_secs: u64,
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PagesConfig {
    pub districts: DistrictsPageConfig,
    pub monthly: MonthlyPageConfig,
    pub locations: LocationsPageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistrictsPageConfig {
    pub default_selection: Vec<String>,
    pub first_year: i32,
    pub last_year: i32,
    pub chart_opacity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonthlyPageConfig {
    pub default_selection: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationsPageConfig {
    pub default_selection: Vec<String>,
    /// Categories never offered as choices
    pub excluded_categories: Vec<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: f64,
    pub pitch: f64,
    pub radius_m: f64,
    pub elevation_scale: f64,
    pub elevation_min: f64,
    pub elevation_max: f64,
    pub extruded: bool,
    pub pickable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub start_page: String,
    pub row_numbers: bool,
    /// Text shown for null pivot cells
    pub null_text: String,
    /// Share of the content area given to the chart or map (percent)
    pub chart_height_percent: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub event_poll_interval_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub colors: ColorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ColorConfig {
    pub primary: String,
    pub secondary: String,
    pub error: String,
    pub warning: String,
    pub dimmed: String,
    pub controls_bg: String,
    pub text_primary: String,
    pub text_secondary: String,
    pub table_header: String,
    pub table_border: String,
    pub table_selected: String,
    pub selector_marked: String,
    pub map_low: String,
    pub map_high: String,
    /// Palette cycled through for chart series, in order
    pub series: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
    pub show_cache: bool,
    pub show_timing: bool,
}

// Default implementations
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            warehouse: WarehouseConfig::default(),
            cache: CacheConfig::default(),
            pages: PagesConfig::default(),
            display: DisplayConfig::default(),
            performance: PerformanceConfig::default(),
            theme: ThemeConfig::default(),
            logging: LoggingConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            location: None,
            endpoint: "https://bigquery.googleapis.com/bigquery/v2".to_string(),
            access_token_env: "GOOGLE_OAUTH_ACCESS_TOKEN".to_string(),
            timeout_secs: 30,
            page_size: 10_000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 3600,
        }
    }
}

impl Default for DistrictsPageConfig {
    fn default() -> Self {
        Self {
            default_selection: vec!["PARK".to_string(), "BAYVIEW".to_string()],
            first_year: 2007,
            last_year: 2017,
            chart_opacity: 0.3,
        }
    }
}

impl Default for MonthlyPageConfig {
    fn default() -> Self {
        Self {
            default_selection: vec!["ASSAULT".to_string()],
        }
    }
}

impl Default for LocationsPageConfig {
    fn default() -> Self {
        Self {
            default_selection: vec!["ROBBERY".to_string()],
            excluded_categories: vec!["SEX OFFENSES, FORCIBLE".to_string()],
            latitude: 37.76,
            longitude: -122.4,
            zoom: 11.0,
            pitch: 50.0,
            radius_m: 200.0,
            elevation_scale: 4.0,
            elevation_min: 0.0,
            elevation_max: 1000.0,
            extruded: true,
            pickable: true,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            start_page: "districts".to_string(),
            row_numbers: false,
            null_text: "-".to_string(),
            chart_height_percent: 55,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            event_poll_interval_ms: 25,
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            primary: "cyan".to_string(),
            secondary: "yellow".to_string(),
            error: "red".to_string(),
            warning: "yellow".to_string(),
            dimmed: "dark_gray".to_string(),
            controls_bg: "indexed(236)".to_string(),
            text_primary: "white".to_string(),
            text_secondary: "dark_gray".to_string(),
            table_header: "white".to_string(),
            table_border: "cyan".to_string(),
            table_selected: "reversed".to_string(),
            selector_marked: "green".to_string(),
            map_low: "#fde725".to_string(),
            map_high: "#d7191c".to_string(),
            series: ["cyan", "yellow", "magenta", "green", "blue", "red"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: true,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            show_cache: true,
            show_timing: true,
        }
    }
}

// Configuration loading and merging
impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        Self::load_with(app_name, None)
    }

    /// Load default → user → `extra` (an explicit `--config` file). A broken
    /// user file is skipped with a warning; a broken explicit file is an error.
    pub fn load_with(app_name: &str, extra: Option<&Path>) -> Result<Self> {
        let mut config = AppConfig::default();

        match Self::load_user_config(app_name) {
            Ok(user_config) => config.merge(user_config),
            Err(e) => tracing::warn!(error = %e, "ignoring user config"),
        }

        if let Some(path) = extra {
            config.merge(Self::from_path(path)?);
        }

        config.validate()?;

        Ok(config)
    }

    /// Parse one config file without merging or validating
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre!("Failed to read config file at {}: {}", path.display(), e))?;

        toml::from_str(&content)
            .map_err(|e| eyre!("Failed to parse config file at {}: {}", path.display(), e))
    }

    /// Load user configuration from ~/.config/crimeboard/config.toml
    fn load_user_config(app_name: &str) -> Result<AppConfig> {
        let config_manager = ConfigManager::new(app_name)?;
        let config_path = config_manager.config_path("config.toml");

        if !config_path.exists() {
            return Ok(AppConfig::default());
        }

        Self::from_path(&config_path)
    }

    /// Merge another config into this one (other takes precedence where it
    /// differs from the defaults)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.warehouse.merge(other.warehouse);
        self.cache.merge(other.cache);
        self.pages.merge(other.pages);
        self.display.merge(other.display);
        self.performance.merge(other.performance);
        self.theme.merge(other.theme);
        self.logging.merge(other.logging);
        self.debug.merge(other.debug);
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        let w = &self.warehouse;
        if !(w.endpoint.starts_with("https://") || w.endpoint.starts_with("http://")) {
            return Err(eyre!(
                "warehouse.endpoint must be an http(s) URL, got '{}'",
                w.endpoint
            ));
        }
        if w.timeout_secs == 0 {
            return Err(eyre!("warehouse.timeout_secs must be greater than 0"));
        }
        if w.page_size == 0 {
            return Err(eyre!("warehouse.page_size must be greater than 0"));
        }
        if w.access_token_env.trim().is_empty() {
            return Err(eyre!("warehouse.access_token_env must name a variable"));
        }

        let d = &self.pages.districts;
        if d.first_year > d.last_year {
            return Err(eyre!(
                "pages.districts.first_year ({}) is after last_year ({})",
                d.first_year,
                d.last_year
            ));
        }
        if !(0.0..=1.0).contains(&d.chart_opacity) {
            return Err(eyre!("pages.districts.chart_opacity must be within 0..1"));
        }

        let l = &self.pages.locations;
        if l.radius_m <= 0.0 {
            return Err(eyre!("pages.locations.radius_m must be greater than 0"));
        }
        if l.elevation_min > l.elevation_max {
            return Err(eyre!(
                "pages.locations.elevation_min must not exceed elevation_max"
            ));
        }
        if !(-90.0..=90.0).contains(&l.latitude) || !(-180.0..=180.0).contains(&l.longitude) {
            return Err(eyre!("pages.locations view center is not a valid coordinate"));
        }

        match self.display.start_page.as_str() {
            "districts" | "monthly" | "locations" => {}
            other => {
                return Err(eyre!(
                    "Invalid display.start_page: {}. Must be 'districts', 'monthly', or 'locations'",
                    other
                ))
            }
        }
        if !(10..=90).contains(&self.display.chart_height_percent) {
            return Err(eyre!("display.chart_height_percent must be within 10..90"));
        }

        if self.performance.event_poll_interval_ms == 0 {
            return Err(eyre!("event_poll_interval_ms must be greater than 0"));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => return Err(eyre!("Invalid logging.level: {}", other)),
        }

        let parser = ColorParser::new();
        self.theme.colors.validate(&parser)?;

        Ok(())
    }
}

/// Take `other.$field` wherever it differs from the section default.
macro_rules! merge_changed {
    ($self:ident, $other:ident, $default:ident, [$($field:ident),+ $(,)?]) => {
        $(
            if $other.$field != $default.$field {
                $self.$field = $other.$field;
            }
        )+
    };
}

impl WarehouseConfig {
    pub fn merge(&mut self, other: Self) {
        let default = WarehouseConfig::default();
        if other.location.is_some() {
            self.location = other.location;
        }
        merge_changed!(
            self,
            other,
            default,
            [project_id, endpoint, access_token_env, timeout_secs, page_size]
        );
    }
}

impl CacheConfig {
    pub fn merge(&mut self, other: Self) {
        let default = CacheConfig::default();
        merge_changed!(self, other, default, [enabled, ttl_secs]);
    }
}

impl PagesConfig {
    pub fn merge(&mut self, other: Self) {
        self.districts.merge(other.districts);
        self.monthly.merge(other.monthly);
        self.locations.merge(other.locations);
    }
}

impl DistrictsPageConfig {
    pub fn merge(&mut self, other: Self) {
        let default = DistrictsPageConfig::default();
        merge_changed!(
            self,
            other,
            default,
            [default_selection, first_year, last_year, chart_opacity]
        );
    }
}

impl MonthlyPageConfig {
    pub fn merge(&mut self, other: Self) {
        let default = MonthlyPageConfig::default();
        merge_changed!(self, other, default, [default_selection]);
    }
}

impl LocationsPageConfig {
    pub fn merge(&mut self, other: Self) {
        let default = LocationsPageConfig::default();
        merge_changed!(
            self,
            other,
            default,
            [
                default_selection,
                excluded_categories,
                latitude,
                longitude,
                zoom,
                pitch,
                radius_m,
                elevation_scale,
                elevation_min,
                elevation_max,
                extruded,
                pickable,
            ]
        );
    }
}

impl DisplayConfig {
    pub fn merge(&mut self, other: Self) {
        let default = DisplayConfig::default();
        merge_changed!(
            self,
            other,
            default,
            [start_page, row_numbers, null_text, chart_height_percent]
        );
    }
}

impl PerformanceConfig {
    pub fn merge(&mut self, other: Self) {
        let default = PerformanceConfig::default();
        merge_changed!(self, other, default, [event_poll_interval_ms]);
    }
}

impl ThemeConfig {
    pub fn merge(&mut self, other: Self) {
        self.colors.merge(other.colors);
    }
}

impl ColorConfig {
    /// Every named color in the section, with its key
    fn named(&self) -> [(&'static str, &str); 14] {
        [
            ("primary", self.primary.as_str()),
            ("secondary", self.secondary.as_str()),
            ("error", self.error.as_str()),
            ("warning", self.warning.as_str()),
            ("dimmed", self.dimmed.as_str()),
            ("controls_bg", self.controls_bg.as_str()),
            ("text_primary", self.text_primary.as_str()),
            ("text_secondary", self.text_secondary.as_str()),
            ("table_header", self.table_header.as_str()),
            ("table_border", self.table_border.as_str()),
            ("table_selected", self.table_selected.as_str()),
            ("selector_marked", self.selector_marked.as_str()),
            ("map_low", self.map_low.as_str()),
            ("map_high", self.map_high.as_str()),
        ]
    }

    /// Validate all color strings can be parsed
    fn validate(&self, parser: &ColorParser) -> Result<()> {
        for (name, value) in self.named() {
            parser
                .parse(value)
                .map_err(|e| eyre!("Invalid color value for '{}': {}", name, e))?;
        }
        if self.series.is_empty() {
            return Err(eyre!("theme.colors.series must list at least one color"));
        }
        for (i, value) in self.series.iter().enumerate() {
            parser
                .parse(value)
                .map_err(|e| eyre!("Invalid color value for 'series[{}]': {}", i, e))?;
        }
        Ok(())
    }

    pub fn merge(&mut self, other: Self) {
        let default = ColorConfig::default();
        merge_changed!(
            self,
            other,
            default,
            [
                primary,
                secondary,
                error,
                warning,
                dimmed,
                controls_bg,
                text_primary,
                text_secondary,
                table_header,
                table_border,
                table_selected,
                selector_marked,
                map_low,
                map_high,
                series,
            ]
        );
    }
}

impl LoggingConfig {
    pub fn merge(&mut self, other: Self) {
        let default = LoggingConfig::default();
        merge_changed!(self, other, default, [level, file]);
    }
}

impl DebugConfig {
    pub fn merge(&mut self, other: Self) {
        let default = DebugConfig::default();
        merge_changed!(self, other, default, [enabled, show_cache, show_timing]);
    }
}

/// Color parser with terminal capability detection
pub struct ColorParser {
    supports_true_color: bool,
    supports_256: bool,
    no_color: bool,
}

impl ColorParser {
    /// Create a new ColorParser with automatic terminal capability detection
    pub fn new() -> Self {
        let no_color = std::env::var("NO_COLOR").is_ok();
        let support = supports_color::on(Stream::Stdout);

        Self {
            supports_true_color: support.as_ref().map(|s| s.has_16m).unwrap_or(false),
            supports_256: support.as_ref().map(|s| s.has_256).unwrap_or(false),
            no_color,
        }
    }

    /// Parser with fixed capabilities, independent of the running terminal
    pub fn with_capabilities(true_color: bool, indexed_256: bool) -> Self {
        Self {
            supports_true_color: true_color,
            supports_256: indexed_256,
            no_color: false,
        }
    }

    /// Parse `#rrggbb`, `indexed(n)` or a color name into a terminal color
    pub fn parse(&self, s: &str) -> Result<Color> {
        if self.no_color {
            return Ok(Color::Reset);
        }

        let trimmed = s.trim();
        if trimmed.starts_with('#') {
            let (r, g, b) = parse_hex(trimmed)?;
            return Ok(self.convert_rgb_to_terminal_color(r, g, b));
        }

        let lower = trimmed.to_lowercase();
        if let Some(inner) = lower
            .strip_prefix("indexed(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let num = inner.trim().parse::<u8>().map_err(|_| {
                eyre!(
                    "Invalid indexed color: '{}'. Expected format: indexed(0-255)",
                    trimmed
                )
            })?;
            return Ok(Color::Indexed(num));
        }

        named_color(&lower.replace(' ', "_")).ok_or_else(|| {
            eyre!(
                "Unknown color name: '{}'. Supported: basic ANSI colors (red, blue, etc.), \
                 bright variants (bright_red, etc.), indexed(n), or hex colors (#ff0000)",
                trimmed
            )
        })
    }

    fn convert_rgb_to_terminal_color(&self, r: u8, g: u8, b: u8) -> Color {
        if self.supports_true_color {
            Color::Rgb(r, g, b)
        } else if self.supports_256 {
            Color::Indexed(rgb_to_256_color(r, g, b))
        } else {
            rgb_to_basic_ansi(r, g, b)
        }
    }
}

impl Default for ColorParser {
    fn default() -> Self {
        Self::new()
    }
}

fn named_color(name: &str) -> Option<Color> {
    let color = match name {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        "bright_black" | "gray" | "grey" | "dark_gray" | "dark_grey" => Color::Indexed(8),
        "bright_red" => Color::Indexed(9),
        "bright_green" => Color::Indexed(10),
        "bright_yellow" => Color::Indexed(11),
        "bright_blue" => Color::Indexed(12),
        "bright_magenta" => Color::Indexed(13),
        "bright_cyan" => Color::Indexed(14),
        "bright_white" => Color::Indexed(15),
        "light_gray" | "light_grey" => Color::Indexed(7),
        // Modifiers are applied at render time
        "reset" | "reversed" => Color::Reset,
        _ => return None,
    };
    Some(color)
}

/// Parse hex color string (#ff0000) to RGB components
fn parse_hex(s: &str) -> Result<(u8, u8, u8)> {
    let digits = s
        .strip_prefix('#')
        .filter(|d| d.len() == 6 && d.is_ascii())
        .ok_or_else(|| eyre!("Invalid hex color format: '{}'. Expected format: #rrggbb", s))?;

    let component = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16)
            .map_err(|_| eyre!("Invalid hex color component in {}", s))
    };

    Ok((component(0..2)?, component(2..4)?, component(4..6)?))
}

/// Convert RGB to the nearest xterm 256-color palette index
pub fn rgb_to_256_color(r: u8, g: u8, b: u8) -> u8 {
    let spread = r.max(g).max(b) as i16 - r.min(g).min(b) as i16;
    if spread < 10 {
        // Grayscale ramp 232..=255
        let gray = (r as u16 + g as u16 + b as u16) / 3;
        return match gray {
            0..=7 => 16,
            248..=255 => 231,
            _ => 232 + ((gray - 8) * 24 / 240) as u8,
        };
    }

    // 6x6x6 cube 16..=231
    let level = |c: u8| (c as u16 * 5 / 255) as u8;
    16 + 36 * level(r) + 6 * level(g) + level(b)
}

/// Convert RGB to the nearest of the 8 basic ANSI colors
pub fn rgb_to_basic_ansi(r: u8, g: u8, b: u8) -> Color {
    let spread = r.max(g).max(b) as i16 - r.min(g).min(b) as i16;
    if spread < 30 {
        let avg = (r as u16 + g as u16 + b as u16) / 3;
        return if avg < 64 { Color::Black } else { Color::White };
    }

    match (r > 128, g > 128, b > 128) {
        (false, false, false) => Color::Black,
        (true, false, false) => Color::Red,
        (false, true, false) => Color::Green,
        (true, true, false) => Color::Yellow,
        (false, false, true) => Color::Blue,
        (true, false, true) => Color::Magenta,
        (false, true, true) => Color::Cyan,
        (true, true, true) => Color::White,
    }
}

/// Theme containing parsed colors ready for use
#[derive(Debug, Clone)]
pub struct Theme {
    pub colors: HashMap<String, Color>,
    pub series: Vec<Color>,
}

impl Theme {
    /// Parse every color of `config`
    pub fn from_config(config: &ThemeConfig) -> Result<Self> {
        Self::with_parser(config, &ColorParser::new())
    }

    pub fn with_parser(config: &ThemeConfig, parser: &ColorParser) -> Result<Self> {
        let mut colors = HashMap::new();
        for (name, value) in config.colors.named() {
            colors.insert(name.to_string(), parser.parse(value)?);
        }
        let series = config
            .colors
            .series
            .iter()
            .map(|value| parser.parse(value))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { colors, series })
    }

    /// Get a color by name, returns Reset if not found
    pub fn get(&self, name: &str) -> Color {
        self.colors.get(name).copied().unwrap_or(Color::Reset)
    }

    pub fn get_optional(&self, name: &str) -> Option<Color> {
        self.colors.get(name).copied()
    }

    /// Color for the `index`-th chart series, cycling through the palette
    pub fn series_color(&self, index: usize) -> Color {
        if self.series.is_empty() {
            return Color::Reset;
        }
        self.series[index % self.series.len()]
    }
}

impl Default for Theme {
    fn default() -> Self {
        let parser = ColorParser::with_capabilities(true, true);
        Self::with_parser(&ThemeConfig::default(), &parser).unwrap_or_else(|_| Self {
            colors: HashMap::new(),
            series: Vec::new(),
        })
    }
}

// Default configuration template
const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../config/default.toml");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_only_takes_changed_fields() {
        let mut base = AppConfig::default();
        base.warehouse.project_id = "from-user".into();

        let mut other = AppConfig::default();
        other.cache.ttl_secs = 60;
        base.merge(other);

        assert_eq!(base.warehouse.project_id, "from-user");
        assert_eq!(base.cache.ttl_secs, 60);
    }

    #[test]
    fn hex_parsing_respects_capabilities() {
        let rgb = ColorParser::with_capabilities(true, true);
        assert_eq!(rgb.parse("#ff0000").unwrap(), Color::Rgb(255, 0, 0));
        let basic = ColorParser::with_capabilities(false, false);
        assert_eq!(basic.parse("#ff0000").unwrap(), Color::Red);
        assert!(rgb.parse("#ff00").is_err());
        assert!(rgb.parse("#gg0000").is_err());
    }

    #[test]
    fn series_color_cycles() {
        let theme = Theme::default();
        assert_eq!(theme.series_color(0), theme.series_color(theme.series.len()));
    }
}
