use crimeboard::config::{AppConfig, ColorParser, Theme, ThemeConfig};
use crimeboard::{rgb_to_256_color, rgb_to_basic_ansi};
use ratatui::style::Color;

#[test]
fn test_parse_basic_ansi_colors() {
    let parser = ColorParser::with_capabilities(true, true);

    assert_eq!(parser.parse("black").unwrap(), Color::Black);
    assert_eq!(parser.parse("red").unwrap(), Color::Red);
    assert_eq!(parser.parse("green").unwrap(), Color::Green);
    assert_eq!(parser.parse("yellow").unwrap(), Color::Yellow);
    assert_eq!(parser.parse("blue").unwrap(), Color::Blue);
    assert_eq!(parser.parse("magenta").unwrap(), Color::Magenta);
    assert_eq!(parser.parse("cyan").unwrap(), Color::Cyan);
    assert_eq!(parser.parse("white").unwrap(), Color::White);
}

#[test]
fn test_parse_bright_and_gray_names() {
    let parser = ColorParser::with_capabilities(true, true);

    assert_eq!(parser.parse("bright_red").unwrap(), Color::Indexed(9));
    assert_eq!(parser.parse("bright red").unwrap(), Color::Indexed(9));
    assert_eq!(parser.parse("BRIGHT_CYAN").unwrap(), Color::Indexed(14));
    assert_eq!(parser.parse("dark_gray").unwrap(), Color::Indexed(8));
    assert_eq!(parser.parse("grey").unwrap(), Color::Indexed(8));
    assert_eq!(parser.parse("light_gray").unwrap(), Color::Indexed(7));
}

#[test]
fn test_parse_indexed_colors() {
    let parser = ColorParser::with_capabilities(false, false);

    assert_eq!(parser.parse("indexed(236)").unwrap(), Color::Indexed(236));
    assert_eq!(parser.parse("Indexed( 0 )").unwrap(), Color::Indexed(0));
    assert!(parser.parse("indexed(256)").is_err());
    assert!(parser.parse("indexed(abc)").is_err());
}

#[test]
fn test_parse_hex_by_capability() {
    let true_color = ColorParser::with_capabilities(true, true);
    let indexed = ColorParser::with_capabilities(false, true);
    let basic = ColorParser::with_capabilities(false, false);

    assert_eq!(true_color.parse("#d7191c").unwrap(), Color::Rgb(215, 25, 28));
    assert_eq!(indexed.parse("#ff0000").unwrap(), Color::Indexed(196));
    assert_eq!(basic.parse("#ff0000").unwrap(), Color::Red);
}

#[test]
fn test_parse_invalid_colors() {
    let parser = ColorParser::with_capabilities(true, true);

    assert!(parser.parse("#ff00").is_err());
    assert!(parser.parse("#gg0000").is_err());
    assert!(parser.parse("ultraviolet").is_err());
}

#[test]
fn test_rgb_conversions() {
    assert_eq!(rgb_to_256_color(0, 0, 0), 16);
    assert_eq!(rgb_to_256_color(255, 255, 255), 231);
    assert_eq!(rgb_to_256_color(0, 0, 255), 21);
    assert_eq!(rgb_to_basic_ansi(250, 240, 10), Color::Yellow);
    assert_eq!(rgb_to_basic_ansi(20, 20, 20), Color::Black);
}

#[test]
fn test_theme_from_default_config() {
    let config = AppConfig::default();
    let parser = ColorParser::with_capabilities(true, true);
    let theme = Theme::with_parser(&config.theme, &parser).unwrap();

    assert_eq!(theme.get("primary"), Color::Cyan);
    assert_eq!(theme.get("controls_bg"), Color::Indexed(236));
    assert_eq!(theme.get("map_low"), Color::Rgb(0xfd, 0xe7, 0x25));
    assert_eq!(theme.get_optional("no_such_color"), None);
    assert_eq!(theme.series_color(0), Color::Cyan);
    assert_eq!(theme.series_color(6), Color::Cyan);
}

#[test]
fn test_theme_with_custom_colors() {
    let mut config = ThemeConfig::default();
    config.colors.primary = "#112233".to_string();
    config.colors.series = vec!["red".to_string(), "indexed(42)".to_string()];
    let theme = Theme::with_parser(&config, &ColorParser::with_capabilities(true, true)).unwrap();

    assert_eq!(theme.get("primary"), Color::Rgb(0x11, 0x22, 0x33));
    assert_eq!(theme.series_color(1), Color::Indexed(42));
    assert_eq!(theme.series_color(2), Color::Red);
}
