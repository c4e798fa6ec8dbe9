use clap::Parser;
use color_eyre::Result;
use crimeboard::headless::{export_result, format_report, render_once};
use crimeboard::logging::init_tracing;
use crimeboard::{
    build_warehouse, start_page, App, AppConfig, AppEvent, Args, CacheManager, ConfigManager,
    Dashboard, NoticeKind, Selection, Theme, APP_NAME,
};
use ratatui::DefaultTerminal;
use std::sync::mpsc::channel;
use std::process::ExitCode;
use std::time::Duration;

fn render(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    terminal.draw(|frame| frame.render_widget(app, frame.area()))?;
    Ok(())
}

fn run(mut terminal: DefaultTerminal, mut app: App, first: AppEvent, poll: Duration) -> Result<()> {
    let (tx, rx) = channel::<AppEvent>();
    render(&mut terminal, &mut app)?;
    tx.send(first)?;

    loop {
        if crossterm::event::poll(poll)? {
            match crossterm::event::read()? {
                crossterm::event::Event::Key(key) => tx.send(AppEvent::Key(key))?,
                crossterm::event::Event::Resize(cols, rows) => {
                    tx.send(AppEvent::Resize(cols, rows))?
                }
                _ => {}
            }
        }

        let updated = match rx.recv_timeout(Duration::from_millis(0)) {
            Ok(event) => {
                match event {
                    AppEvent::Exit => break,
                    AppEvent::Crash(msg) => {
                        return Err(color_eyre::eyre::eyre!(msg));
                    }
                    event => {
                        if let Some(event) = app.event(&event) {
                            tx.send(event)?;
                        }
                    }
                }
                true
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => false,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };

        if updated {
            render(&mut terminal, &mut app)?;
        }
    }
    Ok(())
}

/// Exit status for a page that rendered a notice instead of content.
fn notice_exit_code(kind: NoticeKind) -> u8 {
    match kind {
        NoticeKind::Validation => 2,
        NoticeKind::Connectivity | NoticeKind::Failure => 1,
    }
}

/// Render once to stdout and/or export files.
fn run_headless(args: &Args, config: &AppConfig) -> Result<ExitCode> {
    let warehouse = build_warehouse(config)?;
    let dashboard = Dashboard::new(&config.pages);
    let page = start_page(args, config);
    let selection = selection_arg(args);

    let result = render_once(&dashboard, warehouse.as_ref(), page, selection.as_ref());
    if args.print {
        print!("{}", format_report(&result, &config.display)?);
    }
    if let Some(notice) = result.notice() {
        if !args.print {
            eprintln!("{}", notice.message);
        }
        return Ok(ExitCode::from(notice_exit_code(notice.kind)));
    }
    if args.export_table.is_some() || args.export_chart.is_some() {
        export_result(
            &result,
            args.export_table.as_deref(),
            args.export_chart.as_deref(),
        )?;
        for path in args.export_table.iter().chain(args.export_chart.iter()) {
            println!("Wrote {}", path.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn selection_arg(args: &Args) -> Option<Selection> {
    if args.select.is_empty() {
        None
    } else {
        Some(Selection::from_keys(args.select.iter().cloned()))
    }
}

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.clear_cache {
        match CacheManager::new(APP_NAME) {
            Ok(cache) => {
                match cache.clear_all() {
                    Ok(removed) => println!("Cache cleared successfully ({} files)", removed),
                    Err(e) => {
                        eprintln!("Error clearing cache: {}", e);
                        std::process::exit(1);
                    }
                }
                return Ok(Some(()));
            }
            Err(_e) => {
                println!("No cache to clear");
                return Ok(Some(()));
            }
        }
    }

    if args.generate_config {
        match ConfigManager::new(APP_NAME) {
            Ok(config) => match config.write_default_config(args.force) {
                Ok(path) => {
                    println!("Configuration written to {}", path.display());
                    return Ok(Some(()));
                }
                Err(e) => {
                    eprintln!("Error writing configuration: {}", e);
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("Error initializing config manager: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(None)
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(ExitCode::SUCCESS);
    }

    color_eyre::install()?;

    let mut config = AppConfig::load_with(APP_NAME, args.config.as_deref())?;
    if let Some(project) = &args.project {
        config.warehouse.project_id = project.clone();
    }
    let debug = args.debug || config.debug.enabled;

    // The guard flushes the log file on drop. Every exit below returns
    // through here so it is dropped.
    let _log_guard = match CacheManager::new(APP_NAME).and_then(|cache| cache.log_dir()) {
        Ok(dir) => init_tracing(&config.logging, debug, &dir)?,
        Err(e) => {
            eprintln!("Warning: file logging disabled: {}", e);
            None
        }
    };
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting {}", APP_NAME);

    if args.is_headless() {
        return run_headless(&args, &config);
    }

    let theme = Theme::from_config(&config.theme)?;
    let warehouse = build_warehouse(&config)?;
    let mut app = App::new(warehouse, &config, theme);
    if debug {
        app.enable_debug();
    }
    let first = app.start(start_page(&args, &config), selection_arg(&args));
    let poll = Duration::from_millis(config.performance.event_poll_interval_ms);

    let terminal = ratatui::init();
    let result = run(terminal, app, first, poll);
    ratatui::restore();
    if let Err(e) = result {
        tracing::error!(error = %e, "terminal session failed");
        eprintln!("Error: {}", e);
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
