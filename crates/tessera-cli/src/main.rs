mod app;
mod view;

use anyhow::{Context, Result, anyhow};
use app::{App, Pane};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use relative_path::RelativePathBuf;
use std::{
    env,
    fs::File,
    io::{Stdout, stdout},
    path::{Path, PathBuf},
    process,
};
use tessera_config::{Config, LocatorSettings};
use tessera_engine::{BlockTypeRegistry, io, locate::LocatorConfig};

/// At most this many documents are shown side by side.
const MAX_PANES: usize = 2;

fn main() -> Result<()> {
    init_logging();
    log::info!("tessera-cli starting up");

    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };
    let locator = config
        .as_ref()
        .map(|config| locator_config(&config.locator))
        .unwrap_or_default();

    let documents = if args.len() > 1 {
        if args.len() > MAX_PANES + 1 {
            eprintln!("Usage: {} [FILE [FILE]]", args[0]);
            process::exit(1);
        }
        args[1..]
            .iter()
            .map(|arg| split_path(Path::new(arg)))
            .collect::<Result<Vec<_>>>()?
    } else {
        match &config {
            Some(config) => match documents_in(&config.documents_path) {
                Ok(documents) => documents,
                Err(e) => {
                    eprintln!(
                        "Error: Documents path '{}' from config file '{}' is invalid: {e}",
                        config.documents_path.display(),
                        config_path.display()
                    );
                    process::exit(1);
                }
            },
            None => {
                eprintln!("Error: No document given and no config file found");
                eprintln!("Usage: {} [FILE [FILE]]", args[0]);
                eprintln!("Or create a config file at {}", config_path.display());
                process::exit(1);
            }
        }
    };
    if documents.is_empty() {
        eprintln!("Error: No .md or .json documents found");
        process::exit(1);
    }

    let registry = BlockTypeRegistry::standard();
    let panes = documents
        .iter()
        .map(|(root, path)| Pane::open(registry.clone(), locator.clone(), root, path))
        .collect::<Result<Vec<_>>>()?;
    let mut app = App::new(registry, locator, panes, &documents[0].0);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

/// Logs go to a file; the terminal belongs to the UI.
fn init_logging() {
    let log_path = env::temp_dir().join("tessera-cli.log");
    let mut builder = env_logger::Builder::new();
    builder.filter_level(log::LevelFilter::Info).parse_default_env();
    match File::create(&log_path) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(_) => {
            builder.filter_level(log::LevelFilter::Off);
        }
    }
    builder.init();
}

fn locator_config(settings: &LocatorSettings) -> LocatorConfig {
    LocatorConfig {
        hover_threshold: settings.hover_threshold,
        tie_band: settings.tie_band,
        sample_offsets: settings.sample_offsets.clone(),
        lateral_offset: settings.lateral_offset,
    }
}

/// Splits a file argument into the directory it lives in and its name.
fn split_path(path: &Path) -> Result<(PathBuf, RelativePathBuf)> {
    let name = path
        .file_name()
        .ok_or_else(|| anyhow!("not a file: {}", path.display()))?;
    let root = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((root, RelativePathBuf::from_path(name)?))
}

/// The first documents found below `root`.
fn documents_in(root: &Path) -> Result<Vec<(PathBuf, RelativePathBuf)>> {
    io::scan_documents(root)?
        .into_iter()
        .take(MAX_PANES)
        .map(|file| {
            let relative = file
                .strip_prefix(root)
                .with_context(|| format!("{} is outside {}", file.display(), root.display()))?;
            Ok((root.to_path_buf(), RelativePathBuf::from_path(relative)?))
        })
        .collect()
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| view::ui(f, app))?;

        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if app.handle_key(key) {
                    return Ok(());
                }
            }
            Event::Mouse(mouse) => app.handle_mouse(mouse),
            _ => {}
        }
    }
}
