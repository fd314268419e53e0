use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tvsift::controller::Controller;
use tvsift::domain::{TVConfig, TVError};
use tvsift::loader::load_data_file;
use tvsift::model::{Model, Status};
use tvsift::search::SearchConfig;
use tvsift::ui::TableUI;

/// A tui based tabular data viewer with keyword, field and date range filtering.
#[derive(Parser, Debug)]
#[command(name = "tvsift", version, about)]
struct Args {
    /// Data file to open (.csv, .parquet, .arrow)
    path: String,

    /// Text column searched by the keyword, repeatable. Defaults to every string column
    #[arg(short = 'k', long = "keyword-field")]
    keyword_fields: Vec<String>,

    /// Column the date range filter applies to. Defaults to the first date column
    #[arg(short, long)]
    date_field: Option<String>,

    /// Maximum width of a table column
    #[arg(long, default_value_t = 32)]
    max_column_width: usize,

    /// Event poll interval in milliseconds
    #[arg(long = "poll-ms", default_value_t = 100)]
    poll_ms: u64,

    /// Where to write the log, defaults to tvsift.log in the temp dir
    #[arg(long)]
    log_file: Option<String>,
}

fn expand_path(path: &str) -> Result<PathBuf, TVError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| TVError::loading_failed(format!("cannot expand {path}: {e}")))
}

fn build_config(args: Args) -> Result<TVConfig, TVError> {
    let mut config = TVConfig::default()
        .path(expand_path(&args.path)?)
        .keyword_fields(args.keyword_fields)
        .date_field(args.date_field)
        .max_column_width(args.max_column_width)
        .event_poll_time(args.poll_ms);
    if let Some(log_file) = args.log_file {
        config = config.log_file(expand_path(&log_file)?);
    }
    Ok(config)
}

/// Log to a file, the terminal belongs to the UI. Level via `RUST_LOG`, default `info`.
fn init_tracing(config: &TVConfig) -> Result<(), TVError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true),
        )
        .with(filter)
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Err(e) => {
            error!("Exiting with error: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: Args) -> Result<(), TVError> {
    let config = build_config(args)?;
    init_tracing(&config)?;
    info!("Starting tvsift with {:?}", config);

    let hints = SearchConfig {
        keyword_fields: config.keyword_fields.clone(),
        date_field: config.date_field.clone(),
    };
    let dataset = load_data_file(&config.path, &hints)?;

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &config, dataset);
    ratatui::restore();
    result
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    config: &TVConfig,
    dataset: tvsift::loader::Dataset,
) -> Result<(), TVError> {
    let size = terminal.size()?;
    let mut model = Model::init(config, dataset, size.width as usize, size.height as usize);
    let mut ui = TableUI::new();
    let controller = Controller::new(config);

    while model.status != Status::QUITTING {
        terminal.draw(|f| ui.draw(&model, f))?;
        let message = controller.handle_event(&model)?;
        model.update(message)?;
    }
    Ok(())
}
