//! Marksboard CLI
//!
//! Command-line front end for the marks dashboard:
//! - Submit a record
//! - List records or the top performers
//! - Draw the chart once, or watch it update live

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use marksboard::config::{generate_default_config, Config};
use marksboard::dashboard::{
    marks_policy_for, render, ChartState, Dashboard, RefreshStrategy, SubmissionForm, SubmitError,
};
use marksboard::record::Record;
use marksboard::store::RecordStore;

#[derive(Parser)]
#[command(name = "marksboard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Submit candidate marks and watch them on a live bar chart")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: platform config dir, then ./marksboard.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Store backend (rest, document, memory)
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// REST API base URL, including /api
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Output format for list and top (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit a candidate's marks
    Submit {
        /// Candidate name
        #[arg(short, long)]
        name: String,
        /// Marks, as typed
        #[arg(short, long, allow_hyphen_values = true)]
        marks: String,
    },

    /// List all records
    List,

    /// Show the highest marks
    Top {
        /// How many records (default from config)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Draw the chart once
    Chart {
        /// Width of the longest bar
        #[arg(short, long)]
        width: Option<usize>,
    },

    /// Live dashboard: type `<name> <marks>` to submit, `r` to refresh, `q` to quit
    Watch,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        return write_default_config(output.as_ref());
    }

    let (mut config, config_path) = Config::resolve(cli.config.as_deref())?;

    if let Some(backend) = &cli.backend {
        config.store.backend = backend.parse()?;
    }
    if let Some(url) = &cli.api_url {
        config.store.rest.base_url = url.clone();
    }

    marksboard::logging::init(&config.logging)?;
    tracing::debug!(config = ?config_path, backend = %config.store.backend, "Configuration loaded");

    let store = config
        .build_store()
        .with_context(|| format!("failed to open the {} store", config.store.backend))?;

    match cli.command {
        Commands::Submit { name, marks } => {
            let form = SubmissionForm::new(Arc::clone(&store), marks_policy_for(store.kind()));
            match form.submit_input(&name, &marks).await {
                Ok(message) => println!("{}", message),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::List => {
            let records = store.list_records().await?;
            print_records(&records, &cli.format)?;
        }

        Commands::Top { limit } => {
            let limit = limit.unwrap_or(config.dashboard.top_limit);
            let records = store.top_performers(limit).await?;
            print_records(&records, &cli.format)?;
        }

        Commands::Chart { width } => {
            let width = width.unwrap_or(config.dashboard.chart_width).max(1);
            let strategy =
                RefreshStrategy::for_store(store.as_ref(), config.dashboard.poll_interval());

            let state = match store.list_records().await {
                Ok(records) => ChartState {
                    records,
                    loading: false,
                    error: None,
                    last_updated: None,
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Chart load failed");
                    ChartState {
                        loading: false,
                        error: Some(marksboard::dashboard::LOAD_FAILED_MESSAGE.to_string()),
                        ..Default::default()
                    }
                }
            };

            print!("{}", render::render_chart(&state, strategy, width));
        }

        Commands::Watch => {
            let dashboard = Arc::new(Dashboard::new(store, config.dashboard.poll_interval()));
            watch(dashboard, config.dashboard.chart_width).await?;
        }

        // Handled before the config is loaded
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn write_default_config(output: Option<&PathBuf>) -> anyhow::Result<()> {
    let config = generate_default_config();

    match output {
        Some(path) => {
            // Create parent directory if needed
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &config)?;
            println!("Config written to {:?}", path);
        }
        None => {
            print!("{}", config);
        }
    }
    Ok(())
}

/// One line typed into `watch`
#[derive(Debug, PartialEq)]
enum Input {
    Quit,
    Refresh,
    Empty,
    Submit { name: String, marks: String },
}

/// `q`, `r`, or `<name> <marks>` where the name may contain spaces
fn parse_input(line: &str) -> Input {
    let line = line.trim();
    match line {
        "" => Input::Empty,
        "q" | "quit" => Input::Quit,
        "r" | "refresh" => Input::Refresh,
        _ => match line.rsplit_once(char::is_whitespace) {
            Some((name, marks)) => Input::Submit {
                name: name.trim().to_string(),
                marks: marks.to_string(),
            },
            // Validation reports the missing marks
            None => Input::Submit {
                name: line.to_string(),
                marks: String::new(),
            },
        },
    }
}

async fn watch(dashboard: Arc<Dashboard>, width: usize) -> anyhow::Result<()> {
    let mut chart_updates = dashboard.chart().watch();
    let mut form_updates = dashboard.form().watch();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    dashboard.mount();
    draw(&dashboard, width);

    loop {
        tokio::select! {
            changed = chart_updates.changed() => {
                if changed.is_err() {
                    break;
                }
                draw(&dashboard, width);
            }
            changed = form_updates.changed() => {
                if changed.is_err() {
                    break;
                }
                draw(&dashboard, width);
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };

                match parse_input(&line) {
                    Input::Quit => break,
                    Input::Empty => draw(&dashboard, width),
                    Input::Refresh => dashboard.chart().refresh().await,
                    Input::Submit { name, marks } => {
                        let dashboard = Arc::clone(&dashboard);
                        tokio::spawn(async move {
                            if let Err(SubmitError::Busy) = dashboard.submit_input(&name, &marks).await {
                                eprintln!("A submission is already in progress");
                            }
                        });
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    dashboard.unmount();
    Ok(())
}

fn draw(dashboard: &Dashboard, width: usize) {
    let chart = dashboard.chart();

    // Clear screen, cursor home
    print!("\x1B[2J\x1B[H");
    println!("Student Marks Dashboard\n");
    print!("{}", render::render_form(&dashboard.form().state()));
    println!();
    print!("{}", render::render_chart(&chart.state(), chart.strategy(), width));
    println!();
    println!("<name> <marks> to submit · r to refresh · q to quit");
}

fn print_records(records: &[Record], format: &str) -> anyhow::Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No records found");
        return Ok(());
    }

    println!("{:<24} {:<24} {:>8}  {}", "ID", "Name", "Marks", "Created");
    println!("{}", "-".repeat(80));

    for record in records {
        let created = record
            .created_at
            .to_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<24} {:<24} {:>8}  {}",
            record.id,
            record.name,
            render::format_marks(record.marks),
            created
        );
    }
    Ok(())
}
