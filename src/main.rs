use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;

use tabledesk::config::AppConfig;
use tabledesk::infra::sqlite::repo::SqliteGateway;
use tabledesk::render::render_table;
use tabledesk::usecase::services::workspace::Workspace;
use tabledesk::{CellValue, DatasetKind, GridKey, GridRow};

#[derive(Parser, Debug)]
#[command(name = "tabledesk")]
#[command(about = "Edit configuration and preference tables imported from spreadsheets")]
#[command(version)]
struct Cli {
    /// SQLite file holding the saved datasets
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarise both datasets
    List,

    /// Work on the configuration dataset
    Config {
        #[command(subcommand)]
        action: Action,
    },

    /// Work on the preferences dataset
    Preferences {
        #[command(subcommand)]
        action: Action,
    },
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Print the rows with their totals
    Show {
        /// Only rows containing this text (case-insensitive)
        #[arg(short, long)]
        search: Option<String>,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Replace the dataset with a .xlsx, .xls or .csv file and save it
    Import { file: PathBuf },

    /// Set one cell and save
    Edit {
        id: String,
        field: String,
        value: String,

        /// How to store the value
        #[arg(long = "as", value_enum, default_value_t = ValueKind::Text)]
        value_kind: ValueKind,
    },

    /// Append a blank row and save
    Add,

    /// Delete rows by id and save
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Remove all saved rows
    Clear,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ValueKind {
    Text,
    Number,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::resolve(cli.db)?;
    log::debug!("using database {}", config.db_path.display());
    let gateway = Arc::new(SqliteGateway::new(config.db_path));
    gateway.init()?;

    match cli.command {
        Command::List => {
            for meta in gateway.list_datasets()? {
                println!(
                    "{:<12} rows: {:<6} columns: {:<4} saved: {}",
                    meta.kind,
                    meta.row_count,
                    meta.column_count,
                    meta.saved_at.as_deref().unwrap_or("never")
                );
            }
            Ok(())
        }
        Command::Config { action } => run_action(gateway, DatasetKind::Configuration, action),
        Command::Preferences { action } => run_action(gateway, DatasetKind::Preferences, action),
    }
}

fn parse_key(raw: &str) -> Result<GridKey> {
    GridKey::parse(raw).ok_or_else(|| anyhow!("invalid row id `{raw}`"))
}

fn run_action(gateway: Arc<SqliteGateway>, kind: DatasetKind, action: Action) -> Result<()> {
    let mut workspace = Workspace::new(gateway);

    match action {
        Action::Import { file } => {
            workspace.import(kind, &file)?;
            workspace.save(kind)?;
        }
        Action::Show { search, json } => {
            workspace.open(kind)?;
            let controller = workspace.controller_mut(kind);
            if let Some(search) = search {
                controller.set_search_text(search);
            }
            let view = controller.view();
            if json {
                let rows = Value::Array(view.iter().map(GridRow::to_json).collect());
                println!(
                    "{}",
                    serde_json::to_string_pretty(&rows).context("failed to encode view")?
                );
            } else {
                print!("{}", render_table(controller.columns(), &view));
            }
            return Ok(());
        }
        Action::Edit {
            id,
            field,
            value,
            value_kind,
        } => {
            let key = parse_key(&id)?;
            let value = match value_kind {
                ValueKind::Text => CellValue::Text(value),
                ValueKind::Number => CellValue::Number(
                    value
                        .trim()
                        .parse()
                        .with_context(|| format!("`{value}` is not a number"))?,
                ),
            };
            workspace.open(kind)?;
            workspace.controller_mut(kind).edit_cell(key, &field, value)?;
            workspace.save(kind)?;
        }
        Action::Add => {
            workspace.open(kind)?;
            if let Some(id) = workspace.controller_mut(kind).insert_row() {
                workspace.save(kind)?;
                println!("added row {id}");
            }
        }
        Action::Delete { ids } => {
            let keys = ids
                .iter()
                .map(String::as_str)
                .map(parse_key)
                .collect::<Result<Vec<_>>>()?;
            workspace.open(kind)?;
            let controller = workspace.controller_mut(kind);
            controller.set_selection(keys);
            if controller.delete_selected() > 0 {
                workspace.save(kind)?;
            }
        }
        Action::Clear => {
            workspace.clear(kind)?;
        }
    }

    if let Some(status) = workspace.controller(kind).status() {
        println!("{status}");
    }
    Ok(())
}
