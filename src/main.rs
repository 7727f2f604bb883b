//! Pantry CLI Entry Point

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use pantry_lib::commands;
use pantry_lib::config::{PantryConfig, CONFIG_FILE_NAME};
use pantry_lib::domain::PantryItem;
use pantry_lib::engine::{SortDirection, SortField, ViewState};
use pantry_lib::AppState;

#[derive(Parser)]
#[command(name = "pantry")]
#[command(about = "Track pantry items in a shared document store")]
#[command(
    after_help = "Environment:\n  PANTRY_COLLECTION         Collection name override\n  PANTRY_SQLITE_PATH        Use a sqlite store at this path\n  PANTRY_FIRESTORE_PROJECT  Use this Firestore project\n  PANTRY_FIRESTORE_API_KEY  Firestore API key\n  RUST_LOG                  Log level (default info)"
)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Only items whose name contains this text
    #[arg(long, global = true, default_value = "")]
    search: String,
    #[arg(long, global = true, default_value = "name")]
    sort: SortField,
    #[arg(long, global = true, default_value_t = false)]
    desc: bool,
    /// Only items with this category label ("All" for every category)
    #[arg(long, global = true)]
    category: Option<String>,
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the pantry
    List,
    /// Add items, summing with what is stored
    Add {
        name: String,
        #[arg(long = "as")]
        category: Option<String>,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
    },
    /// Use up one item
    Dec { name: String },
    /// Remove an item entirely
    Remove { name: String },
    /// Remove every item
    Clear,
    /// Print the category labels
    Categories,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    let config = PantryConfig::load(&config_path)
        .map_err(|e| e.to_string())?
        .with_env_overrides();

    if let Some(dir) = &config.log_dir {
        rolling_logger::init_logger(dir, "Pantry")?;
    }

    if let Commands::Categories = cli.command {
        for label in commands::list_categories() {
            println!("{}", label);
        }
        return Ok(());
    }

    let state = AppState::from_config(config).map_err(|e| e.to_string())?;

    let mut view = ViewState::default();
    view.set_search(&cli.search);
    view.set_category_filter(cli.category.as_deref());
    view.set_sort(
        cli.sort,
        if cli.desc { SortDirection::Descending } else { SortDirection::Ascending },
    );
    state.engine.set_view_state(view).await;

    let items = match cli.command {
        Commands::List => commands::refresh_items(&state).await?,
        Commands::Add { name, category, quantity } => {
            commands::add_item(&state, name, category, Some(quantity)).await?
        }
        Commands::Dec { name } => commands::decrement_item(&state, name).await?,
        Commands::Remove { name } => commands::delete_item(&state, name).await?,
        Commands::Clear => {
            let report = commands::clear_pantry(&state).await?;
            eprintln!("Removed {} items", report.deleted.len());
            commands::list_items(&state).await?
        }
        Commands::Categories => Vec::new(),
    };

    print_items(&items, cli.json)
}

fn print_items(items: &[PantryItem], json: bool) -> Result<(), String> {
    if json {
        let text = serde_json::to_string_pretty(items).map_err(|e| e.to_string())?;
        println!("{}", text);
        return Ok(());
    }
    for item in items {
        println!("{}\t{}\t{}", item.name, item.count, item.category.as_deref().unwrap_or(""));
    }
    Ok(())
}
