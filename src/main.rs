//! # Paper Orbit CLI (`orbit`)
//!
//! Federated literature search from the terminal: query OpenAlex and arXiv
//! concurrently, keep what you find in a local SQLite library, embed it, and
//! search it semantically.
//!
//! ## Usage
//!
//! ```bash
//! orbit --config ./config/orbit.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `orbit init` | Create the SQLite database and run schema migrations |
//! | `orbit search "<query>"` | Search all enabled sources and record a snapshot |
//! | `orbit graph "<query>"` | Build a citation graph from a search |
//! | `orbit resolve <doi>` | Fetch a paper's metadata from Crossref |
//! | `orbit papers list` / `get <id>` | Inspect the local library |
//! | `orbit embed <id>` | Embed a stored paper |
//! | `orbit local-search "<query>"` | Rank stored papers by similarity |
//! | `orbit snapshots list` / `show <id>` | Inspect the search log |
//! | `orbit serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! orbit init
//! orbit search "graph neural networks" --year-min 2020 --save
//! orbit embed W2741809807
//! orbit local-search "message passing"
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use paper_orbit::models::SearchFilters;
use paper_orbit::{
    config, embed_cmd, local_search, migrate, papers, search, server, snapshots,
};

/// Paper Orbit: federated literature search with a local semantic library.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file.
#[derive(Parser)]
#[command(
    name = "orbit",
    about = "Federated literature search with a local semantic library",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/orbit.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Search every enabled source concurrently.
    ///
    /// Prints the status of each source followed by the merged papers.
    /// Every search is recorded as a snapshot.
    Search {
        /// The search query string.
        query: String,

        #[command(flatten)]
        filters: FilterArgs,

        /// Store the returned papers in the local library.
        #[arg(long)]
        save: bool,

        /// Print the raw per-source bundle as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Search, then build a citation graph over the results.
    Graph {
        query: String,

        #[command(flatten)]
        filters: FilterArgs,

        #[arg(long)]
        json: bool,
    },

    /// Resolve a DOI through Crossref.
    Resolve {
        /// DOI, bare or as a `https://doi.org/` URL.
        doi: String,

        /// Store the resolved paper in the local library.
        #[arg(long)]
        save: bool,
    },

    /// Inspect stored papers.
    Papers {
        #[command(subcommand)]
        action: PapersAction,
    },

    /// Compute and store an embedding for a stored paper.
    Embed {
        /// Paper ID.
        id: String,
    },

    /// Rank stored papers by similarity to a query.
    LocalSearch {
        query: String,

        /// Maximum number of results.
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Inspect recorded search snapshots.
    Snapshots {
        #[command(subcommand)]
        action: SnapshotsAction,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[derive(clap::Args)]
struct FilterArgs {
    /// Earliest publication year (inclusive).
    #[arg(long)]
    year_min: Option<i32>,

    /// Latest publication year (inclusive).
    #[arg(long)]
    year_max: Option<i32>,

    /// Only open-access works (OpenAlex).
    #[arg(long)]
    open_access: bool,

    /// Results per source.
    #[arg(long)]
    limit: Option<u32>,
}

impl From<FilterArgs> for SearchFilters {
    fn from(args: FilterArgs) -> Self {
        SearchFilters {
            year_min: args.year_min,
            year_max: args.year_max,
            open_access: args.open_access.then_some(true),
            limit: args.limit,
        }
    }
}

#[derive(Subcommand)]
enum PapersAction {
    /// List stored papers, most recently added first.
    List {
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Print one stored paper.
    Get {
        id: String,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SnapshotsAction {
    /// List recent snapshots.
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Print a snapshot as JSON, including the raw source payloads.
    Show { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Search {
            query,
            filters,
            save,
            json,
        } => {
            search::run_search(&cfg, &query, filters.into(), save, json).await?;
        }
        Commands::Graph {
            query,
            filters,
            json,
        } => {
            search::run_graph(&cfg, &query, filters.into(), json).await?;
        }
        Commands::Resolve { doi, save } => {
            papers::run_resolve(&cfg, &doi, save).await?;
        }
        Commands::Papers { action } => match action {
            PapersAction::List { limit } => papers::run_list(&cfg, limit).await?,
            PapersAction::Get { id, json } => papers::run_get(&cfg, &id, json).await?,
        },
        Commands::Embed { id } => {
            embed_cmd::run_embed(&cfg, &id).await?;
        }
        Commands::LocalSearch { query, limit } => {
            local_search::run_local_search(&cfg, &query, limit).await?;
        }
        Commands::Snapshots { action } => match action {
            SnapshotsAction::List { limit } => snapshots::run_list(&cfg, limit).await?,
            SnapshotsAction::Show { id } => snapshots::run_show(&cfg, &id).await?,
        },
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
