//! Clusterform CLI - declarative lifecycle for managed database clusters

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;
mod error;
mod exit_codes;
mod state;

use commands::Session;
use error::Result;
use state::StateStore;

#[derive(Parser)]
#[command(
    name = "clusterform",
    author,
    version,
    about = "Declarative lifecycle management for managed database clusters",
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Directory holding last-applied state records
    #[arg(long, global = true, env = "CLUSTERFORM_STATE_DIR")]
    state_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what apply would change, without touching the cluster
    Plan {
        /// Cluster document (YAML)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Create or update a cluster to match a document
    Apply {
        /// Cluster document (YAML)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Read a cluster and print its current shape
    Show {
        /// Project id
        project: String,

        /// Cluster name
        name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a cluster and wait until it is gone
    Destroy {
        /// Project id
        project: String,

        /// Cluster name
        name: String,

        /// Keep snapshots after the cluster is deleted
        #[arg(long)]
        retain_backups: bool,
    },

    /// Adopt an existing cluster into local state
    Import {
        /// Identifier of the form <project_id>-<name>
        id: String,
    },
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("clusterform=debug,clusterform_provider=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("clusterform=info,clusterform_provider=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Cancel `token` on Ctrl-C so waits and retries stop at their next suspension point
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping");
            token.cancel();
        }
    });
}

async fn run(cli: Cli) -> Result<()> {
    let store = match cli.state_dir {
        Some(dir) => StateStore::new(dir),
        None => StateStore::default_location()?,
    };

    let cancel = CancellationToken::new();
    let connect = |store: StateStore| {
        cancel_on_interrupt(cancel.clone());
        Session::open(store, cancel.clone())
    };

    match cli.command {
        Commands::Plan { file } => commands::plan::run(&file, &store),
        Commands::Apply { file } => commands::apply::run(&file, &connect(store)?).await,
        Commands::Show {
            project,
            name,
            json,
        } => commands::show::run(&project, &name, json, &connect(store)?).await,
        Commands::Destroy {
            project,
            name,
            retain_backups,
        } => commands::destroy::run(&project, &name, retain_backups, &connect(store)?).await,
        Commands::Import { id } => commands::import::run(&id, &connect(store)?).await,
    }
}

#[tokio::main]
async fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
