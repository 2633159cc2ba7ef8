use anyhow::{Error, Result};
use clap::{Parser, Subcommand};
use graphupdate::config::Config;
use graphupdate::{FileGraphStore, GraphStore, UpdateEngine, UpdateRequest};
use log::info;
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "graphupdate")]
#[command(about = "Apply RDF update requests to a dataset file")]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Verbose mode - sets the RUST_LOG level to info, defaults to warning level
    #[clap(long, short, action, default_value = "false", global = true)]
    verbose: bool,
    /// Debug mode - sets the RUST_LOG level to debug, defaults to warning level
    #[clap(long, action, default_value = "false", global = true)]
    debug: bool,
    /// Offline mode - LOAD will not fetch documents from the web
    #[clap(long, short, action, default_value = "false", global = true)]
    offline: bool,
    /// JSON configuration file; command line flags override its values
    #[clap(long, short, global = true)]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply an update request to a dataset file
    Apply {
        /// Dataset file to update; created if it does not exist. The format follows the extension.
        #[clap(long, short)]
        store: PathBuf,
        /// The update request (JSON)
        request: PathBuf,
        /// Output the report as JSON instead of text
        #[clap(long, action, default_value = "false")]
        json: bool,
    },
    /// Parse an update request and list its operations without applying it
    Check {
        /// The update request (JSON)
        request: PathBuf,
    },
    /// Prints the version of the graphupdate binary
    Version,
}

pub fn run() -> Result<()> {
    graphupdate::init_logging();
    let cmd = Cli::parse();
    execute(cmd)
}

pub fn run_from_args<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    graphupdate::init_logging();
    let cmd = Cli::try_parse_from(args).map_err(Error::from)?;
    execute(cmd)
}

fn execute(cmd: Cli) -> Result<()> {
    // RUST_LOG may come from GRAPHUPDATE_LOG via `init_logging`; the flags win over both.
    if cmd.debug {
        std::env::set_var("RUST_LOG", "debug");
    } else if cmd.verbose {
        std::env::set_var("RUST_LOG", "info");
    } else if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "warn");
    }
    let _ = env_logger::try_init();

    let mut config = match &cmd.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if cmd.offline {
        config.offline = true;
    }
    if cmd.verbose || cmd.debug {
        config.print();
    }

    match cmd.command {
        Commands::Apply {
            store,
            request,
            json,
        } => {
            let update = UpdateRequest::from_file(&request)?;
            info!(
                "Applying {} operations from {} to {}",
                update.len(),
                request.display(),
                store.display()
            );
            let mut dataset = FileGraphStore::open(&store)?;
            let mut engine = UpdateEngine::new(&mut dataset).with_config(config);
            let outcome = engine.apply_request(&update);
            let report = engine.into_report();
            // operations that succeeded before a failure stay applied, so persist them either way
            dataset.flush()?;
            outcome?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
            }
        }
        Commands::Check { request } => {
            let update = UpdateRequest::from_file(&request)?;
            println!("{} operations", update.len());
            for (i, operation) in update.operations.iter().enumerate() {
                println!("{:>3}. {}", i + 1, operation);
            }
        }
        Commands::Version => {
            println!(
                "graphupdate {} @ {}",
                env!("CARGO_PKG_VERSION"),
                env!("CARGO_PKG_REPOSITORY")
            );
        }
    }

    Ok(())
}
