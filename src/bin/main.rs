//! RO-Crate mapping CLI
//!
//! Builds an RO-Crate metadata document from a dataset JSON export and a
//! CSV mapping rule table.

use std::fs;
use std::path::PathBuf;

use clap::Parser;

use rocrate_mapper::{
    build, load_dataset, load_rules, to_json_string, BuildError, BuildOptions,
};

#[derive(Parser)]
#[command(name = "rocrate-mapper")]
#[command(about = "Generate RO-Crate metadata from a Dataverse dataset JSON export")]
#[command(version)]
struct Cli {
    /// Path to the mapping rule table (CSV)
    rules: PathBuf,

    /// Path to the dataset JSON export
    dataset: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Rule-table entity to start the build from
    #[arg(long, default_value = "Metadata")]
    root_entity: String,
}

/// Write output to file or stdout
fn write_output(content: &str, output: Option<&PathBuf>) -> Result<(), BuildError> {
    match output {
        Some(path) => {
            fs::write(path, content)?;
            eprintln!("Wrote crate metadata to {}", path.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), BuildError> {
    let rules = load_rules(&cli.rules)?;
    let dataset = load_dataset(&cli.dataset)?;

    let options = BuildOptions {
        root_entity: cli.root_entity,
    };
    let result = build(&rules, &dataset, &options)?;

    eprintln!(
        "Built {} entities ({} from the file tree, {} references resolved)",
        result.stats.entities, result.stats.file_entities, result.stats.references_resolved
    );

    let output = to_json_string(&result, cli.pretty)?;
    write_output(&output, cli.output.as_ref())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
