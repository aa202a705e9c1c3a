//! EncSleuth — reports the text encoding of every matching file under a
//! directory tree.
//!
//! Thin binary entry point. All logic lives in the `encsleuth-core` crate.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use encsleuth_core::platform::AclPrecedence;
use encsleuth_core::{scan, ScanConfig};

#[derive(Parser)]
#[command(
    name = "encsleuth",
    version,
    about = "Count files per detected text encoding",
    long_about = "Walks ROOT, skipping directories the current user may not list, and \
                  classifies every file whose name matches one of the extension globs."
)]
struct Cli {
    /// Directory to scan (defaults to current directory)
    #[arg(default_value = ".")]
    root: PathBuf,

    /// File-name glob to classify; repeat to add more (replaces the defaults)
    #[arg(short = 'e', long = "ext", value_name = "GLOB")]
    extensions: Vec<String>,

    /// Worker threads (0 = one per logical CPU)
    #[arg(short = 'j', long, default_value = "0")]
    threads: usize,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Let direct and group ACL entries grant independently
    #[arg(long)]
    reference_acl: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so the report on stdout stays clean.
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("EncSleuth starting");

    let mut config = ScanConfig::default().with_threads(cli.threads);
    if !cli.extensions.is_empty() {
        config = config.with_extensions(cli.extensions);
    }
    if cli.reference_acl {
        config = config.with_acl_precedence(AclPrecedence::Independent);
    }

    let result = scan(&cli.root, config)
        .with_context(|| format!("scan of {} failed", cli.root.display()))?;

    if cli.json {
        println!("{}", result.to_json()?);
    } else {
        println!("{result}");
    }
    Ok(())
}
