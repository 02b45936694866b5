mod engine;

use anyhow::{bail, Result};
use casefile::{DEFAULT_BLOCK_SIZE, DEFAULT_WORKSPACE_BYTES};
use clap::{Args, Parser, Subcommand};
use extsort::MAX_MERGE_ORDER;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use engine::{KeyKind, KeySpec, SortOptions};

/// Sort files of fixed-width binary records, spilling to disk when they do
/// not fit in the workspace.
#[derive(Parser, Debug)]
#[command(name = "casesort", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write records keyed by a shuffled u64 LE permutation of 0..count.
    Gen {
        output: PathBuf,
        #[arg(short = 'n', long)]
        count: u64,
        #[arg(short = 'r', long, default_value_t = 64)]
        record_size: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Sort a record file by a key.
    Sort {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        key: KeyArgs,
        /// Write only the first N sorted records.
        #[arg(long)]
        limit: Option<u64>,
        #[command(flatten)]
        storage: StorageArgs,
    },
    /// Exit nonzero unless a record file is sorted by a key.
    Check {
        input: PathBuf,
        #[command(flatten)]
        key: KeyArgs,
    },
}

#[derive(Args, Debug)]
struct KeyArgs {
    #[arg(short = 'r', long, default_value_t = 64)]
    record_size: usize,
    /// Key location as offset:len, in bytes.
    #[arg(short = 'k', long, default_value = "0:8")]
    key: String,
    #[arg(long, value_enum, default_value_t = KeyKind::U64le)]
    key_type: KeyKind,
    #[arg(long)]
    reverse: bool,
}

impl KeyArgs {
    fn spec(&self) -> Result<KeySpec> {
        KeySpec::parse(&self.key, self.key_type, self.reverse)
    }
}

#[derive(Args, Debug)]
struct StorageArgs {
    /// Memory budget in bytes.
    #[arg(long, default_value_t = DEFAULT_WORKSPACE_BYTES)]
    workspace: usize,
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: usize,
    /// Directory for temporary files.
    #[arg(long)]
    temp_dir: Option<PathBuf>,
    #[arg(long, default_value_t = MAX_MERGE_ORDER)]
    max_merge_order: usize,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Gen {
            output,
            count,
            record_size,
            seed,
        } => engine::generate(&output, count, record_size, seed)?,
        Command::Sort {
            input,
            output,
            key,
            limit,
            storage,
        } => {
            let opts = SortOptions {
                record_size: key.record_size,
                key: key.spec()?,
                limit,
                config: engine::sort_config(
                    storage.workspace,
                    storage.block_size,
                    storage.temp_dir.as_deref(),
                    storage.max_merge_order,
                ),
            };
            let summary = engine::sort_file(&input, &output, &opts)?;
            eprintln!(
                "sorted {} records, wrote {}{}",
                summary.records_in,
                summary.records_out,
                if summary.spilled { " (external)" } else { "" }
            );
        }
        Command::Check { input, key } => {
            let report = engine::check_file(&input, key.record_size, &key.spec()?)?;
            if let Some(i) = report.first_violation {
                bail!(
                    "{} is not sorted: record {} sorts before record {}",
                    input.display(),
                    i,
                    i - 1
                );
            }
            eprintln!("{} records in order", report.records);
        }
    }
    Ok(())
}
