mod inspect;
mod rom;

use bytesize::ByteSize;
use clap::{Parser, Subcommand};
use eyre_pretty::{Context, Result};
use nitro::fnt::{Fnt, NO_FILE};
use std::{
    io::{BufWriter, Cursor, Read, Seek, SeekFrom, Write},
    path::PathBuf,
};

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the folder tree described by a file name table
    Tree {
        #[command(flatten)]
        source: rom::Source,
        /// Only print the entry at this path
        #[arg(short, long)]
        path: Option<String>,
    },
    /// Print the directory tables of a file name table
    Tables {
        #[command(flatten)]
        source: rom::Source,
    },
    /// Rebuild a file name table from its folder tree
    ///
    /// The rebuilt table is written to the output file and compared against the original.
    Rebuild {
        #[command(flatten)]
        source: rom::Source,
        /// Path to the output file
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// A CLI to inspect and rebuild the file name tables of Nintendo DS ROMs.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Action to take
    #[command(subcommand)]
    command: Command,
}

fn setup_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new("ndstool=info,nitro=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn rebuild(source: rom::Source, output: PathBuf) -> Result<()> {
    let options = source.options();
    let mut located = source.read()?;

    let mut root = located.fnt.tree().context("assembling folder tree")?;
    let first_id = located
        .fnt
        .entries()
        .first()
        .map(|root| root.first_file_id)
        .filter(|&id| id != NO_FILE)
        .unwrap_or_default();

    let rebuilt = Fnt::from_tree(&mut root, first_id).context("rebuilding file name table")?;
    let mut bytes = Cursor::new(Vec::new());
    rebuilt.write(&mut bytes, options)?;
    let bytes = bytes.into_inner();

    let mut writer =
        BufWriter::new(std::fs::File::create(&output).context("opening output file")?);
    writer.write_all(&bytes).context("writing output file")?;
    writer.flush()?;

    let mut original = vec![0; bytes.len()];
    located.reader.seek(SeekFrom::Start(located.offset))?;
    let identical = located.reader.read_exact(&mut original).is_ok() && original == bytes;

    tracing::info!(
        directories = rebuilt.len(),
        size = %ByteSize(bytes.len() as u64),
        identical,
        "rebuilt file name table"
    );

    if identical {
        println!("rebuilt table is identical to the original");
    } else {
        println!("rebuilt table differs from the original");
    }

    Ok(())
}

fn main() -> Result<()> {
    eyre_pretty::install()?;
    setup_tracing();

    let config = Args::parse();
    match config.command {
        Command::Tree { source, path } => inspect::print_tree(source, path),
        Command::Tables { source } => inspect::print_tables(source),
        Command::Rebuild { source, output } => rebuild(source, output),
    }
}
