mod hk;
mod info;
mod pixel;
mod read;

use std::io::stderr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pff::{BoardVariant, NativeLoc};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the record geometry and sample count of a PFF data file.
    Info {
        /// Input PFF data file. The name must follow the PFF naming convention.
        input: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: info::Format,
    },
    /// Decode a PFF data file.
    ///
    /// The text format prints a summary of the pixel values and the first and last
    /// value of each metadata field. The json format writes the decoded data and
    /// metadata.
    Read {
        /// Input PFF data file.
        input: PathBuf,

        /// Decode at most this many samples.
        #[arg(short, long, value_name = "count")]
        samples: Option<usize>,

        /// Only decode this pixel.
        #[arg(short, long)]
        channel: Option<usize>,

        /// Also decode the record metadata.
        #[arg(short, long, action)]
        metadata: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: info::Format,
    },
    /// Translate between native quabo pixel locations and canonical image indexes.
    ///
    /// The board variant is either given directly with --board or looked up for a
    /// module in the obs_config.json of a run directory with --config and --module.
    Pixel {
        /// Directory containing pixel_map_maroc2phys_bga.json and
        /// pixel_map_maroc2phys_qfp.json.
        #[arg(long, value_name = "dir")]
        maps: PathBuf,

        /// Quabo board variant (bga or qfp).
        #[arg(short, long)]
        board: Option<BoardVariant>,

        /// Run directory containing obs_config.json.
        #[arg(long, value_name = "dir", requires = "module")]
        config: Option<PathBuf>,

        /// Module id to look up in obs_config.json.
        #[arg(long)]
        module: Option<u32>,

        /// Quadrant (quabo index) 0-3.
        #[arg(short, long)]
        quadrant: usize,

        /// Native location as <row>,<col>.
        #[arg(short, long, value_parser = pixel::parse_native, value_name = "row,col",
              conflicts_with = "index", required_unless_present = "index")]
        native: Option<NativeLoc>,

        /// Canonical image index, 0-1023.
        #[arg(short, long)]
        index: Option<usize>,
    },
    /// Dump a housekeeping file as JSON.
    Hk {
        /// Input housekeeping file, e.g., hk.pff.
        input: PathBuf,

        /// Only dump this source, e.g., QUABO.
        #[arg(short, long)]
        source: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_ansi(false)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_env("PFF_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    debug!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Info { input, format } => info::info(input, format),
        Commands::Read {
            input,
            samples,
            channel,
            metadata,
            format,
        } => read::read(input, *samples, *channel, *metadata, format),
        Commands::Pixel {
            maps,
            board,
            config,
            module,
            quadrant,
            native,
            index,
        } => {
            let board = pixel::resolve_board(*board, config.as_deref(), *module)?;
            pixel::pixel(maps, board, *quadrant, *native, *index)
        }
        Commands::Hk { input, source } => hk::hk(input, source.as_deref()),
    }
}
