mod list;
mod unpack;

use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Extract a game directory, converting PCX and WAL images to PNG
    Unpack(UnpackCommand),
    /// List the virtual file tree of a game directory
    List(ListCommand),
}

#[derive(Debug, Args)]
struct UnpackCommand {
    /// Game directory holding pak files and loose files
    input: String,
    /// Output directory
    output: String,
    /// Copy every entry as is, without decoding images
    #[arg(long, default_value_t = false)]
    no_convert: bool,
    /// Process one entry at a time
    #[arg(long, default_value_t = false)]
    sequential: bool,
    /// Number of worker threads (default: all cores)
    #[arg(short, long)]
    threads: Option<usize>,
    /// Replace files already present in the output directory
    #[arg(long, default_value_t = false)]
    overwrite: bool,
    /// Read pak files through buffered IO instead of memory mapping
    #[arg(long, default_value_t = false)]
    no_mmap: bool,
    /// Only write entries whose virtual path matches this regex
    #[arg(short, long)]
    include: Option<String>,
}

#[derive(Debug, Args)]
struct ListCommand {
    /// Game directory holding pak files and loose files
    input: String,
    /// Print entries as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .init();

    match &cli.command {
        Command::Unpack(cmd) => unpack::unpack(cmd),
        Command::List(cmd) => list::list(cmd),
    }
}
