use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{error, info, warn, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use huff7::code::bit_string;
use huff7::{huffman, CodeTable, FrequencyTable, HuffmanError};

const EXTENSION: &str = "huff";

#[derive(Parser, Debug)]
#[clap(author, version, about = "Static Huffman compression for 7-bit files")]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[clap(short, long, global = true, parse(from_occurrences))]
    verbose: u64,

    /// Only report errors
    #[clap(short, long, global = true)]
    quiet: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compress a file
    Compress {
        input: PathBuf,
        /// Output path, defaults to <INPUT>.huff
        #[clap(short, long)]
        output: Option<PathBuf>,
        /// Overwrite an existing output file
        #[clap(short, long)]
        force: bool,
    },
    /// Decompress a file
    Decompress {
        input: PathBuf,
        /// Output path, defaults to <INPUT> without .huff
        #[clap(short, long)]
        output: Option<PathBuf>,
        /// Overwrite an existing output file
        #[clap(short, long)]
        force: bool,
    },
    /// Print the code assigned to each symbol of a file
    Codes { input: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match (cli.quiet, cli.verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Warn,
        (false, 1) => LevelFilter::Info,
        (false, 2) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    };
    if let Err(e) = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("could not start logger: {}", e);
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), HuffmanError> {
    match command {
        Command::Compress {
            input,
            output,
            force,
        } => {
            let output = output.unwrap_or_else(|| {
                let mut name = input.clone().into_os_string();
                name.push(".");
                name.push(EXTENSION);
                PathBuf::from(name)
            });
            info!("compressing {} to {}", input.display(), output.display());

            let source = File::open(&input)?;
            let sink = create_output(&output, force)?;
            let stats = discard_on_error(&output, huff7::compress(source, sink))?;
            info!(
                "{} symbols, {} body bits, {} padding bits",
                stats.symbols, stats.body_bits, stats.padding
            );
            Ok(())
        }
        Command::Decompress {
            input,
            output,
            force,
        } => {
            let output = output.unwrap_or_else(|| default_decompressed_path(&input));
            info!("decompressing {} to {}", input.display(), output.display());

            let source = File::open(&input)?;
            let sink = create_output(&output, force)?;
            discard_on_error(&output, huff7::decompress(source, sink))?;
            Ok(())
        }
        Command::Codes { input } => {
            let freqs = FrequencyTable::count(File::open(&input)?)?;
            let codes = CodeTable::from_tree(&huffman(&freqs)?);
            info!(
                "{} distinct symbols over {} bytes",
                freqs.distinct(),
                freqs.total()
            );
            for (symbol, code) in codes.header_order() {
                println!(
                    "{:>6} {:>10} {}",
                    display_symbol(symbol),
                    freqs.get(symbol),
                    bit_string(code)
                );
            }
            Ok(())
        }
    }
}

fn create_output(path: &Path, force: bool) -> std::io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .create_new(!force)
        .truncate(true)
        .open(path)
}

/// A failed run must not leave a file that looks like a finished one.
fn discard_on_error<T>(path: &Path, result: Result<T, HuffmanError>) -> Result<T, HuffmanError> {
    if result.is_err() {
        if let Err(e) = fs::remove_file(path) {
            warn!("could not remove partial output {}: {}", path.display(), e);
        }
    }
    result
}

fn default_decompressed_path(input: &Path) -> PathBuf {
    match input.extension() {
        Some(ext) if ext == EXTENSION => input.with_extension(""),
        _ => {
            let mut name = input.to_path_buf().into_os_string();
            name.push(".out");
            PathBuf::from(name)
        }
    }
}

fn display_symbol(symbol: u8) -> String {
    if symbol.is_ascii_graphic() {
        format!("'{}'", symbol as char)
    } else {
        format!("{:#04x}", symbol)
    }
}
