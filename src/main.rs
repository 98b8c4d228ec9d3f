//! CSV Mapper CLI
//!
//! Reads a CSV file and writes it back in normalized form.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- [--charset <label>] [--no-quote] input.csv [output.csv]
//! ```
//!
//! Without an output path the rows are printed to stdout as UTF-8. With one,
//! they are written in the charset of the input.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `info` to control logging verbosity

use clap::Parser;
use csv_mapper::{Charset, CsvCodec, CsvPath, QuotePolicy, Result};
use std::io;
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "csv-mapper")]
#[command(about = "Read a CSV file and write it back in normalized form")]
#[command(version)]
struct Args {
    /// Charset label used to read the input, skipping detection
    #[arg(long, value_name = "LABEL")]
    charset: Option<Charset>,

    /// Write fields without quotes
    #[arg(long)]
    no_quote: bool,

    /// Input file, must end in .csv
    input: PathBuf,

    /// Output file; rows go to stdout when omitted
    output: Option<PathBuf>,
}

impl Args {
    fn policy(&self) -> QuotePolicy {
        QuotePolicy::from_include_lines(!self.no_quote)
    }
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut codec = CsvCodec::new();
    if let Some(charset) = args.charset {
        codec = codec.with_charset(charset);
    }

    let input = CsvPath::new(&args.input)?;
    let outcome = codec.read_path(&input)?;
    let policy = args.policy();
    let rows = outcome.rows.iter().map(|row| (row, policy));

    match args.output {
        Some(output) => {
            let output = CsvPath::new(output)?;
            codec.write_path(&output, rows, Some(outcome.charset))?;
        }
        None => {
            let stdout = io::stdout();
            let handle = stdout.lock();
            codec.write_rows(handle, rows, Charset::utf8())?;
        }
    }

    Ok(())
}
