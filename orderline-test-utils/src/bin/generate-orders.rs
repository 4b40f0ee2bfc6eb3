//! generate-orders - write fake orders as JSON lines
//!
//! The output feeds `JsonLinesSource`, e.g.
//! `generate-orders --count 50 | orderline`.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use orderline_test_utils::OrderGenerator;

#[derive(Parser)]
#[command(name = "generate-orders")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Number of records to write
    #[arg(short, long, default_value_t = 10)]
    count: usize,

    /// Seed for reproducible output
    #[arg(short, long)]
    seed: Option<u64>,

    /// Fraction of records that decode but fail validation
    #[arg(long, default_value_t = 0.0)]
    invalid_ratio: f64,

    /// Fraction of records that are not valid JSON
    #[arg(long, default_value_t = 0.0)]
    malformed_ratio: f64,

    /// Pause between records, in milliseconds
    #[arg(short, long, default_value_t = 0)]
    delay_ms: u64,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();

    let mut generator = match cli.seed {
        Some(seed) => OrderGenerator::seeded(seed),
        None => OrderGenerator::new(),
    };

    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    for _ in 0..cli.count {
        if generator.chance(cli.malformed_ratio) {
            writeln!(out, "{{\"order_uid\": ")?;
        } else {
            let order = if generator.chance(cli.invalid_ratio) {
                generator.invalid_order()
            } else {
                generator.order()
            };
            serde_json::to_writer(&mut out, &order)?;
            writeln!(out)?;
        }

        if cli.delay_ms > 0 {
            out.flush()?;
            thread::sleep(Duration::from_millis(cli.delay_ms));
        }
    }

    out.flush()
}
