//! NSMF to JSON summary converter

use clap::Parser;
use nsmf::report::ScoreSummary;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "nsmf2json")]
#[command(version = "0.1.0")]
#[command(about = "Summarize NSMF files as JSON", long_about = None)]
struct Args {
    /// Input NSMF file (plain or gzip-compressed)
    input: PathBuf,

    /// Output JSON file (writes to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output compact JSON (default is pretty-printed)
    #[arg(short, long)]
    compact: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let text = nsmf::source::load_document(&args.input)?;
    let score = nsmf::ParsedScore::parse(&text)?;
    let rendered = nsmf::render(&score)?;

    let summary = ScoreSummary::new(&score).with_rendered(&rendered);

    let json_string = if args.compact {
        serde_json::to_string(&summary)?
    } else {
        serde_json::to_string_pretty(&summary)?
    };

    match args.output {
        Some(path) => {
            let mut file = File::create(path)?;
            file.write_all(json_string.as_bytes())?;
            file.write_all(b"\n")?;
        }
        None => {
            println!("{}", json_string);
        }
    }

    Ok(())
}
