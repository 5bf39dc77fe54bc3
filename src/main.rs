use clap::Parser;
use nsmf::render::RenderedScore;
use nsmf::synth::Instrument;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "nsmf")]
#[command(version = "0.1.0")]
#[command(about = "NSMF music notation player", long_about = None)]
struct Args {
    /// Input NSMF file, plain or gzip-compressed (reads from stdin if not specified)
    input: Option<PathBuf>,

    /// List available instruments
    #[arg(short = 'L', long)]
    list_instruments: bool,

    /// Parse and render only, print a summary instead of playing
    #[arg(short, long)]
    check: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), nsmf::Error> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if args.list_instruments {
        for instrument in Instrument::ALL {
            println!("{}", instrument.name());
        }
        return Ok(());
    }

    let text = match &args.input {
        Some(path) => nsmf::source::load_document(path)?,
        None => nsmf::source::read_document(std::io::stdin())?,
    };

    let score = nsmf::ParsedScore::parse(&text)?;
    let rendered = nsmf::render(&score)?;

    if args.check {
        for channel in &rendered.channels {
            println!(
                "channel {}: {} samples at {}Hz, {}ms",
                channel.index,
                channel.samples.len(),
                channel.sample_rate,
                channel.duration_ms
            );
        }
        return Ok(());
    }

    play(rendered)
}

#[cfg(feature = "playback")]
fn play(rendered: RenderedScore) -> Result<(), nsmf::Error> {
    use std::io::Write;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    let total_secs = rendered.longest_duration_ms() / 1000;
    let output = Arc::new(nsmf::playback::device::CpalOutput::new());

    let started = Instant::now();
    let playback = nsmf::playback::start(output, rendered);

    while !playback.is_finished() {
        let elapsed = started.elapsed().as_secs().min(total_secs);
        eprint!("\r{}s / {}s", elapsed, total_secs);
        let _ = std::io::stderr().flush();
        std::thread::sleep(Duration::from_millis(250));
    }
    eprintln!();

    let outcomes = playback.wait();
    if outcomes.iter().all(|o| !o.is_played()) && !outcomes.is_empty() {
        tracing::warn!("no channel could be played");
    }
    Ok(())
}

#[cfg(not(feature = "playback"))]
fn play(_rendered: RenderedScore) -> Result<(), nsmf::Error> {
    Err(nsmf::Error::SinkUnavailable(
        "nsmf built without the `playback` feature; rebuild with it or use --check".to_string(),
    ))
}
