use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use event_recon::reconstructor::Reconstructor;

/// Reconstruct a brightness image from an event camera stream.
///
/// Reads tab- or space-separated events from stdin, one per line, in either
/// `x y polarity` or `x y timestamp polarity` form (timestamps are ignored,
/// the reconstruction is event-count driven). Writes the min/max-normalized
/// image as binary PGM when the stream ends.
#[derive(Parser)]
#[command(name = "event-recon")]
struct Args {
    /// Sensor width in pixels
    #[arg(long, default_value_t = 128)]
    width: u32,

    /// Sensor height in pixels
    #[arg(long, default_value_t = 128)]
    height: u32,

    /// Temporal filter cutoff period, in events
    #[arg(long, default_value_t = 30)]
    cutoff_period: u32,

    /// Activity tile size in pixels (must divide width and height)
    #[arg(long, default_value_t = 2)]
    tile_size: u32,

    /// Target fraction of a tile's pixels simultaneously active
    #[arg(long, default_value_t = 0.5)]
    fill_ratio: f64,

    /// Output PGM path (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

fn write_pgm(out: &mut dyn Write, img: &[u8], width: usize, height: usize) -> io::Result<()> {
    write!(out, "P5\n{} {}\n255\n", width, height)?;
    out.write_all(img)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();

    let mut recon = match Reconstructor::new(
        args.width,
        args.height,
        args.cutoff_period,
        args.tile_size,
        args.fill_ratio,
    ) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("event-recon: {}", e);
            std::process::exit(1);
        }
    };

    let stdin = io::stdin();
    let mut total: u64 = 0;
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        // x y polarity, or x y timestamp polarity
        if parts.len() != 3 && parts.len() != 4 {
            continue;
        }
        let x: u16 = match parts[0].parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        let y: u16 = match parts[1].parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        let pol: i8 = match parts[parts.len() - 1].parse() {
            Ok(v) => v,
            Err(_) => continue,
        };

        if let Err(e) = recon.event(x, y, pol) {
            eprintln!("event-recon: fatal after {} events: {}", total, e);
            std::process::exit(1);
        }
        total += 1;
    }

    let img = recon.get_image();
    let result = match args.output {
        Some(path) => File::create(&path)
            .and_then(|f| write_pgm(&mut io::BufWriter::new(f), &img, recon.width(), recon.height())),
        None => {
            let stdout = io::stdout();
            write_pgm(&mut stdout.lock(), &img, recon.width(), recon.height())
        }
    };
    if let Err(e) = result {
        eprintln!("event-recon: write failed: {}", e);
        std::process::exit(1);
    }

    eprintln!(
        "event-recon: {} events, window {}, {} pixels / {} tiles occupied",
        total,
        recon.event_window_size(),
        recon.num_occupied_pixels(),
        recon.num_occupied_tiles()
    );
}
