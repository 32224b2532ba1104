use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use geotiff_decode::{DecodeOptions, GeoTiff};
use tracing_subscriber::EnvFilter;

/// geotiff-info - Print the decoded metadata, GeoKeys and geotransform of a GeoTIFF.
#[derive(Parser, Debug, Clone)]
#[command(name = "geotiff-info")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// GeoTIFF file to decode.
    path: PathBuf,

    /// Print the summary as pretty JSON.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Read through a buffered reader instead of memory-mapping the file.
    #[arg(long, default_value_t = false)]
    no_mmap: bool,

    /// Decode blocks on the calling thread only.
    #[arg(long, default_value_t = false)]
    sequential: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl Args {
    fn decode_options(&self) -> DecodeOptions {
        DecodeOptions::new()
            .with_mmap(!self.no_mmap)
            .with_parallel(!self.sequential)
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let tiff = match GeoTiff::open_with_options(&args.path, args.decode_options()) {
        Ok(tiff) => tiff,
        Err(e) => {
            eprintln!("error: {}: {}", args.path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&tiff.summary()) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", tiff);

        let raster = tiff.raster();
        let (min, max) = raster
            .data()
            .iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if min <= max {
            println!("\nRaster:");
            println!("  Values: {}", raster.data().len());
            println!("  Min: {}", min);
            println!("  Max: {}", max);
        }
    }

    ExitCode::SUCCESS
}
