use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use bmc_codecs::lz77::{DEFAULT_LOOKAHEAD_SIZE, DEFAULT_WINDOW_SIZE};
use bmc_codecs::pipeline::{Pipeline, PipelineMetadata};
use bmc_core::format::{Container, Geometry};
use bmc_core::stage::Stage;

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "bmc",
    about = "Bitmap compression — LZ77 + Huffman pixel codec with a .bmc container",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress an image file into a .bmc container
    Compress {
        /// Source file (BMP geometry is detected; anything else is treated
        /// as a raw byte stream)
        input: PathBuf,
        /// Destination .bmc file
        output: PathBuf,
        /// LZ77 sliding window size in bytes (max 32767)
        #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE)]
        window_size: usize,
        /// LZ77 lookahead size in bytes (max 32767)
        #[arg(long, default_value_t = DEFAULT_LOOKAHEAD_SIZE)]
        lookahead_size: usize,
    },
    /// Decompress a .bmc container back to the original file bytes
    Decompress {
        /// Source .bmc file
        input: PathBuf,
        /// Destination file
        output: PathBuf,
    },
    /// Print container geometry, blob sizes, and per-stage codec metadata
    Inspect {
        /// .bmc file to inspect
        file: PathBuf,
    },
}

// ── BMP boundary ───────────────────────────────────────────────────────────

const BMP_HEADER_LEN: usize = 54;

/// Split a BMP file into its header bytes and pixel array, if the geometry
/// in the header accounts for the pixel bytes exactly. Returns `None` for
/// non-BMP input or row-padded layouts, which are handled as raw streams.
fn split_bmp(data: &[u8]) -> Option<(Geometry, &[u8], &[u8])> {
    if data.len() < BMP_HEADER_LEN || &data[0..2] != b"BM" {
        return None;
    }
    let pixel_offset =
        u32::from_le_bytes([data[10], data[11], data[12], data[13]]) as usize;
    let width = i32::from_le_bytes([data[18], data[19], data[20], data[21]]).unsigned_abs();
    let height = i32::from_le_bytes([data[22], data[23], data[24], data[25]]).unsigned_abs();
    let bits_per_pixel = u16::from_le_bytes([data[28], data[29]]);

    if pixel_offset < BMP_HEADER_LEN || pixel_offset > data.len() || bits_per_pixel % 8 != 0 {
        return None;
    }
    let channels = (bits_per_pixel / 8) as u8;
    let geometry = Geometry {
        width,
        height,
        channels,
    };
    let (header, pixels) = data.split_at(pixel_offset);
    if geometry.pixel_bytes() != pixels.len() {
        return None;
    }
    Some((geometry, header, pixels))
}

/// Raw-stream fallback: the whole file is one row of single-channel pixels.
fn raw_geometry(data: &[u8]) -> Geometry {
    Geometry {
        width: data.len() as u32,
        height: 1,
        channels: 1,
    }
}

// ── helpers ────────────────────────────────────────────────────────────────

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

// ── subcommand implementations ─────────────────────────────────────────────

fn run_compress(
    input: PathBuf,
    output: PathBuf,
    window_size: usize,
    lookahead_size: usize,
) -> anyhow::Result<()> {
    let data = std::fs::read(&input).with_context(|| format!("reading input {:?}", input))?;

    let (geometry, header_blob, pixels) = match split_bmp(&data) {
        Some((geometry, header, pixels)) => (geometry, header, pixels),
        None => (raw_geometry(&data), &data[..0], &data[..]),
    };

    let pipeline = Pipeline::new(window_size, lookahead_size)?;
    let t0 = Instant::now();
    let (payload, meta) = pipeline.encode(pixels)?;
    let elapsed = t0.elapsed();

    let container = Container {
        geometry,
        header_blob: header_blob.to_vec(),
        metadata_blob: meta.to_bytes(),
        payload,
    };
    let bytes = container.to_bytes();
    std::fs::write(&output, &bytes).with_context(|| format!("writing output {:?}", output))?;

    let ratio = data.len() as f64 / bytes.len() as f64;
    eprintln!("  geometry    : {}x{}x{}", geometry.width, geometry.height, geometry.channels);
    eprintln!("  lz77        : {}", if meta.lz77.applied { "applied" } else { "skipped" });
    eprintln!("  huffman     : {}", if meta.huffman.applied { "applied" } else { "skipped" });
    eprintln!("  raw size    : {}", human_bytes(data.len() as u64));
    eprintln!("  compressed  : {}", human_bytes(bytes.len() as u64));
    eprintln!("  ratio       : {:.2}x", ratio);
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_decompress(input: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let bytes = std::fs::read(&input).with_context(|| format!("reading input {:?}", input))?;

    let t0 = Instant::now();
    let (pixels, geometry, header_blob) = bmc_codecs::pipeline::decompress(&bytes)?;
    let elapsed = t0.elapsed();

    let mut restored = Vec::with_capacity(header_blob.len() + pixels.len());
    restored.extend_from_slice(&header_blob);
    restored.extend_from_slice(&pixels);
    std::fs::write(&output, &restored)
        .with_context(|| format!("writing output {:?}", output))?;

    eprintln!("  geometry    : {}x{}x{}", geometry.width, geometry.height, geometry.channels);
    eprintln!("  restored    : {}", human_bytes(restored.len() as u64));
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_inspect(file: PathBuf) -> anyhow::Result<()> {
    let bytes = std::fs::read(&file).with_context(|| format!("reading {:?}", file))?;
    let container = Container::from_bytes(&bytes)?;
    let meta = PipelineMetadata::from_bytes(&container.metadata_blob)?;

    let raw = container.geometry.pixel_bytes();
    println!("=== BMC file: {:?} ===", file);
    println!();
    println!("  width          : {}", container.geometry.width);
    println!("  height         : {}", container.geometry.height);
    println!("  channels       : {}", container.geometry.channels);
    println!("  header blob    : {}", human_bytes(container.header_blob.len() as u64));
    println!("  metadata blob  : {}", human_bytes(container.metadata_blob.len() as u64));
    println!("  payload        : {}", human_bytes(container.payload.len() as u64));
    println!("  pixel bytes    : {}", human_bytes(raw as u64));
    if !container.payload.is_empty() {
        println!("  ratio          : {:.2}x", raw as f64 / container.payload.len() as f64);
    }
    println!();
    println!("  lz77           : applied={} window={} lookahead={}",
        meta.lz77.applied, meta.lz77.window_size, meta.lz77.lookahead_size);
    println!("  huffman        : applied={} padding_bits={} table={}",
        meta.huffman.applied, meta.huffman.padding_bits,
        human_bytes(meta.huffman.table.len() as u64));
    Ok(())
}

// ── entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Compress {
            input,
            output,
            window_size,
            lookahead_size,
        } => run_compress(input, output, window_size, lookahead_size),
        Commands::Decompress { input, output } => run_decompress(input, output),
        Commands::Inspect { file } => run_inspect(file),
    }
}
