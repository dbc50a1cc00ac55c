//! # Frame Inspector
//!
//! Decodes a captured server message and prints what it contains.
//!
//! ## Usage
//!
//! ```bash
//! frame_inspect capture.bin
//! frame_inspect --config coil.toml --geometry capture.bin
//! frame_inspect --text join.json
//! ```

use std::process::ExitCode;

use coil_sync::protocol::{decode_frame, parse_side_channel, FrameUpdate};
use coil_sync::SyncConfig;

struct Options {
    config: Option<String>,
    text: bool,
    geometry: bool,
    path: Option<String>,
}

fn usage() {
    println!("Usage: frame_inspect [OPTIONS] <FILE>");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>   Load sync constants from a TOML file");
    println!("  -t, --text            Treat the file as a side-channel JSON message");
    println!("  -g, --geometry        Print rebuilt chunk paths");
    println!("  -h, --help            Show this help");
}

fn parse_args() -> Option<Options> {
    let args: Vec<String> = std::env::args().collect();
    let mut options = Options {
        config: None,
        text: false,
        geometry: false,
        path: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    options.config = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--text" | "-t" => options.text = true,
            "--geometry" | "-g" => options.geometry = true,
            "--help" | "-h" => return None,
            other => options.path = Some(other.to_owned()),
        }
        i += 1;
    }
    Some(options)
}

fn print_frame(frame: &FrameUpdate, bytes: usize, geometry: bool) {
    println!("┌─ FRAME ──────────────────────────────────────────────────────────┐");
    println!("│ Size:               {} bytes", bytes);
    println!("│ Ticks:              {}", frame.ticks);
    println!("│ Snakes:             {}", frame.snakes.len());
    println!("│ Chunks:             {}", frame.chunks.len());
    println!("│ Food cells:         {}", frame.foods.len());
    println!(
        "│ Heat-map:           {}",
        frame
            .heatmap
            .as_ref()
            .map_or_else(|| "none".to_owned(), |h| format!("{}x{}", h.width, h.height))
    );
    println!("└──────────────────────────────────────────────────────────────────┘");

    for snake in &frame.snakes {
        println!(
            "snake {:>5}  head chunk {:>5}  len {:>8.2}  width {:>5.2}  at ({:.1}, {:.1}){}",
            snake.id,
            snake.head_chunk,
            snake.length,
            snake.width,
            snake.head.x,
            snake.head.y,
            if snake.fast { "  FAST" } else { "" }
        );
    }

    for chunk in &frame.chunks {
        println!(
            "chunk {:>11}  {:>3} points  path {:>8.3}  offset {:>7.3}{}",
            chunk.key.to_string(),
            chunk.geometry.points.len(),
            chunk.geometry.path_length,
            chunk.offset,
            if chunk.full { "  full" } else { "" }
        );
        if geometry {
            for point in &chunk.geometry.points {
                println!(
                    "    ({:>9.3}, {:>9.3})  d={:.3}",
                    point.position.x, point.position.y, point.distance
                );
            }
        }
    }

    for food in &frame.foods {
        println!(
            "food  ({:>3}, {:>3})  {} items",
            food.column,
            food.row,
            food.items.len()
        );
    }
}

fn main() -> ExitCode {
    let Some(options) = parse_args() else {
        usage();
        return ExitCode::SUCCESS;
    };
    let Some(path) = options.path else {
        usage();
        return ExitCode::FAILURE;
    };

    let config = match &options.config {
        Some(config_path) => match SyncConfig::load(config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Config error: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => SyncConfig::default(),
    };

    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Cannot read {path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    if options.text {
        let text = String::from_utf8_lossy(&bytes);
        return match parse_side_channel(&text) {
            Ok(event) => {
                println!("{} message: {event:?}", event.kind());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Bad side-channel message: {e}");
                ExitCode::FAILURE
            }
        };
    }

    match decode_frame(&bytes, &config) {
        Ok(frame) => {
            print_frame(&frame, bytes.len(), options.geometry);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Decode failed: {e}");
            ExitCode::FAILURE
        }
    }
}
