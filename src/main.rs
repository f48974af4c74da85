// CLI binary entry point for mp3scan
//
// Expands each argument as a glob pattern and inspects every match; a file
// that fails never aborts the rest of the batch.

use std::path::Path;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use mp3scan::{
    EncodingPolicy, FieldValue, FrameSizeMode, InspectReport, Mp3File, ScanOptions,
};

/// mp3scan - read-only MP3 metadata and stream inspector
#[derive(Parser, Debug)]
#[command(name = "mp3scan")]
#[command(about = "Inspect ID3v2.3/ID3v1 metadata and MPEG audio stream statistics", long_about = None)]
#[command(version)]
struct Config {
    /// File paths or glob patterns
    #[arg(value_name = "PATTERN", required = true)]
    patterns: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    format: OutputFormat,

    /// Quiet mode (suppress banners and headers)
    #[arg(short, long)]
    quiet: bool,

    /// Reject tags whose version is not 2.3
    #[arg(long)]
    strict_version: bool,

    /// Meaning of the $00 encoding selector byte
    #[arg(long, value_enum, default_value = "regional")]
    encoding: EncodingArg,

    /// Decoding of the 4-byte frame size field
    #[arg(long, value_enum, default_value = "synchsafe")]
    frame_size: FrameSizeArg,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
enum EncodingArg {
    /// GB18030, matching files tagged on GB-locale systems
    Regional,
    /// ISO-8859-1 per the ID3v2.3 standard
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
enum FrameSizeArg {
    Synchsafe,
    BigEndian,
}

fn main() {
    let config = Config::parse();
    let options = ScanOptions {
        strict_version: config.strict_version,
        encoding_policy: match config.encoding {
            EncodingArg::Regional => EncodingPolicy::RegionalLegacyOverride,
            EncodingArg::Strict => EncodingPolicy::StrictSpec,
        },
        frame_size_mode: match config.frame_size {
            FrameSizeArg::Synchsafe => FrameSizeMode::Synchsafe,
            FrameSizeArg::BigEndian => FrameSizeMode::BigEndian,
        },
    };

    let mut matched = 0usize;
    let mut failed = 0usize;

    for pattern in &config.patterns {
        let entries = match glob::glob(pattern) {
            Ok(entries) => entries,
            Err(e) => {
                eprintln!("✗ {}: invalid pattern ({})", pattern, e);
                continue;
            }
        };

        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    eprintln!("✗ {}", e);
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }

            matched += 1;
            if let Err(e) = inspect_one(&path, &options, &config) {
                eprintln!("✗ {}: {:#}", path.display(), e);
                failed += 1;
            }
        }
    }

    if matched == 0 {
        eprintln!("Error: no files matched");
        process::exit(1);
    }
    if failed == matched {
        process::exit(1);
    }
}

fn inspect_one(path: &Path, options: &ScanOptions, config: &Config) -> Result<()> {
    let report = Mp3File::open(path.to_string_lossy())
        .inspect(options)
        .context("inspect failed")?;

    match config.format {
        OutputFormat::Pretty => print_pretty(&path.to_string_lossy(), &report, config.quiet),
        OutputFormat::Json => print_json(&path.to_string_lossy(), &report)?,
    }
    Ok(())
}

fn print_pretty(path: &str, report: &InspectReport, quiet: bool) {
    if !quiet {
        println!("{}", "-".repeat(60));
    }
    println!("{}", path);

    if let Some(tag) = &report.tag {
        if !quiet {
            let footer = if tag.has_footer { ", footer present" } else { "" };
            println!("ID3v{} tag{}", tag.version, footer);
        }
        for field in &tag.fields {
            match &field.value {
                FieldValue::Text(text) => println!("  {}: {}", field.label, text),
                FieldValue::Binary { bytes } => {
                    println!("  {}: <{} bytes>", field.label, bytes)
                }
            }
        }
    } else if let Some(legacy) = &report.legacy {
        if !quiet {
            println!("ID3v1 tag");
        }
        let fields = [
            ("Title", &legacy.title),
            ("Artist", &legacy.artist),
            ("Album", &legacy.album),
            ("Year", &legacy.year),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                println!("  {}: {}", label, value);
            }
        }
        println!("  Genre: {}", legacy.genre);
    } else if !quiet {
        println!("  no tag found");
    }

    match report.audio.average_bitrate {
        Some(avg) => println!(
            "  Audio: {} frames, {} Hz, average {} bit/s",
            report.audio.frame_count,
            report.audio.sample_rate.unwrap_or(0),
            avg
        ),
        None => println!("  Audio: no frames detected"),
    }
}

fn print_json(path: &str, report: &InspectReport) -> Result<()> {
    let mut value = serde_json::to_value(report).context("serialize report")?;
    if let Some(object) = value.as_object_mut() {
        object.insert(
            "path".to_string(),
            serde_json::Value::String(path.to_string()),
        );
    }
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
