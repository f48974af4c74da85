// mp3scan - a read-only MP3 inspector
//
// Recovers ID3v2.3 tag metadata (with an ID3v1 trailer fallback) and coarse
// MPEG audio stream statistics. Two passes over disjoint file regions: the
// tag walk, then a frame-sync scan over the audio region. Nothing is ever
// written back to the file.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};

use serde::Serialize;

mod id3;
mod mpeg;
mod utils;

pub use id3::{FrameSizeMode, Id3v1Tag, TagHeader};
pub use mpeg::{FrameInfo, FrameScanner, StreamStats};
pub use utils::encoding::EncodingPolicy;

/// Inspection failure for one file.
///
/// Per-frame and per-sync-candidate problems never surface here; they are
/// handled locally so one bad frame cannot take down the walk.
#[derive(Debug)]
pub enum ScanError {
    /// No "ID3" magic at offset 0.
    NotAnId3File,
    /// Tag version other than 2.3, with `strict_version` set.
    UnsupportedVersion { major: u8, minor: u8 },
    /// End of input before an expected structure was complete.
    Truncated,
    Io(std::io::Error),
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanError::NotAnId3File => write!(f, "no ID3v2 header"),
            ScanError::UnsupportedVersion { major, minor } => {
                write!(f, "unsupported tag version 2.{}.{}", major, minor)
            }
            ScanError::Truncated => write!(f, "file truncated"),
            ScanError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ScanError {}

impl From<std::io::Error> for ScanError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ScanError::Truncated
        } else {
            ScanError::Io(e)
        }
    }
}

/// Knobs for the points where observed files disagree with the standard or
/// with each other.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Reject tags whose version is not 2.3.0. Off by default; version
    /// drift is common in otherwise well-formed files.
    pub strict_version: bool,
    /// What the $00 encoding selector means.
    pub encoding_policy: EncodingPolicy,
    /// How frame size fields are decoded.
    pub frame_size_mode: FrameSizeMode,
}

/// One decoded tag field, in frame encounter order.
#[derive(Debug, Serialize)]
pub struct DecodedField {
    pub id: String,
    pub label: &'static str,
    pub value: FieldValue,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    /// Binary payload reported by size only (pictures).
    Binary { bytes: u32 },
}

/// The ID3v2 portion of a report.
#[derive(Debug, Serialize)]
pub struct TagReport {
    pub version: String,
    pub unsynchronization: bool,
    pub extended_header: bool,
    pub experimental: bool,
    pub fields: Vec<DecodedField>,
    pub has_footer: bool,
}

/// Everything recovered from one file.
#[derive(Debug, Default, Serialize)]
pub struct InspectReport {
    pub tag: Option<TagReport>,
    pub legacy: Option<Id3v1Tag>,
    pub audio: StreamStats,
}

/// Handle on one MP3 file path.
pub struct Mp3File {
    pub path: String,
}

impl Mp3File {
    pub fn open(path: impl Into<String>) -> Self {
        Mp3File { path: path.into() }
    }

    /// Inspect the file. The handle is opened here and closed on every
    /// exit path when the reader drops.
    pub fn inspect(&self, options: &ScanOptions) -> Result<InspectReport, ScanError> {
        let file = File::open(&self.path).map_err(ScanError::Io)?;
        let mut reader = BufReader::new(file);
        inspect_reader(&mut reader, options)
    }
}

/// Inspect any seekable byte source holding one MP3 file.
///
/// The audio scan always starts at `tag_size + 10` when an ID3v2 header is
/// present, however the frame walk ended; without one, the audio region is
/// the whole file and the ID3v1 trailer is consulted for metadata instead.
pub fn inspect_reader<R: Read + Seek>(
    reader: &mut R,
    options: &ScanOptions,
) -> Result<InspectReport, ScanError> {
    let mut report = InspectReport::default();

    let audio_start = match TagHeader::read(reader, options.strict_version) {
        Ok(header) => {
            let fields = id3::v2::walk_frames(reader, header.size, options)?;
            let has_footer = id3::v2::read_footer(reader, header.size);
            let audio_start = u64::from(header.size) + 10;
            report.tag = Some(TagReport {
                version: format!("2.{}.{}", header.version.0, header.version.1),
                unsynchronization: header.unsynchronization,
                extended_header: header.extended_header,
                experimental: header.experimental,
                fields,
                has_footer,
            });
            audio_start
        }
        Err(ScanError::NotAnId3File) => {
            report.legacy = Id3v1Tag::read(reader, options.encoding_policy)?;
            0
        }
        Err(e) => return Err(e),
    };

    reader.seek(SeekFrom::Start(audio_start))?;
    report.audio = StreamStats::collect(FrameScanner::new(reader, audio_start));

    Ok(report)
}
