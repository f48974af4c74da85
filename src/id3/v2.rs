// ID3v2.3 tag header and frame walk
//
// Tag layout: | tag header (10 bytes) | frames | padding | audio data |
// Bit order is most significant bit first throughout.

use std::io::{Read, Seek, SeekFrom};

use crate::id3::frames::{self, FrameKind};
use crate::utils::encoding::{transcode, TextEncoding};
use crate::utils::io::{decode_be_u32, decode_synchsafe};
use crate::{DecodedField, FieldValue, ScanError, ScanOptions};

/// ID3v2 tag header.
///
/// The declared size excludes the 10 header bytes, so the audio region
/// begins at file offset `size + 10`.
#[derive(Debug, Clone)]
pub struct TagHeader {
    pub version: (u8, u8),
    pub unsynchronization: bool,
    pub extended_header: bool,
    pub experimental: bool,
    pub size: u32,
}

impl TagHeader {
    const SIZE: usize = 10;
    const MAGIC: [u8; 3] = *b"ID3";

    /// Read the tag header from a reader positioned at file offset 0.
    ///
    /// `ScanError::NotAnId3File` when the magic is missing; the caller then
    /// falls back to the ID3v1 trailer. The version check only applies with
    /// `strict_version` set, since plenty of files drift from (3, 0) while
    /// keeping the v2.3 layout.
    pub fn read<R: Read>(reader: &mut R, strict_version: bool) -> Result<Self, ScanError> {
        let mut buf = [0u8; Self::SIZE];
        reader.read_exact(&mut buf)?;

        if buf[0..3] != Self::MAGIC {
            return Err(ScanError::NotAnId3File);
        }

        let version = (buf[3], buf[4]);
        if strict_version && version != (3, 0) {
            return Err(ScanError::UnsupportedVersion {
                major: version.0,
                minor: version.1,
            });
        }

        let flags = buf[5];
        let size = decode_synchsafe(buf[6..10].try_into().unwrap());

        Ok(TagHeader {
            version,
            unsynchronization: flags & 0x80 != 0,
            extended_header: flags & 0x40 != 0,
            experimental: flags & 0x20 != 0,
            size,
        })
    }
}

/// How the 4-byte frame size field is decoded.
///
/// Tagger output disagrees here in practice; synchsafe is the default, the
/// positional mode matches files written by taggers that used a plain
/// big-endian size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameSizeMode {
    #[default]
    Synchsafe,
    BigEndian,
}

/// One frame sub-header inside the tag body.
#[derive(Debug)]
pub struct FrameHeader {
    pub id: String,
    pub size: u32,
    #[allow(dead_code)]
    pub flags: u16,
}

impl FrameHeader {
    const SIZE: u32 = 10;

    fn parse(buf: &[u8; 10], mode: FrameSizeMode) -> Self {
        let id = String::from_utf8_lossy(&buf[0..4]).to_string();
        let size_bytes: &[u8; 4] = buf[4..8].try_into().unwrap();
        let size = match mode {
            FrameSizeMode::Synchsafe => decode_synchsafe(size_bytes),
            FrameSizeMode::BigEndian => decode_be_u32(size_bytes),
        };
        let flags = u16::from_be_bytes([buf[8], buf[9]]);

        FrameHeader { id, size, flags }
    }
}

/// Walk the frame sequence in the tag body `[10, 10 + tag_size)`.
///
/// The walk ends normally when the declared tag size is used up, when a
/// frame id outside the recognized table shows up (trailing padding decodes
/// as such an id), or when a frame claims more bytes than the body has left.
/// Per-frame decode problems skip that frame only; a short read inside the
/// declared body is fatal for the file.
pub fn walk_frames<R: Read>(
    reader: &mut R,
    tag_size: u32,
    options: &ScanOptions,
) -> Result<Vec<DecodedField>, ScanError> {
    let mut fields = Vec::new();
    let mut remaining = tag_size;

    while remaining >= FrameHeader::SIZE {
        let mut buf = [0u8; 10];
        reader.read_exact(&mut buf)?;

        let header = FrameHeader::parse(&buf, options.frame_size_mode);
        let label = match frames::label_for(&header.id) {
            Some(label) => label,
            None => break,
        };
        remaining -= FrameHeader::SIZE;

        if header.size > remaining {
            break;
        }

        // Payload buffer lives for this iteration only
        let mut payload = vec![0u8; header.size as usize];
        reader.read_exact(&mut payload)?;
        remaining -= header.size;

        match frames::classify(&header.id) {
            FrameKind::Picture => {
                fields.push(DecodedField {
                    id: header.id,
                    label,
                    value: FieldValue::Binary { bytes: header.size },
                });
            }
            FrameKind::Private => {
                // No selector byte; the whole payload is single-byte text
                if payload.is_empty() {
                    continue;
                }
                if let Ok(text) = transcode(&payload, TextEncoding::Latin1) {
                    fields.push(DecodedField {
                        id: header.id,
                        label,
                        value: FieldValue::Text(text),
                    });
                }
            }
            FrameKind::Text => {
                if header.size <= 1 {
                    continue;
                }
                let encoding = if payload[0] == 1 {
                    TextEncoding::Utf16
                } else {
                    options.encoding_policy.legacy_encoding()
                };
                if let Ok(text) = transcode(&payload[1..], encoding) {
                    fields.push(DecodedField {
                        id: header.id,
                        label,
                        value: FieldValue::Text(text),
                    });
                }
            }
        }
    }

    Ok(fields)
}

/// Best-effort check for the "3DI" footer in the 10 bytes ending the tag
/// region. Absence is the common case and never blocks the audio scan.
pub fn read_footer<R: Read + Seek>(reader: &mut R, tag_size: u32) -> bool {
    if reader.seek(SeekFrom::Start(u64::from(tag_size))).is_err() {
        return false;
    }

    let mut buf = [0u8; 10];
    if reader.read_exact(&mut buf).is_err() {
        return false;
    }

    &buf[0..3] == b"3DI"
}
