// ID3v1 trailer fallback
//
// Consulted only when no ID3v2 header is present: a fixed 128-byte block at
// the end of the file, magic "TAG", fixed-width fields.

use std::io::{Read, Seek, SeekFrom};

use serde::Serialize;

use crate::utils::encoding::{transcode, EncodingPolicy};
use crate::ScanError;

/// ID3v1 tag fields. Text fields go through the same transcoder as v2
/// frames under the active encoding policy; a field that fails to decode is
/// dropped rather than failing the tag.
#[derive(Debug, Default, Serialize)]
pub struct Id3v1Tag {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<String>,
    pub genre: u8,
}

impl Id3v1Tag {
    const TAG_SIZE: usize = 128;
    const MAGIC: [u8; 3] = *b"TAG";

    /// Read the trailer from the last 128 bytes of the source. `Ok(None)`
    /// when the source is too short or the magic is missing.
    pub fn read<R: Read + Seek>(
        reader: &mut R,
        policy: EncodingPolicy,
    ) -> Result<Option<Self>, ScanError> {
        if reader.seek(SeekFrom::End(-(Self::TAG_SIZE as i64))).is_err() {
            return Ok(None);
        }

        let mut buffer = [0u8; Self::TAG_SIZE];
        reader.read_exact(&mut buffer)?;

        if buffer[0..3] != Self::MAGIC {
            return Ok(None);
        }

        Ok(Some(Id3v1Tag {
            title: decode_field(&buffer[3..33], policy),
            artist: decode_field(&buffer[33..63], policy),
            album: decode_field(&buffer[63..93], policy),
            year: decode_field(&buffer[93..97], policy),
            genre: buffer[127],
        }))
    }
}

/// NUL-truncate a fixed-width field and transcode it. Empty and
/// undecodable fields both come back as `None`.
fn decode_field(bytes: &[u8], policy: EncodingPolicy) -> Option<String> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let text = transcode(&bytes[..end], policy.legacy_encoding()).ok()?;
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn trailer(title: &[u8], artist: &[u8], album: &[u8], year: &[u8], genre: u8) -> Vec<u8> {
        let mut buf = vec![0u8; 128];
        buf[0..3].copy_from_slice(b"TAG");
        buf[3..3 + title.len()].copy_from_slice(title);
        buf[33..33 + artist.len()].copy_from_slice(artist);
        buf[63..63 + album.len()].copy_from_slice(album);
        buf[93..93 + year.len()].copy_from_slice(year);
        buf[127] = genre;
        buf
    }

    #[test]
    fn test_read_trailer() {
        let mut data = vec![0xAAu8; 300];
        data.extend_from_slice(&trailer(b"Song", b"Someone", b"Record", b"1997", 17));

        let tag = Id3v1Tag::read(&mut Cursor::new(data), EncodingPolicy::default())
            .unwrap()
            .unwrap();
        assert_eq!(tag.title.as_deref(), Some("Song"));
        assert_eq!(tag.artist.as_deref(), Some("Someone"));
        assert_eq!(tag.album.as_deref(), Some("Record"));
        assert_eq!(tag.year.as_deref(), Some("1997"));
        assert_eq!(tag.genre, 17);
    }

    #[test]
    fn test_empty_fields_dropped() {
        let mut data = vec![0u8; 200];
        data.extend_from_slice(&trailer(b"Song", b"", b"", b"", 0));

        let tag = Id3v1Tag::read(&mut Cursor::new(data), EncodingPolicy::default())
            .unwrap()
            .unwrap();
        assert_eq!(tag.title.as_deref(), Some("Song"));
        assert!(tag.artist.is_none());
        assert!(tag.album.is_none());
    }

    #[test]
    fn test_no_magic() {
        let data = vec![0u8; 256];
        let tag = Id3v1Tag::read(&mut Cursor::new(data), EncodingPolicy::default()).unwrap();
        assert!(tag.is_none());
    }

    #[test]
    fn test_short_file() {
        let data = vec![0u8; 64];
        let tag = Id3v1Tag::read(&mut Cursor::new(data), EncodingPolicy::default()).unwrap();
        assert!(tag.is_none());
    }

    #[test]
    fn test_undecodable_field_dropped() {
        // 0xFF is invalid as a GB18030 lead byte
        let mut data = vec![0u8; 150];
        data.extend_from_slice(&trailer(&[0xFF, 0xFF], b"Someone", b"", b"", 0));

        let tag = Id3v1Tag::read(&mut Cursor::new(data), EncodingPolicy::default())
            .unwrap()
            .unwrap();
        assert!(tag.title.is_none());
        assert_eq!(tag.artist.as_deref(), Some("Someone"));
    }
}
