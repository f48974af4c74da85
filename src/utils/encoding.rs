// Text transcoding for tag payloads
//
// Many real-world mp3 files do not conform to the ID3 standard: the standard
// says a frame whose encoding selector byte is $00 holds ISO-8859-1 text, but
// files tagged on Chinese systems routinely hold GBK/GB18030 bytes there
// instead. The regional override policy reproduces that substitution; the
// strict policy follows the written standard.

use encoding_rs::{Encoding, GB18030, UTF_16BE, UTF_16LE, WINDOWS_1252};

/// Policy for interpreting the single-byte legacy encoding (selector $00).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodingPolicy {
    /// ISO-8859-1, as the ID3v2.3 standard mandates.
    StrictSpec,
    /// GB18030, matching files tagged on GB-locale systems.
    #[default]
    RegionalLegacyOverride,
}

impl EncodingPolicy {
    /// The encoding substituted for selector byte $00.
    pub fn legacy_encoding(self) -> TextEncoding {
        match self {
            EncodingPolicy::StrictSpec => TextEncoding::Latin1,
            EncodingPolicy::RegionalLegacyOverride => TextEncoding::Gb18030,
        }
    }
}

/// Source encoding handed to the transcoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Latin1,
    Utf16,
    Gb18030,
}

impl TextEncoding {
    fn name(self) -> &'static str {
        match self {
            TextEncoding::Latin1 => "ISO-8859-1",
            TextEncoding::Utf16 => "UTF-16",
            TextEncoding::Gb18030 => "GB18030",
        }
    }
}

/// Transcoding failure: unmappable bytes or a truncated multi-byte sequence.
#[derive(Debug)]
pub struct TranscodeError {
    pub encoding: &'static str,
}

impl std::fmt::Display for TranscodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "undecodable {} text", self.encoding)
    }
}

impl std::error::Error for TranscodeError {}

/// Transcode raw tag bytes into UTF-8 text.
///
/// UTF-16 input is byte-order-switched on its BOM; without a BOM it is read
/// as little-endian. Embedded NULs and trailing terminators are stripped.
pub fn transcode(data: &[u8], encoding: TextEncoding) -> Result<String, TranscodeError> {
    let decoded = match encoding {
        TextEncoding::Latin1 => decode_with(WINDOWS_1252, data, encoding)?,
        TextEncoding::Gb18030 => decode_with(GB18030, data, encoding)?,
        TextEncoding::Utf16 => {
            if data.len() >= 2 && data[0..2] == [0xFF, 0xFE] {
                decode_with(UTF_16LE, &data[2..], encoding)?
            } else if data.len() >= 2 && data[0..2] == [0xFE, 0xFF] {
                decode_with(UTF_16BE, &data[2..], encoding)?
            } else {
                decode_with(UTF_16LE, data, encoding)?
            }
        }
    };

    Ok(decoded.trim_end_matches('\0').to_string())
}

fn decode_with(
    codec: &'static Encoding,
    data: &[u8],
    encoding: TextEncoding,
) -> Result<String, TranscodeError> {
    let (text, _, had_errors) = codec.decode(data);
    if had_errors {
        return Err(TranscodeError {
            encoding: encoding.name(),
        });
    }
    Ok(text.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_legacy_encoding() {
        assert_eq!(
            EncodingPolicy::StrictSpec.legacy_encoding(),
            TextEncoding::Latin1
        );
        assert_eq!(
            EncodingPolicy::RegionalLegacyOverride.legacy_encoding(),
            TextEncoding::Gb18030
        );
        assert_eq!(
            EncodingPolicy::default(),
            EncodingPolicy::RegionalLegacyOverride
        );
    }

    #[test]
    fn test_transcode_latin1() {
        let text = transcode(&[0x41, 0xE9, 0x42], TextEncoding::Latin1).unwrap();
        assert_eq!(text, "A\u{e9}B");
    }

    #[test]
    fn test_transcode_utf16_le_bom() {
        let data = [0xFF, 0xFE, b'h', 0x00, b'i', 0x00];
        assert_eq!(transcode(&data, TextEncoding::Utf16).unwrap(), "hi");
    }

    #[test]
    fn test_transcode_utf16_be_bom() {
        let data = [0xFE, 0xFF, 0x00, b'h', 0x00, b'i'];
        assert_eq!(transcode(&data, TextEncoding::Utf16).unwrap(), "hi");
    }

    #[test]
    fn test_transcode_utf16_truncated() {
        // Odd byte count leaves a dangling half code unit
        let data = [0xFF, 0xFE, b'h', 0x00, b'i'];
        assert!(transcode(&data, TextEncoding::Utf16).is_err());
    }

    #[test]
    fn test_transcode_gb18030_invalid() {
        assert!(transcode(&[0xFF, 0xFF], TextEncoding::Gb18030).is_err());
    }

    #[test]
    fn test_transcode_gb18030_ascii() {
        assert_eq!(
            transcode(b"plain ascii", TextEncoding::Gb18030).unwrap(),
            "plain ascii"
        );
    }

    #[test]
    fn test_transcode_strips_terminator() {
        assert_eq!(
            transcode(&[b'o', b'k', 0x00], TextEncoding::Latin1).unwrap(),
            "ok"
        );
    }
}
