// MPEG audio frame synchronizer
//
// Scans raw bytes for the 11-bit frame sync pattern, validates candidate
// headers, and derives stream statistics. Two states: seeking sync and
// validating a candidate. A candidate that decodes to an invalid bitrate,
// sample rate, or a reserved version/layer combination was data that
// happened to contain 0xFF; scanning resumes at the byte after the
// candidate's header bytes, never rewinding.

use std::io::{Read, Seek, SeekFrom};

use serde::Serialize;

/// MPEG-1 Layer III bitrates in bits/second, indexed by the 4-bit header
/// field. Indices 0 (free) and 15 (invalid) decode to 0.
const BITRATES: [u32; 16] = [
    0, 32_000, 40_000, 48_000, 56_000, 64_000, 80_000, 96_000, 112_000, 128_000, 160_000, 192_000,
    224_000, 256_000, 320_000, 0,
];

/// Sample rates in Hz, indexed by the 2-bit header field; 3 is reserved.
const SAMPLE_RATES: [u32; 4] = [44_100, 48_000, 32_000, 0];

/// One accepted audio frame header.
#[derive(Debug, Clone, Copy)]
pub struct FrameInfo {
    /// Byte offset of the sync byte in the source.
    pub offset: u64,
    /// Whether the version/layer bits match MPEG-1 Layer III. Other
    /// recognized combinations are accepted but flagged.
    pub is_mpeg1_layer3: bool,
    pub bitrate: u32,
    pub sample_rate: u32,
    pub padding: bool,
    /// Whole frame length in bytes, header included.
    pub frame_len: u32,
}

/// Iterator over accepted frames, starting at the audio-region offset and
/// running to end of input. Dropping the iterator aborts the scan.
pub struct FrameScanner<'a, R> {
    reader: &'a mut R,
    pos: u64,
}

impl<'a, R: Read + Seek> FrameScanner<'a, R> {
    /// `start` is the absolute offset the reader is positioned at; it only
    /// feeds the offsets reported in `FrameInfo`.
    pub fn new(reader: &'a mut R, start: u64) -> Self {
        FrameScanner { reader, pos: start }
    }

    fn read_byte(&mut self) -> Option<u8> {
        let mut buf = [0u8; 1];
        self.reader.read_exact(&mut buf).ok()?;
        self.pos += 1;
        Some(buf[0])
    }
}

impl<R: Read + Seek> Iterator for FrameScanner<'_, R> {
    type Item = FrameInfo;

    fn next(&mut self) -> Option<FrameInfo> {
        loop {
            // Seeking sync: 0xFF then a byte whose high nibble keeps the
            // sync pattern going. Both bytes are consumed either way.
            let byte = self.read_byte()?;
            if byte != 0xFF {
                continue;
            }
            let b1 = self.read_byte()?;
            if (b1 & 0xF0) != 0xF0 && (b1 & 0xF0) != 0xE0 {
                continue;
            }

            // Validating: decode the rest of the 4-byte header
            let mut rest = [0u8; 2];
            self.reader.read_exact(&mut rest).ok()?;
            self.pos += 2;
            let offset = self.pos - 4;

            let version_bits = (b1 >> 3) & 0x03;
            let layer_bits = (b1 >> 1) & 0x03;
            let bitrate = BITRATES[usize::from(rest[0] >> 4)];
            let sample_rate = SAMPLE_RATES[usize::from((rest[0] >> 2) & 0x03)];

            // Reserved version or layer means the 0xFF was data, as does an
            // invalid bitrate or sample rate; resume at the next byte
            if version_bits == 0b01 || layer_bits == 0b00 || bitrate == 0 || sample_rate == 0 {
                continue;
            }

            let padding = rest[0] & 0x02 != 0;
            let is_mpeg1_layer3 = version_bits == 0b11 && layer_bits == 0b01;
            let frame_len = 144 * bitrate / sample_rate + u32::from(padding);

            // Land on the next frame boundary; 4 header bytes already read
            let skip = i64::from(frame_len) - 4;
            self.reader.seek(SeekFrom::Current(skip)).ok()?;
            self.pos += skip as u64;

            return Some(FrameInfo {
                offset,
                is_mpeg1_layer3,
                bitrate,
                sample_rate,
                padding,
                frame_len,
            });
        }
    }
}

/// Aggregate statistics over one scan.
///
/// The sample rate is taken from the first accepted frame and assumed to
/// hold file-wide. The average is `None` when no frame was accepted.
#[derive(Debug, Default, Serialize)]
pub struct StreamStats {
    pub frame_count: u32,
    pub sample_rate: Option<u32>,
    pub average_bitrate: Option<u32>,
}

impl StreamStats {
    pub fn collect<R: Read + Seek>(scanner: FrameScanner<'_, R>) -> Self {
        let mut stats = StreamStats::default();
        let mut bitrate_sum: u64 = 0;

        for frame in scanner {
            stats.frame_count += 1;
            bitrate_sum += u64::from(frame.bitrate);
            if stats.sample_rate.is_none() {
                stats.sample_rate = Some(frame.sample_rate);
            }
        }

        if stats.frame_count > 0 {
            stats.average_bitrate = Some((bitrate_sum / u64::from(stats.frame_count)) as u32);
        }
        stats
    }
}
