//! Audio capture sessions and recorded clips.
//!
//! A capture session delivers raw audio fragments while it is running. When the
//! session ends, the fragments are assembled into a single [`Clip`] that can be
//! encoded as WAV for playback and upload.

pub mod microphone;

use anyhow::Result;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;
use std::path::Path;

pub use microphone::{suppress_alsa_warnings, MicrophoneSource};

/// File name used when uploading a recorded clip.
pub const CLIP_FILE_NAME: &str = "recording.wav";

/// Content type attached to a recorded clip.
pub const CLIP_MIME: &str = "audio/wav";

/// PCM layout of the fragments a session produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for ClipFormat {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
        }
    }
}

/// Opens capture sessions (microphone access).
pub trait AudioSource {
    type Session: CaptureSession;

    /// Requests access to the input device and starts a new session.
    ///
    /// # Errors
    /// - If no input device is available or access is denied
    fn open(&mut self) -> Result<Self::Session>;
}

/// A running capture session.
pub trait CaptureSession {
    /// Returns every fragment delivered since the previous call, in arrival order.
    fn take_fragments(&mut self) -> Vec<Vec<u8>>;

    /// Whether the session is still capturing.
    fn is_active(&self) -> bool;

    /// Ends capture. Fragments produced before the stop stay available
    /// through [`CaptureSession::take_fragments`].
    fn stop(&mut self) -> Result<()>;

    /// PCM layout of the delivered fragments.
    fn format(&self) -> ClipFormat;
}

/// A finished recording: the concatenation of every fragment of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clip {
    data: Vec<u8>,
    format: ClipFormat,
}

impl Clip {
    /// Assembles fragments into one clip, preserving their order.
    pub fn assemble(fragments: &[Vec<u8>], format: ClipFormat) -> Self {
        let data = fragments.concat();
        Self { data, format }
    }

    /// Raw little-endian 16-bit PCM bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn mime(&self) -> &'static str {
        CLIP_MIME
    }

    /// Duration of the clip in seconds.
    pub fn duration_secs(&self) -> f32 {
        let frame_bytes = 2 * self.format.channels.max(1) as usize;
        let frames = self.data.len() / frame_bytes;
        frames as f32 / self.format.sample_rate.max(1) as f32
    }

    /// Encodes the clip as a WAV file in memory.
    ///
    /// A trailing odd byte is ignored.
    ///
    /// # Errors
    /// - If the WAV writer fails
    pub fn to_wav(&self) -> Result<Vec<u8>> {
        let spec = WavSpec {
            channels: self.format.channels,
            sample_rate: self.format.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec)?;
            for pair in self.data.chunks_exact(2) {
                writer.write_sample(i16::from_le_bytes([pair[0], pair[1]]))?;
            }
            writer.finalize()?;
        }

        Ok(cursor.into_inner())
    }

    /// Writes the WAV encoding of the clip to `path`.
    ///
    /// # Errors
    /// - If encoding or the file write fails
    pub fn write_wav(&self, path: &Path) -> Result<()> {
        let bytes = self.to_wav()?;
        std::fs::write(path, bytes)?;
        tracing::debug!("Recording written for playback: {}", path.display());
        Ok(())
    }
}

/// Encodes mono i16 samples as little-endian bytes.
pub fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Decodes little-endian bytes back into i16 samples.
pub fn bytes_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_keeps_arrival_order() {
        let fragments = vec![vec![1, 2], vec![3], vec![], vec![4, 5, 6]];
        let clip = Clip::assemble(&fragments, ClipFormat::default());
        assert_eq!(clip.data(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(clip.mime(), "audio/wav");
    }

    #[test]
    fn test_to_wav_produces_readable_file() {
        let samples: Vec<i16> = vec![0, 1000, -1000, i16::MAX, i16::MIN];
        let clip = Clip::assemble(&[samples_to_bytes(&samples)], ClipFormat::default());

        let wav = clip.to_wav().unwrap();
        assert_eq!(&wav[0..4], b"RIFF");

        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        assert_eq!(reader.spec().sample_rate, 16000);
        assert_eq!(reader.spec().channels, 1);
        let decoded: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn test_duration() {
        let clip = Clip::assemble(&[vec![0u8; 32000]], ClipFormat::default());
        assert!((clip.duration_secs() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_sample_byte_conversion() {
        let samples = vec![-2i16, 7, 300];
        assert_eq!(bytes_to_samples(&samples_to_bytes(&samples)), samples);
    }
}
