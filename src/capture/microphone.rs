//! Microphone capture through cpal.
//!
//! The input stream callback runs on the audio thread. Each callback buffer is
//! down-mixed to mono, encoded as little-endian i16 bytes and sent to the
//! session as one fragment.

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc::{self, Receiver, Sender};

use super::{samples_to_bytes, AudioSource, CaptureSession, ClipFormat};

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Opens capture sessions on a configured input device.
pub struct MicrophoneSource {
    /// Device name, numeric index, or "default"
    device_name: String,
    /// Sample rate asked for in the config (the device rate wins)
    requested_sample_rate: u32,
}

impl MicrophoneSource {
    pub fn new(device_name: String, requested_sample_rate: u32) -> Self {
        Self {
            device_name,
            requested_sample_rate,
        }
    }
}

impl AudioSource for MicrophoneSource {
    type Session = MicrophoneSession;

    fn open(&mut self) -> Result<MicrophoneSession> {
        let device = suppress_alsa_warnings(|| {
            let host = cpal::default_host();
            if self.device_name == "default" {
                host.default_input_device()
                    .ok_or_else(|| anyhow!("No audio input device available"))
            } else {
                find_device(&host, &self.device_name)
            }
        })?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Recording device: {}", device_name);

        let supported = device.default_input_config()?;
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels() as usize;

        if sample_rate != self.requested_sample_rate {
            tracing::warn!(
                "Requested sample rate {}Hz but device uses {}Hz. Recording at device rate.",
                self.requested_sample_rate,
                sample_rate
            );
        }

        let (sender, receiver) = mpsc::channel();
        let config: cpal::StreamConfig = supported.config();
        let on_error = |err: cpal::StreamError| tracing::error!("Audio stream error: {}", err);

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => {
                let sender = sender.clone();
                device.build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        let converted: Vec<i16> = data
                            .iter()
                            .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                            .collect();
                        send_fragment(&sender, &converted, channels);
                    },
                    on_error,
                    None,
                )?
            }
            _ => {
                let sender = sender.clone();
                device.build_input_stream(
                    &config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        send_fragment(&sender, data, channels);
                    },
                    on_error,
                    None,
                )?
            }
        };

        stream.play()?;
        tracing::debug!("Audio stream started: {}Hz, {} channels", sample_rate, channels);

        Ok(MicrophoneSession {
            stream: Some(stream),
            receiver,
            format: ClipFormat {
                sample_rate,
                channels: 1,
            },
        })
    }
}

/// A live cpal input stream and the fragments it has produced.
pub struct MicrophoneSession {
    /// Dropping the stream ends capture
    stream: Option<cpal::Stream>,
    receiver: Receiver<Vec<u8>>,
    format: ClipFormat,
}

impl CaptureSession for MicrophoneSession {
    fn take_fragments(&mut self) -> Vec<Vec<u8>> {
        self.receiver.try_iter().collect()
    }

    fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            stream.pause()?;
            tracing::debug!("Audio stream stopped");
        }
        Ok(())
    }

    fn format(&self) -> ClipFormat {
        self.format
    }
}

/// Down-mixes one callback buffer to mono and forwards it as a fragment.
fn send_fragment(sender: &Sender<Vec<u8>>, data: &[i16], channels: usize) {
    let mono = downmix(data, channels);
    if mono.is_empty() {
        return;
    }
    // The receiver is gone once the session has been dropped.
    let _ = sender.send(samples_to_bytes(&mono));
}

/// Averages interleaved channels into a single mono channel.
pub(crate) fn downmix(data: &[i16], channels: usize) -> Vec<i16> {
    match channels {
        0 | 1 => data.to_vec(),
        n => data
            .chunks_exact(n)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / n as i32) as i16
            })
            .collect(),
    }
}

/// Finds an input device by numeric index or exact name.
///
/// # Errors
/// - If no device with the given index or name exists
fn find_device(host: &cpal::Host, device_spec: &str) -> Result<cpal::Device> {
    let devices: Vec<cpal::Device> = host
        .input_devices()
        .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?
        .collect();

    if let Ok(index) = device_spec.parse::<usize>() {
        let count = devices.len();
        return devices.into_iter().nth(index).ok_or_else(|| {
            anyhow!(
                "Device index {} is out of range (0-{})",
                index,
                count.saturating_sub(1)
            )
        });
    }

    devices
        .into_iter()
        .find(|device| device.name().is_ok_and(|name| name == device_spec))
        .ok_or_else(|| {
            anyhow!(
                "Audio input device '{device_spec}' not found. Use 'emovox list-devices' to see available devices."
            )
        })
}

/// Runs `f` with stderr pointed at /dev/null so ALSA probing noise stays off the terminal.
#[cfg(target_os = "linux")]
pub fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let dev_null = OpenOptions::new()
        .write(true)
        .open("/dev/null")
        .map_err(|e| anyhow!("Failed to open /dev/null: {e}"))?;

    let saved_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if saved_stderr == -1 {
        return Err(anyhow!("Failed to duplicate stderr"));
    }

    if unsafe { libc::dup2(dev_null.as_raw_fd(), libc::STDERR_FILENO) } == -1 {
        unsafe { libc::close(saved_stderr) };
        return Err(anyhow!("Failed to redirect stderr"));
    }

    let result = f();

    unsafe {
        libc::dup2(saved_stderr, libc::STDERR_FILENO);
        libc::close(saved_stderr);
    }

    result
}

#[cfg(not(target_os = "linux"))]
pub fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_stereo() {
        assert_eq!(downmix(&[10, 20, -4, 4], 2), vec![15, 0]);
    }

    #[test]
    fn test_downmix_mono_passthrough() {
        assert_eq!(downmix(&[1, 2, 3], 1), vec![1, 2, 3]);
    }

    #[test]
    fn test_downmix_drops_partial_frame() {
        assert_eq!(downmix(&[3, 3, 3, 9, 9], 3), vec![3]);
    }

    #[test]
    fn test_send_fragment_encodes_le_bytes() {
        let (tx, rx) = mpsc::channel();
        send_fragment(&tx, &[1, -1], 1);
        send_fragment(&tx, &[], 1);
        let received: Vec<Vec<u8>> = rx.try_iter().collect();
        assert_eq!(received, vec![vec![1, 0, 0xff, 0xff]]);
    }
}
