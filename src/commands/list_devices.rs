//! List available audio input devices.

use anyhow::anyhow;
use cpal::traits::{DeviceTrait, HostTrait};

use crate::capture::suppress_alsa_warnings;

/// Lists every audio input device with its index and default format.
///
/// The index or name can be used as `audio.device` in the configuration.
///
/// # Errors
/// - If the audio host cannot enumerate devices
pub fn handle_list_devices() -> Result<(), anyhow::Error> {
    let (host, devices) = suppress_alsa_warnings(|| {
        let host = cpal::default_host();
        let devices: Vec<cpal::Device> = host
            .input_devices()
            .map_err(|e| anyhow!("Failed to enumerate audio devices: {e}"))?
            .filter(|device| device.name().is_ok())
            .collect();
        Ok((host, devices))
    })?;

    if devices.is_empty() {
        println!("No audio input devices found on this system.");
        return Ok(());
    }

    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    println!();
    println!("Available audio input devices:");
    println!();

    for (index, device) in devices.iter().enumerate() {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let marker = if default_name.as_deref() == Some(name.as_str()) {
            " [DEFAULT]"
        } else {
            ""
        };
        let format = match device.default_input_config() {
            Ok(config) => format!(" ({}Hz, {} channels)", config.sample_rate().0, config.channels()),
            Err(_) => " (configuration unavailable)".to_string(),
        };

        println!("  ID: {index}");
        println!("    Name: {name}{marker}");
        println!("    Config:{format}");
        println!();
    }

    Ok(())
}
