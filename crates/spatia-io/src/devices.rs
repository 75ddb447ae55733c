//! Output device enumeration via cpal.

use cpal::Device;
use cpal::traits::{DeviceTrait, HostTrait};

use crate::Result;
use spatia_core::DEFAULT_SAMPLE_RATE_HZ;

/// Extract device name via `description()` (cpal 0.17+).
pub(crate) fn device_name(device: &Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// Output device information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    /// Human-readable device name.
    pub name: String,
    /// Default output sample rate in Hz.
    pub default_sample_rate: u32,
    /// Whether this is the host's default output.
    pub is_default: bool,
}

fn default_rate(device: &Device) -> u32 {
    device
        .default_output_config()
        .map(|c| c.sample_rate())
        .unwrap_or(DEFAULT_SAMPLE_RATE_HZ)
}

/// List output devices of the default host.
pub fn list_devices() -> Result<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let default_name = host
        .default_output_device()
        .and_then(|d| device_name(&d).ok());

    let mut devices = Vec::new();
    if let Ok(outputs) = host.output_devices() {
        for device in outputs {
            let Ok(name) = device_name(&device) else {
                continue;
            };
            if devices.iter().any(|d: &AudioDevice| d.name == name) {
                continue;
            }
            devices.push(AudioDevice {
                is_default: default_name.as_deref() == Some(name.as_str()),
                default_sample_rate: default_rate(&device),
                name,
            });
        }
    }
    Ok(devices)
}

/// Default output device of the default host.
pub fn default_output_device() -> Result<Option<AudioDevice>> {
    let host = cpal::default_host();
    Ok(host.default_output_device().and_then(|d| {
        device_name(&d).ok().map(|name| AudioDevice {
            name,
            default_sample_rate: default_rate(&d),
            is_default: true,
        })
    }))
}
