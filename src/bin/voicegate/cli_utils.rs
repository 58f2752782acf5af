use anyhow::Result;
use voicegate::audio::{DeviceInfo, MicrophoneInput};

/// `VOICEGATE_TEST_DEVICES` takes a comma-separated list of names in place
/// of real hardware.
fn discover_devices() -> Vec<DeviceInfo> {
    if let Ok(raw) = std::env::var("VOICEGATE_TEST_DEVICES") {
        return parse_test_devices(&raw);
    }
    MicrophoneInput::list_devices().unwrap_or_else(|err| {
        eprintln!("Failed to list audio input devices: {err}");
        Vec::new()
    })
}

fn parse_test_devices(raw: &str) -> Vec<DeviceInfo> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .enumerate()
        .map(|(idx, name)| DeviceInfo {
            name: name.to_string(),
            channels: 1,
            native_sample_rate: 48_000,
            is_default: idx == 0,
        })
        .collect()
}

pub(crate) fn format_device(device: &DeviceInfo) -> String {
    let marker = if device.is_default { " (default)" } else { "" };
    format!(
        "  - {}{marker}: {} ch @ {} Hz",
        device.name, device.channels, device.native_sample_rate
    )
}

pub(crate) fn list_input_devices(json: bool) -> Result<()> {
    let devices = discover_devices();
    if json {
        println!("{}", serde_json::to_string(&devices)?);
    } else if devices.is_empty() {
        println!("No audio input devices detected.");
    } else {
        println!("Available audio input devices:");
        for device in &devices {
            println!("{}", format_device(device));
        }
    }
    Ok(())
}
