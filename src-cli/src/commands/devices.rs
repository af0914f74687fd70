//! Input device listing

pub fn run() -> anyhow::Result<()> {
    let devices = speaktrainer_audio::list_input_devices()?;
    if devices.is_empty() {
        println!("No input devices found");
        return Ok(());
    }

    for device in devices {
        let marker = if device.is_default { "*" } else { " " };
        println!(
            "{} {}  ({} ch @ {} Hz)",
            marker, device.name, device.channels, device.sample_rate
        );
    }

    Ok(())
}
