//! The `pedalera devices` subcommand.

use pedalera_io::{default_device_names, list_devices};

pub fn run() -> anyhow::Result<()> {
    let devices = list_devices()?;
    let (default_input, default_output) = default_device_names();

    if devices.is_empty() {
        println!("No audio devices found.");
        return Ok(());
    }

    println!("Audio devices:");
    for device in &devices {
        let mut caps = Vec::new();
        if device.is_input {
            caps.push("in");
        }
        if device.is_output {
            caps.push("out");
        }

        let mut marks = String::new();
        if default_input.as_deref() == Some(device.name.as_str()) {
            marks.push_str(" [default in]");
        }
        if default_output.as_deref() == Some(device.name.as_str()) {
            marks.push_str(" [default out]");
        }

        println!(
            "  {:40} {:6} {} Hz{}",
            device.name,
            caps.join("+"),
            device.default_sample_rate,
            marks
        );
    }

    Ok(())
}
