#![doc = include_str!("../README.md")]
use anyhow::Result;
use figment::providers::{Format, Serialized, Toml};
use figment::Figment;

use ::lib::config::default_config_file;
use ::lib::{setup_tracing, Args, HidDevice, HidDevices};
use tracing::{debug, warn};

#[paw::main]
fn main(args: Args) -> Result<()> {
    setup_tracing(&args)?;
    let config_file = args.config_file.clone().or_else(default_config_file);
    // Merge config Default → Config File → command line args
    let mut figment = Figment::from(Serialized::defaults(Args::default()));
    if let Some(ref path) = config_file {
        figment = figment.merge(Toml::file(path));
    }
    let args: Args = figment.merge(Serialized::defaults(args)).extract()?;
    debug!("Merged config and parameters : {:#?}", args);
    let config = args.validate()?;

    let devices = HidDevices::new(config.tool)?;
    let listing = devices.enumerate_verbose()?;
    for line in &listing.errors {
        warn!("pnputil: {}", line);
    }
    println!("Connected HID-class devices: {}", listing.devices.len());

    // Toggle the requested device, reusing its enumerated record when we
    // have one so the printed outcome can name the device.
    let device = listing
        .devices
        .iter()
        .find(|d| d.instance_id == config.instance_id)
        .cloned()
        .unwrap_or_else(|| HidDevice::with_instance_id(&config.instance_id));
    let outcome = devices.set_active(&device, !config.disable)?;

    let action = if config.disable { "disable" } else { "enable" };
    if outcome.success {
        println!("{} of {} succeeded", action, device.instance_id);
    } else {
        println!("{} of {} failed", action, device.instance_id);
        if !outcome.message.is_empty() {
            println!("{}", outcome.message);
        }
    }
    Ok(())
}
