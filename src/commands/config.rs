use crate::core::config::{get_config_path, Config};
use crate::error::Result;
use std::path::PathBuf;

pub fn show_config() -> Result<()> {
    let config = Config::load()?;

    println!("Config file: {}", get_config_path()?.display());
    println!("  destination:  {}", config.destination.display());
    println!("  user_agent:   {}", config.user_agent);
    match config.timeout_secs {
        Some(secs) => println!("  timeout_secs: {secs}"),
        None => println!("  timeout_secs: (transport default)"),
    }

    Ok(())
}

pub fn set_destination(destination: PathBuf) -> Result<()> {
    let mut config = Config::load()?;
    config.set_destination(destination)?;

    println!(
        "Archives will be extracted to {}",
        config.destination.display()
    );
    Ok(())
}
