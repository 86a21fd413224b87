use crate::core::{
    config::Config,
    fetch::{Fetch, HttpFetcher},
};
use crate::error::Result;
use crate::utils::fs;
use std::path::Path;

/// Saves the raw bytes behind `url` to `output` without extracting them.
pub fn download_file(url: &str, output: &Path) -> Result<()> {
    let config = Config::load()?;
    let fetcher = HttpFetcher::from_config(&config);

    println!("Downloading from {url}...");
    let buffer = fetcher.fetch(url)?;
    fs::write_file(output, buffer.as_slice())?;

    println!("Saved {} bytes to {}", buffer.len(), output.display());
    Ok(())
}
