use crate::core::{config::Config, fetch::HttpFetcher, pipeline::ExtractionPipeline};
use crate::error::Result;
use crate::presenter::{present_all, ConsolePresenter, JsonPresenter, RunOutcome};
use crate::utils::fs::is_empty_dir;
use dialoguer::Input;
use std::io::IsTerminal;
use std::path::Path;
use tracing::debug;

pub fn extract_archive(
    url: Option<&str>,
    destination: Option<&Path>,
    json: bool,
) -> Result<RunOutcome> {
    let config = Config::load()?;
    let destination = destination
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.destination.clone());

    let url = match url {
        Some(url) => url.trim().to_string(),
        None => prompt_for_url()?,
    };

    let pipeline = ExtractionPipeline::new(HttpFetcher::from_config(&config), destination);
    if !is_empty_dir(pipeline.destination()) {
        debug!(
            "Destination {} already has content",
            pipeline.destination().display()
        );
    }

    if json {
        let mut presenter = JsonPresenter::new(std::io::stdout().lock());
        return present_all(pipeline.run(&url), &mut presenter);
    }

    if !url.is_empty() {
        println!("Input URL: {url}");
    }
    let outcome = present_all(pipeline.run(&url), &mut ConsolePresenter)?;
    if outcome.is_success() {
        println!("Files extracted to {}", pipeline.destination().display());
    }

    Ok(outcome)
}

/// Asks for a URL on an interactive terminal. Piped input yields an empty
/// URL so the run reports it as missing.
fn prompt_for_url() -> Result<String> {
    if !std::io::stdin().is_terminal() {
        return Ok(String::new());
    }

    let url: String = Input::new()
        .with_prompt("Please provide a URL")
        .allow_empty(true)
        .interact_text()?;
    Ok(url.trim().to_string())
}
