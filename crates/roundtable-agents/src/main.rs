use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use coordination::{EventFilter, PlatformSettings, RoundtableInput};
use roundtable_agents::{Roundtable, RoundtableConfig, RunHandle};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// Run a creative roundtable and stream its progress as JSON lines.
#[derive(Parser, Debug)]
#[command(name = "roundtable", version)]
struct Cli {
    /// Creative brief, e.g. "A cinematic shot of a sunset over the ocean"
    #[arg(long)]
    brief: String,

    /// Target platform, e.g. "TikTok"
    #[arg(long)]
    platform: String,

    /// File with the visual template text
    #[arg(long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// File with character descriptions
    #[arg(long, value_name = "FILE")]
    characters: Option<PathBuf>,

    /// File with the screenplay
    #[arg(long, value_name = "FILE")]
    screenplay: Option<PathBuf>,

    /// File with setting/location notes
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// JSON file with platform style hints (camera, lighting, palette, tone)
    #[arg(long, value_name = "FILE")]
    platform_settings: Option<PathBuf>,

    /// Voice profile as NAME=DESCRIPTION; repeatable
    #[arg(long = "voice", value_name = "NAME=DESC", value_parser = parse_voice)]
    voices: Vec<(String, String)>,

    /// TOML config file (endpoint, retry, per-stage sampling)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn parse_voice(raw: &str) -> Result<(String, String), String> {
    let (name, desc) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=DESC, got '{raw}'"))?;
    if name.trim().is_empty() {
        return Err(format!("empty voice name in '{raw}'"));
    }
    Ok((name.trim().to_string(), desc.trim().to_string()))
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

impl Cli {
    fn to_input(&self) -> Result<RoundtableInput> {
        let mut input = RoundtableInput::new(&self.brief, &self.platform);
        if let Some(ref path) = self.template {
            input = input.with_visual_template(read_text(path)?);
        }
        if let Some(ref path) = self.characters {
            input = input.with_characters(read_text(path)?);
        }
        if let Some(ref path) = self.screenplay {
            input = input.with_screenplay(read_text(path)?);
        }
        if let Some(ref path) = self.settings {
            input = input.with_settings(read_text(path)?);
        }
        if let Some(ref path) = self.platform_settings {
            let settings: PlatformSettings = serde_json::from_str(&read_text(path)?)
                .with_context(|| format!("Invalid platform settings in {}", path.display()))?;
            input = input.with_platform_settings(settings);
        }
        for (name, desc) in &self.voices {
            input = input.with_voice(name, desc);
        }
        Ok(input)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match cli.config {
        Some(ref path) => RoundtableConfig::load(path)?,
        None => RoundtableConfig::default(),
    };
    info!(
        url = %config.endpoint.url,
        model = %config.endpoint.model,
        max_retries = config.retry.max_retries,
        "Roundtable starting"
    );

    let input = cli.to_input()?;
    let roundtable =
        Arc::new(Roundtable::from_config(&config).context("Failed to build completion client")?);

    // The logger joins before the run publishes anything; the printer
    // reads the run's lossless sink.
    let bus = roundtable.event_bus();
    let mut log_rx = bus.subscribe_filtered(EventFilter::new().without_chunks());

    let RunHandle {
        mut events,
        cancel,
        task,
        ..
    } = roundtable.spawn_on(input, bus);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling run");
            cancel.cancel();
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(envelope) = events.recv().await {
            match envelope.to_json() {
                Ok(json) => println!("{json}"),
                Err(e) => warn!(error = %e, "Failed to serialize event"),
            }
        }
    });

    let logger = tokio::spawn(async move {
        loop {
            match log_rx.recv().await {
                Ok(envelope) => debug!(
                    sequence = envelope.sequence,
                    event_type = envelope.event_type(),
                    agent = ?envelope.event.agent(),
                    "Event"
                ),
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "Event logger lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let outcome = task.await.context("Roundtable task panicked")?;
    let _ = printer.await;
    let _ = logger.await;

    let result = outcome.context("Roundtable run failed")?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_voice() {
        assert_eq!(
            parse_voice("Mara = low, unhurried").unwrap(),
            ("Mara".to_string(), "low, unhurried".to_string())
        );
        assert_eq!(
            parse_voice("Kai=bright=quick").unwrap(),
            ("Kai".to_string(), "bright=quick".to_string())
        );
        assert!(parse_voice("no separator").is_err());
        assert!(parse_voice("=desc").is_err());
    }

    #[test]
    fn test_cli_builds_input() {
        let cli = Cli::parse_from([
            "roundtable",
            "--brief",
            "A cinematic shot of a sunset over the ocean",
            "--platform",
            "TikTok",
            "--voice",
            "Mara=low",
            "--voice",
            "Kai=bright",
        ]);
        let input = cli.to_input().unwrap();
        assert_eq!(input.platform, "TikTok");
        assert_eq!(input.voice_profiles.len(), 2);
        assert!(input.screenplay.is_none());
    }
}
