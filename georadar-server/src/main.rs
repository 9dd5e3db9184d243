use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use georadar_core::Renderer;
use georadar_server::output::{CommandRenderer, JsonLinesSink, LogRenderer, LogSink};
use georadar_server::{run, ServerConfig};
use miette::IntoDiagnostic;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Render commands go to the log
    Log,
    /// Render commands are written to stdout as JSON lines
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "georadar-server",
    author,
    version,
    about = "Run a radar sweep over geographic markers without a map",
    long_about = "Draws range rings, rotates a sweep line and/or sector polygon around a \
                  center and reports every marker the sweep passes over.\n\n\
                  Without --config a default line sweep with range rings is run; the \
                  center must then be given with --lat and --lng."
)]
struct Cli {
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Center latitude in degrees, overrides the config file
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Center longitude in degrees, overrides the config file
    #[arg(long, allow_hyphen_values = true)]
    lng: Option<f64>,

    /// Stop after this many seconds (default: run until all sweeps finish or Ctrl-C)
    #[arg(short, long, value_parser = parse_seconds)]
    duration: Option<Duration>,

    /// Where render commands go
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Log)]
    output: OutputFormat,
}

fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|e| format!("{}", e))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("{}", e))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .format_timestamp_millis()
        .init();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path).into_diagnostic()?,
        None => ServerConfig::standard(),
    };
    config.override_center(cli.lat, cli.lng);

    let renderer: Box<dyn Renderer> = match cli.output {
        OutputFormat::Log => Box::new(LogRenderer::new(LogSink)),
        OutputFormat::Json => Box::new(CommandRenderer::new(JsonLinesSink::new(std::io::stdout()))),
    };

    let summary = run(config, renderer, cli.duration).await.into_diagnostic()?;

    match cli.output {
        OutputFormat::Json => {
            let json = serde_json::to_string(&summary).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Log => {
            log::info!(
                "{}: {} detections, {} markers tracked",
                summary.status.id,
                summary.detections,
                summary.status.markers.len()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "georadar-server",
            "--lat",
            "-33.9",
            "--lng",
            "151.2",
            "-d",
            "1.5",
            "-o",
            "json",
        ]);
        assert_eq!(cli.lat, Some(-33.9));
        assert_eq!(cli.lng, Some(151.2));
        assert_eq!(cli.duration, Some(Duration::from_millis(1500)));
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_negative_duration_is_rejected() {
        assert!(parse_seconds("-1").is_err());
        assert!(parse_seconds("soon").is_err());
    }
}
