//! Subcommand handlers.

use anyhow::Context;
use custseg_core::AppConfig;
use custseg_core::pipeline::{CustomerData, PredictionPipeline, TrainPipeline};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP API (/train, /, /health)
    Serve {
        /// Override server.host
        #[arg(long)]
        host: Option<String>,
        /// Override server.port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run ingestion, validation, training and push once
    Train,
    /// Predict clusters for customer records read as JSON (object or array)
    Predict {
        /// Input file; reads stdin when omitted or `-`
        input: Option<PathBuf>,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the resolved configuration as TOML
    Show,
}

pub async fn handle_command(command: Commands, mut config: AppConfig) -> anyhow::Result<()> {
    match command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            info!(host = %config.server.host, port = config.server.port, "Starting gateway");
            custseg_core::gateway::run(config)
                .await
                .context("gateway server failed")
        }
        Commands::Train => {
            let artifact = tokio::task::spawn_blocking(move || TrainPipeline::new(config).run_pipeline())
                .await
                .context("training task panicked")??;
            info!(model = %artifact.model_path.display(), "Training command finished");
            println!("Training successful! Model saved to {}", artifact.model_path.display());
            Ok(())
        }
        Commands::Predict { input } => {
            let text = read_input(input.as_deref())?;
            let records = parse_records(&text)?;
            info!(records = records.len(), "Predicting clusters");
            let pipeline = PredictionPipeline::new(&config);
            let labels = tokio::task::spawn_blocking(move || pipeline.run_pipeline(&records))
                .await
                .context("prediction task panicked")??;
            let out = render_predictions(&labels);
            info!(predictions = labels.len(), "Prediction command finished");
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
        Commands::Config {
            action: ConfigAction::Show,
        } => {
            if config.ingestion.connection_url.is_some() {
                config.ingestion.connection_url = Some("<redacted>".to_string());
            }
            let rendered = toml::to_string_pretty(&config).context("rendering configuration")?;
            println!("{rendered}");
            Ok(())
        }
    }
}

fn read_input(input: Option<&Path>) -> anyhow::Result<String> {
    match input {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display())),
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("reading stdin")?;
            Ok(text)
        }
    }
}

/// One `{"predicted_cluster": n}` object per input record.
fn render_predictions(labels: &[usize]) -> serde_json::Value {
    labels
        .iter()
        .map(|c| serde_json::json!({ "predicted_cluster": c }))
        .collect()
}

/// Accept a single record or an array of records.
fn parse_records(text: &str) -> anyhow::Result<Vec<CustomerData>> {
    let value: serde_json::Value = serde_json::from_str(text).context("input is not valid JSON")?;
    let records = if value.is_array() {
        serde_json::from_value(value)
    } else {
        serde_json::from_value(value).map(|one| vec![one])
    };
    records.context("input does not match the customer record fields")
}
