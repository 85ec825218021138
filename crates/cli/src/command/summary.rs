use crate::renderers::{renderer_for, SummaryCommand};
use crate::{print_stdout, ServerArgs, SummaryAction};
use anyhow::{Context, Result};
use depwarden_protocol::{serialize_json_pretty, summary_output_dir, ExitCode, Settings};
use depwarden_summary::{CommandSummary, MarkdownConfig, SummaryIndex, UploadResults};
use std::path::{Path, PathBuf};

fn store(command: SummaryCommand, config: MarkdownConfig) -> Result<CommandSummary> {
    let output_dir = summary_output_dir();
    if output_dir.is_none() {
        log::info!("Summary output dir is not set, nothing is recorded");
    }
    Ok(CommandSummary::new(
        output_dir.as_deref(),
        command.as_str(),
        renderer_for(command),
        config,
    )?)
}

async fn config(server: &ServerArgs, settings: &Settings) -> Result<MarkdownConfig> {
    super::markdown_config(&server.details(), settings).await
}

fn read_payload(data: Option<String>, file: Option<PathBuf>) -> Result<Vec<u8>> {
    let bytes = match (data, file) {
        (Some(data), _) => data.into_bytes(),
        (None, Some(file)) => std::fs::read(&file)
            .with_context(|| format!("Failed to read {}", file.display()))?,
        (None, None) => anyhow::bail!("Either --data or --file is required"),
    };
    serde_json::from_slice::<serde_json::Value>(&bytes).context("Payload is not valid JSON")?;
    Ok(bytes)
}

fn print_path(path: Option<PathBuf>) -> Result<()> {
    if let Some(path) = path {
        print_stdout(&path.display().to_string())?;
    }
    Ok(())
}

pub async fn run(action: SummaryAction, settings: &Settings) -> Result<ExitCode> {
    match action {
        SummaryAction::Record {
            command,
            index,
            args,
            data,
            file,
        } => {
            let index = index.as_deref().map(SummaryIndex::parse).transpose()?;
            let payload = read_payload(data, file)?;
            let summary = store(command, MarkdownConfig::basic())?;
            print_path(summary.record_bytes(&payload, index, &args)?)?;
        }
        SummaryAction::Upload { file, server } => {
            let results = read_upload_results(&file)?;
            let summary = store(SummaryCommand::Upload, config(&server, settings).await?)?;
            summary.record(&results)?;
            print_path(summary.generate_markdown()?)?;
        }
        SummaryAction::Generate { command, server } => {
            let summary = store(command, config(&server, settings).await?)?;
            match summary.generate_markdown()? {
                Some(path) => print_path(Some(path))?,
                None => log::info!("No {} data recorded", command.as_str()),
            }
        }
        SummaryAction::List { command } => {
            let summary = store(command, MarkdownConfig::basic())?;
            print_stdout(&serialize_json_pretty(&summary.list_indexed()?)?)?;
        }
    }
    Ok(ExitCode::Success)
}

fn read_upload_results(path: &Path) -> Result<UploadResults> {
    let raw =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_slice(&raw)
        .with_context(|| format!("{} is not an upload results file", path.display()))
}
