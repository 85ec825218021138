use crate::renderers::{CurationSummaryRenderer, SummaryCommand};
use crate::{print_stdout, CurationArgs};
use anyhow::{bail, Result};
use depwarden_curation::{render_json, render_table, CurationAudit, ProjectStatuses};
use depwarden_deptree::ProcessRunner;
use depwarden_protocol::{parse_threads, ExitCode, OutputFormat, Provenance, Settings};
use depwarden_summary::{CommandSummary, MarkdownConfig};
use std::sync::Arc;

pub async fn run(args: CurationArgs, settings: &Settings) -> Result<ExitCode> {
    if !matches!(args.format, OutputFormat::Table | OutputFormat::Json) {
        bail!(
            "Format '{}' is not supported by curation-audit (expected table|json)",
            args.format
        );
    }
    let server = args.server.details();
    let threads = parse_threads(args.threads.as_deref(), settings.threads);
    let params = super::tree_params(
        &server,
        args.repo.as_deref(),
        args.use_wrapper,
        args.exclude_test_deps,
    )?;
    let working_dirs = super::working_dirs(&args.working_dirs)?;

    let runner = ProcessRunner;
    let audit = CurationAudit::new(
        super::http_client(&server, settings)?,
        &runner,
        &server,
        args.repo.as_deref(),
    )?
    .with_threads(threads)
    .with_provenance(Provenance::from_env());
    let mut results = audit.run(&params, &working_dirs).await?;

    let rendered = match args.format {
        OutputFormat::Json => render_json(&results.projects)?,
        _ => render_table(&results.projects),
    };
    print_stdout(&rendered)?;

    let config = super::markdown_config(&server, settings).await?;
    if let Err(err) = record_summary(&results.projects, config) {
        log::warn!("Failed to record the curation summary: {err:#}");
    }

    match results.take_error() {
        Some(err) => {
            log::error!("{err}");
            Ok(ExitCode::Error)
        }
        None => Ok(ExitCode::Success),
    }
}

fn record_summary(projects: &ProjectStatuses, config: MarkdownConfig) -> Result<()> {
    let command = SummaryCommand::CurationAudit;
    let Some(summary) =
        CommandSummary::from_env(command.as_str(), Arc::new(CurationSummaryRenderer), config)?
    else {
        return Ok(());
    };
    summary.record(projects)?;
    summary.generate_markdown()?;
    Ok(())
}
