use crate::renderers::{AuditDigest, AuditSummaryRenderer, SummaryCommand};
use crate::{print_stdout, AuditArgs};
use anyhow::{Context, Result};
use depwarden_deptree::{
    build_dependency_tree, detect_in_dir, CommandRunner, DepTreeParams, ProcessRunner,
};
use depwarden_graph::flatten_unique;
use depwarden_protocol::{
    serialize_json, serialize_json_pretty, ExitCode, OutputFormat, Provenance, Settings,
};
use depwarden_scan::{
    attach_impact_paths, descriptor_file, render_tables, to_sarif, AuditResults, ScanFilter,
    ScanGraphClient, ScanGraphParams, SimpleJsonResults, TechnologyScan,
};
use depwarden_summary::{CommandSummary, MarkdownConfig, SummaryIndex};
use std::path::Path;
use std::sync::Arc;

pub async fn run(args: AuditArgs, settings: &Settings) -> Result<ExitCode> {
    let server = args.server.details();
    let xray_url = server.xray_url().context(
        "No scan service configured: set DEPWARDEN_URL (or --url) or DEPWARDEN_XRAY_URL",
    )?;
    let params = super::tree_params(
        &server,
        args.repo.as_deref(),
        args.use_wrapper,
        args.exclude_test_deps,
    )?;
    let client = ScanGraphClient::new(super::http_client(&server, settings)?, &xray_url)
        .with_polling(settings.scan_poll_interval(), settings.scan_max_polls);
    let filter = ScanFilter {
        min_severity: args.min_severity,
        fixable_only: args.fixable_only,
    };
    let provenance = Provenance::from_env();

    let runner = ProcessRunner;
    let mut results = AuditResults::default();
    for dir in super::working_dirs(&args.working_dirs)? {
        audit_dir(&dir, &params, &runner, &client, &filter, &provenance, &mut results).await?;
    }

    let rendered = match args.format {
        OutputFormat::Table => render_tables(&SimpleJsonResults::from(&results)),
        OutputFormat::Json => serialize_json_pretty(&results)?,
        OutputFormat::SimpleJson => serialize_json_pretty(&SimpleJsonResults::from(&results))?,
        OutputFormat::Sarif => serialize_json_pretty(&to_sarif(&results))?,
    };
    print_stdout(&rendered)?;

    let config = super::markdown_config(&server, settings).await?;
    if let Err(err) = record_summary(&results, &provenance, config) {
        log::warn!("Failed to record the audit summary: {err:#}");
    }

    if args.fail && results.has_issues() {
        log::error!(
            "Found {} issues, highest severity {}",
            results.issue_count(),
            results
                .highest_severity()
                .map(|severity| severity.to_string())
                .unwrap_or_default()
        );
        return Ok(ExitCode::VulnerableBuild);
    }
    if !results.errors.is_empty() {
        return Ok(ExitCode::Error);
    }
    Ok(ExitCode::Success)
}

/// Scans every supported technology of one directory. Failures are kept in
/// `results` and do not stop the remaining technologies.
async fn audit_dir(
    dir: &Path,
    params: &DepTreeParams,
    runner: &dyn CommandRunner,
    client: &ScanGraphClient,
    filter: &ScanFilter,
    provenance: &Provenance,
    results: &mut AuditResults,
) -> Result<()> {
    let technologies =
        detect_in_dir(dir).with_context(|| format!("Failed to inspect {}", dir.display()))?;
    if technologies.is_empty() {
        log::warn!("No supported technology detected in {}", dir.display());
    }
    let params = params.with_working_dir(dir);
    for tech in technologies {
        if !tech.has_resolver() {
            log::warn!(
                "{} is not supported by audit, skipping {}",
                tech.formal_name(),
                dir.display()
            );
            continue;
        }
        let descriptor = dir.join(descriptor_file(tech, dir));
        let trees = match build_dependency_tree(tech, &params, runner).await {
            Ok(trees) => trees,
            Err(err) => {
                log::warn!("{err}");
                results.fail(&descriptor, err.to_string());
                continue;
            }
        };
        if let Some(resolver_error) = &trees.resolver_error {
            log::warn!("{resolver_error}");
        }
        let scan_params = ScanGraphParams {
            graph: flatten_unique(&trees.unique),
            project: provenance.project.clone(),
            watches: Vec::new(),
        };
        match client.scan(&scan_params).await {
            Ok(response) => {
                let mut response = filter.apply(response);
                attach_impact_paths(&mut response, &trees.trees);
                results.push(TechnologyScan {
                    technology: tech,
                    working_dir: dir.to_path_buf(),
                    response,
                });
            }
            Err(err) => {
                log::warn!("{err}");
                results.fail(&descriptor, err.to_string());
            }
        }
    }
    Ok(())
}

/// SARIF under `sarif-reports`, the simple-json view under `build-scans`
/// when a build is known, and a digest for the Markdown.
fn record_summary(
    results: &AuditResults,
    provenance: &Provenance,
    config: MarkdownConfig,
) -> Result<()> {
    let command = SummaryCommand::Audit;
    let Some(summary) =
        CommandSummary::from_env(command.as_str(), Arc::new(AuditSummaryRenderer), config)?
    else {
        return Ok(());
    };
    let sarif = serialize_json(&to_sarif(results))?;
    summary.record_bytes(sarif.as_bytes(), Some(SummaryIndex::SarifReports), &[])?;
    if let Some((name, number)) = provenance.build() {
        summary.record_with_index(
            &SimpleJsonResults::from(results),
            SummaryIndex::BuildScans,
            &[name.to_string(), number.to_string()],
        )?;
    }
    summary.record(&AuditDigest::from(results))?;
    summary.generate_markdown()?;
    Ok(())
}
