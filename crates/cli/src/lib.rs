//! # Depwarden CLI
//!
//! ```text
//! depwarden <command>
//!     │
//!     ├── detect            filesystem signatures → technologies
//!     ├── curation-audit    trees → HEAD/GET probes → blocked packages
//!     ├── audit             trees → scan graph → table | json | simple-json | sarif
//!     └── summary           record | upload | generate | list
//! ```
//!
//! Stdout carries command output only; logs go to stderr.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use depwarden_protocol::{ExitCode, OutputFormat, ServerDetails};
use std::io;
use std::path::PathBuf;

mod command;
mod renderers;

pub use renderers::{
    renderer_for, AuditDigest, AuditSummaryRenderer, CurationSummaryRenderer, SummaryCommand,
    TargetDigest,
};

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| {
            if text.ends_with('\n') {
                Ok(())
            } else {
                stdout.write_all(b"\n")
            }
        })
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "depwarden")]
#[command(about = "Dependency curation and vulnerability audits", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Settings file (defaults to ./depwarden.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

/// Platform address and login; each flag overrides its env variable.
#[derive(Args, Debug, Clone, Default)]
struct ServerArgs {
    /// Platform url (DEPWARDEN_URL)
    #[arg(long)]
    url: Option<String>,

    /// User name (DEPWARDEN_USER)
    #[arg(long)]
    user: Option<String>,

    /// Password (DEPWARDEN_PASSWORD)
    #[arg(long)]
    password: Option<String>,

    /// Access token (DEPWARDEN_ACCESS_TOKEN)
    #[arg(long)]
    access_token: Option<String>,
}

impl ServerArgs {
    fn details(&self) -> ServerDetails {
        ServerDetails::from_env().merged(ServerDetails {
            url: self.url.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            access_token: self.access_token.clone(),
            ..ServerDetails::default()
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the technologies detected in the working directories
    Detect(DetectArgs),

    /// Report packages the curation service would block
    CurationAudit(CurationArgs),

    /// Scan dependency trees for vulnerabilities and violations
    Audit(AuditArgs),

    /// Manage the command summary store
    Summary {
        #[command(subcommand)]
        action: SummaryAction,
    },
}

#[derive(Args)]
struct DetectArgs {
    /// Directories to inspect (comma separated, default: current dir)
    #[arg(long, value_delimiter = ',')]
    working_dirs: Vec<PathBuf>,

    /// Walk subdirectories too
    #[arg(long)]
    recursive: bool,
}

#[derive(Args)]
struct CurationArgs {
    /// Output format: table or json
    #[arg(long, default_value = "table")]
    format: OutputFormat,

    /// Parallel probes (default from settings)
    #[arg(long)]
    threads: Option<String>,

    /// Project directories (comma separated, default: current dir)
    #[arg(long, value_delimiter = ',')]
    working_dirs: Vec<PathBuf>,

    /// Remote repository packages are resolved through
    #[arg(long)]
    repo: Option<String>,

    /// Leave test-scoped dependencies out of the trees
    #[arg(long)]
    exclude_test_deps: bool,

    /// Use the project's build wrapper (mvnw, gradlew)
    #[arg(long)]
    use_wrapper: bool,

    #[command(flatten)]
    server: ServerArgs,
}

#[derive(Args)]
struct AuditArgs {
    /// Output format: table, json, simple-json or sarif
    #[arg(long, default_value = "table")]
    format: OutputFormat,

    /// Project directories (comma separated, default: current dir)
    #[arg(long, value_delimiter = ',')]
    working_dirs: Vec<PathBuf>,

    /// Repository to resolve dependencies through
    #[arg(long)]
    repo: Option<String>,

    /// Drop issues below this severity (low, medium, high, critical)
    #[arg(long)]
    min_severity: Option<depwarden_scan::Severity>,

    /// Keep only issues with a fixed version
    #[arg(long)]
    fixable_only: bool,

    /// Exit with code 3 when any issue is found
    #[arg(long)]
    fail: bool,

    /// Leave test-scoped dependencies out of the trees
    #[arg(long)]
    exclude_test_deps: bool,

    /// Use the project's build wrapper (mvnw, gradlew)
    #[arg(long)]
    use_wrapper: bool,

    #[command(flatten)]
    server: ServerArgs,
}

#[derive(Subcommand)]
enum SummaryAction {
    /// Record one data blob for a command
    Record {
        #[arg(long, value_enum)]
        command: SummaryCommand,

        /// Index subdirectory (build-scans, docker-scans, binaries-scans, sarif-reports)
        #[arg(long)]
        index: Option<String>,

        /// Arguments that name an indexed blob (repeatable)
        #[arg(long = "arg")]
        args: Vec<String>,

        /// Inline JSON payload
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        data: Option<String>,

        /// Payload file
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Record upload results and regenerate the upload summary
    Upload {
        #[arg(long)]
        file: PathBuf,

        #[command(flatten)]
        server: ServerArgs,
    },

    /// Regenerate the Markdown of a command
    Generate {
        #[arg(long, value_enum)]
        command: SummaryCommand,

        #[command(flatten)]
        server: ServerArgs,
    },

    /// Print the indexed blobs of a command as JSON
    List {
        #[arg(long, value_enum)]
        command: SummaryCommand,
    },
}

fn init_logging(cli: &Cli) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

pub async fn main_entry() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli);

    match cli.command {
        Commands::Detect(args) => command::detect::run(args),
        Commands::CurationAudit(args) => {
            let settings = command::load_settings(cli.config.as_deref())?;
            command::curation::run(args, &settings).await
        }
        Commands::Audit(args) => {
            let settings = command::load_settings(cli.config.as_deref())?;
            command::audit::run(args, &settings).await
        }
        Commands::Summary { action } => {
            let settings = command::load_settings(cli.config.as_deref())?;
            command::summary::run(action, &settings).await
        }
    }
}
