use anyhow::Context;
use bupsync::{
    resolve, run_backup, BackupPlan, ConfigSource, Credentials, ExecutionStage, SftpService,
    TerminalPrompt, DEFAULT_CONFIG_FILE,
};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "bupsync")]
#[command(about = "Mirror a remote tree over SFTP and pack it into a dated archive", long_about = None)]
#[command(version)]
struct Args {
    /// Config section to use; prompts for connection details when omitted
    #[arg(short, long)]
    section: Option<String>,

    /// Config file holding the sections
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// SSH port, unless the config section sets one
    #[arg(short, long, default_value_t = 22)]
    port: u16,

    /// Stages to run
    #[arg(long, value_enum, default_value_t = Stage::All)]
    stage: Stage,

    /// Directory receiving the mirror and the archive (defaults to the current directory)
    #[arg(short, long)]
    workdir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    /// Mirror, then archive
    All,
    /// Only mirror the remote tree
    Mirror,
    /// Only archive an existing mirror
    Archive,
}

impl From<Stage> for ExecutionStage {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::All => ExecutionStage::All,
            Stage::Mirror => ExecutionStage::MirrorOnly,
            Stage::Archive => ExecutionStage::ArchiveOnly,
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let source = match args.section {
        Some(name) => ConfigSource::Section {
            path: args.config,
            name,
        },
        None => ConfigSource::Interactive,
    };
    let stage = ExecutionStage::from(args.stage);
    // Archiving a local mirror needs the label and remote root, not a login.
    let credentials = match stage {
        ExecutionStage::ArchiveOnly => Credentials::Skip,
        _ => Credentials::Prompt,
    };
    let config = resolve(&source, args.port, credentials, &mut TerminalPrompt)
        .context("failed to resolve connection settings")?;

    let workdir = match args.workdir {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to read current directory")?,
    };
    let plan = BackupPlan::new(&config, &workdir);
    info!("Remote tree: {}:{}", config.connection.host, plan.remote_root);
    info!("Local mirror: {:?}", plan.local_root);

    let service = SftpService::new(config.connection);
    let show_progress = atty::is(atty::Stream::Stderr);
    let summary = run_backup(&service, &plan, stage, show_progress)?;

    if let Some(path) = summary.archive_path {
        println!("\narchive saved: {}\n", path.display());
    }
    info!(
        "Finished in {}",
        humantime::format_duration(std::time::Duration::from_secs(summary.elapsed.as_secs()))
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("bupsync={}", log_level))
        .with_writer(std::io::stderr)
        .init();

    info!("🚀 bupsync - SFTP tree mirror and archiver");

    // The whole pipeline is blocking I/O on a single session.
    match tokio::task::spawn_blocking(move || run(args)).await {
        Ok(Ok(())) => {
            info!("✅ Backup completed successfully!");
        }
        Ok(Err(e)) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("❌ Error: task join error: {}", e);
            std::process::exit(1);
        }
    }
}
