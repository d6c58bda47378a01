//! Main orchestration logic: probe, count, mirror, archive.

use crate::archive::archive;
use crate::config::ResolvedConfig;
use crate::count::count_eligible;
use crate::error::MirrorError;
use crate::mirror::mirror;
use crate::remote::RemoteService;
use crate::types::{local_root_for, ExecutionStage, MirrorProgress, SyncContext, LOCAL_NAMESPACE};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Where a run reads from and writes to.
#[derive(Debug, Clone)]
pub struct BackupPlan {
    /// Archive name prefix.
    pub label: String,
    pub remote_root: String,
    /// `<workdir>/rpi/<last remote segment>`.
    pub local_root: PathBuf,
    /// Directory receiving the archive.
    pub workdir: PathBuf,
}

impl BackupPlan {
    pub fn new(config: &ResolvedConfig, workdir: &Path) -> Self {
        Self {
            label: config.label.clone(),
            remote_root: config.remote_root.clone(),
            local_root: local_root_for(workdir, &config.remote_root),
            workdir: workdir.to_path_buf(),
        }
    }
}

/// Outcome of [`run_backup`].
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub entries_mirrored: u64,
    pub total_eligible: u64,
    pub archive_path: Option<PathBuf>,
    pub elapsed: Duration,
}

/// Mirrors the remote root of `plan` into its local root.
///
/// Connectivity is checked with a throwaway session first; nothing local is
/// touched if that fails. A second session then serves the counting and
/// mirroring passes and is closed when this function returns, whether it
/// succeeds or not.
///
/// # Returns
///
/// The finished [`SyncContext`].
pub fn mirror_tree<S: RemoteService>(
    service: &S,
    plan: &BackupPlan,
    on_progress: &mut dyn FnMut(&MirrorProgress<'_>),
) -> Result<SyncContext, MirrorError> {
    service.probe()?;

    let mut session = service.open()?;
    let mut ctx = SyncContext::new(plan.remote_root.clone(), plan.local_root.clone());

    info!("Counting entries under '{}'", ctx.remote_root);
    ctx.total_eligible = count_eligible(&mut session, &ctx.remote_root)?;
    info!("📊 {} entries to mirror", ctx.total_eligible);

    let (remote_root, local_root) = (ctx.remote_root.clone(), ctx.local_root.clone());
    mirror(&mut session, &remote_root, &local_root, &mut ctx, on_progress)?;

    if ctx.processed != ctx.total_eligible {
        warn!(
            "Remote tree changed while mirroring: counted {} entries, mirrored {}",
            ctx.total_eligible, ctx.processed
        );
    }
    info!("✅ Tree '{}' mirrored successfully", ctx.remote_root);

    Ok(ctx)
}

/// Runs the stages selected by `stage` for `plan`.
///
/// 1. Probes the connection and mirrors the remote tree (unless `ArchiveOnly`)
/// 2. Archives the local tree into the work directory and removes the tree
///    (unless `MirrorOnly`)
///
/// # Arguments
///
/// * `service` - Remote file service
/// * `plan` - Source, destination and archive label
/// * `stage` - Execution stage control
/// * `show_progress` - Draw progress bars on stderr
pub fn run_backup<S: RemoteService>(
    service: &S,
    plan: &BackupPlan,
    stage: ExecutionStage,
    show_progress: bool,
) -> Result<RunSummary, MirrorError> {
    let started = Instant::now();
    let mut summary = RunSummary {
        entries_mirrored: 0,
        total_eligible: 0,
        archive_path: None,
        elapsed: Duration::ZERO,
    };

    if stage != ExecutionStage::ArchiveOnly {
        let pb = progress_bar(show_progress);
        pb.set_message(format!("📦 Mirroring {}", plan.remote_root));

        let result = mirror_tree(service, plan, &mut |p| {
            pb.set_length(p.total);
            pb.set_position(p.processed);
            pb.set_message(format!("| ⬇️  {} {}%", p.remote_path, p.percent));
        });

        let ctx = match result {
            Ok(ctx) => ctx,
            Err(e) => {
                pb.abandon_with_message("❌ Mirror failed!");
                return Err(e);
            }
        };
        pb.finish_with_message(format!("✅ Mirrored {} entries", ctx.processed));

        summary.entries_mirrored = ctx.processed;
        summary.total_eligible = ctx.total_eligible;
    }

    if stage != ExecutionStage::MirrorOnly {
        let pb = progress_bar(show_progress);
        let archive_path = archive(&plan.local_root, &plan.workdir, &plan.label, &mut |p| {
            pb.set_length(p.total);
            pb.set_position(p.index);
            pb.set_message(format!("| 🗜️  {}", p.entry_name));
        });

        let archive_path = match archive_path {
            Ok(path) => path,
            Err(e) => {
                pb.abandon_with_message("❌ Archive failed!");
                return Err(e);
            }
        };
        pb.finish_with_message("✅ Archive written");

        remove_empty_namespace(&plan.local_root);
        info!("Archive saved: {}", archive_path.display());
        summary.archive_path = Some(archive_path);
    }

    summary.elapsed = started.elapsed();
    Ok(summary)
}

fn progress_bar(visible: bool) -> indicatif::ProgressBar {
    if !visible {
        return indicatif::ProgressBar::hidden();
    }
    let pb = indicatif::ProgressBar::new(0);
    if let Ok(style) = indicatif::ProgressStyle::default_bar().template(
        "{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg} | {elapsed_precise} elapsed",
    ) {
        pb.set_style(style.progress_chars("█▓▒░ "));
    }
    pb
}

// The namespace directory only exists to hold mirrors; drop it once the last
// one has been archived. remove_dir refuses non-empty directories.
fn remove_empty_namespace(local_root: &Path) {
    if let Some(parent) = local_root.parent() {
        if parent.file_name().is_some_and(|n| n == LOCAL_NAMESPACE) {
            let _ = std::fs::remove_dir(parent);
        }
    }
}
