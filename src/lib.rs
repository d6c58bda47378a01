//! bupsync - mirror a remote directory tree over SFTP and archive it
//!
//! This library walks a remote tree over a single SFTP session, downloads
//! every eligible entry into a local mirror and then packs the mirror into a
//! dated `.tar.gz` archive, removing the local copy afterwards.
//!
//! # Features
//!
//! - **Connectivity Check**: A throwaway session verifies credentials before any work
//! - **Filtering**: Hidden entries are skipped; `__pycache__` directories stay empty
//! - **Progress Tracking**: Live per-file progress against a pre-counted total
//! - **Archiving**: Relative entry names, gzip compression, source removed on success
//!
//! # Example
//!
//! ```no_run
//! use bupsync::{resolve, run_backup, BackupPlan, ConfigSource, Credentials, ExecutionStage};
//! use bupsync::{SftpService, TerminalPrompt};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = ConfigSource::Section {
//!     path: "config.toml".into(),
//!     name: "Living Room".to_string(),
//! };
//! let config = resolve(&source, 22, Credentials::Prompt, &mut TerminalPrompt)?;
//! let plan = BackupPlan::new(&config, &std::env::current_dir()?);
//! let service = SftpService::new(config.connection);
//!
//! run_backup(&service, &plan, ExecutionStage::All, true)?;
//! # Ok(())
//! # }
//! ```

mod archive;
mod config;
mod count;
mod download;
mod error;
mod filter;
mod mirror;
mod orchestrator;
mod remote;
mod types;

pub use archive::{archive, archive_name, ARCHIVE_EXTENSION};
pub use config::{
    label_for_section, resolve, ConfigSource, Credentials, Prompt, ResolvedConfig, TerminalPrompt,
    DEFAULT_CONFIG_FILE, PROMPT_PASSWORD_MARKER,
};
pub use count::count_eligible;
pub use download::percent_complete;
pub use error::MirrorError;
pub use filter::CACHE_DIR_NAME;
pub use mirror::mirror;
pub use orchestrator::{mirror_tree, run_backup, BackupPlan, RunSummary};
pub use remote::{RemoteFs, RemoteService, SftpService, SftpSession};
pub use types::{
    join_remote, local_root_for, ArchiveJob, ArchiveProgress, ConnectionParams, ExecutionStage,
    MirrorProgress, RemoteEntry, SyncContext, DEFAULT_REMOTE_ROOT, LOCAL_NAMESPACE,
};
