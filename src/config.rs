//! Resolving connection settings from a config file section or prompts.

use crate::error::MirrorError;
use crate::types::{ConnectionParams, DEFAULT_REMOTE_ROOT, LOCAL_NAMESPACE};
use serde::Deserialize;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Password value that asks for the password interactively instead.
pub const PROMPT_PASSWORD_MARKER: &str = "getpass";

/// Default config file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Where connection settings come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A named table in a TOML config file.
    Section { path: PathBuf, name: String },
    /// Ask for everything on the terminal.
    Interactive,
}

/// One `[section]` of the config file.
#[derive(Deserialize, Debug, Clone)]
struct SectionConfig {
    hostname: String,
    username: String,
    password: String,
    remote_path: Option<String>,
    port: Option<u16>,
}

/// Whether resolution may ask for credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credentials {
    /// Ask for anything the config leaves open.
    Prompt,
    /// Never prompt; only the archive label and remote root are needed.
    Skip,
}

/// Connection settings after file lookup and prompting.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Archive name prefix.
    pub label: String,
    pub connection: ConnectionParams,
    pub remote_root: String,
}

/// Source of interactive answers.
pub trait Prompt {
    /// Asks a question whose answer may be echoed.
    fn ask(&mut self, label: &str) -> io::Result<String>;

    /// Asks for a secret without echoing it.
    fn ask_secret(&mut self, label: &str) -> io::Result<String>;
}

/// Prompts on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn ask(&mut self, label: &str) -> io::Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{}: ", label)?;
        stdout.flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    fn ask_secret(&mut self, label: &str) -> io::Result<String> {
        rpassword::prompt_password(format!("{}: ", label))
    }
}

/// Archive label for a config section: lower-cased, spaces and path
/// separators become hyphens.
pub fn label_for_section(section: &str) -> String {
    section
        .to_lowercase()
        .replace(&[' ', '/', '\\'][..], "-")
}

/// Resolves connection settings from `source`.
///
/// A section whose config file does not exist falls back to prompting, the
/// same as [`ConfigSource::Interactive`]. With [`Credentials::Skip`] nothing
/// is asked and the connection fields the config does not supply stay empty.
///
/// # Arguments
///
/// * `source` - Config section or interactive mode
/// * `default_port` - Port used when the section does not set one
/// * `credentials` - Whether missing credentials are prompted for
/// * `prompt` - Answers questions the config leaves open
pub fn resolve(
    source: &ConfigSource,
    default_port: u16,
    credentials: Credentials,
    prompt: &mut dyn Prompt,
) -> Result<ResolvedConfig, MirrorError> {
    match source {
        ConfigSource::Section { path, name } if path.is_file() => {
            let contents = std::fs::read_to_string(path)?;
            from_section(&contents, path, name, default_port, credentials, prompt)
        }
        ConfigSource::Section { path, .. } => {
            info!("Config file {} not found, using interactive settings", path.display());
            interactive(default_port, credentials, prompt)
        }
        ConfigSource::Interactive => interactive(default_port, credentials, prompt),
    }
}

fn from_section(
    contents: &str,
    path: &Path,
    name: &str,
    default_port: u16,
    credentials: Credentials,
    prompt: &mut dyn Prompt,
) -> Result<ResolvedConfig, MirrorError> {
    let mut sections: toml::Table = contents
        .parse()
        .map_err(|e| MirrorError::Config(format!("invalid config {}: {}", path.display(), e)))?;

    // Only the requested section has to be complete.
    let section: SectionConfig = sections
        .remove(name)
        .ok_or_else(|| {
            MirrorError::Config(format!(
                "section [{}] not found in {}",
                name,
                path.display()
            ))
        })?
        .try_into()
        .map_err(|e| {
            MirrorError::Config(format!(
                "invalid section [{}] in {}: {}",
                name,
                path.display(),
                e
            ))
        })?;

    let password = match credentials {
        Credentials::Prompt if section.password == PROMPT_PASSWORD_MARKER => {
            println!("[{}]", name);
            prompt.ask_secret("Password")?
        }
        Credentials::Skip if section.password == PROMPT_PASSWORD_MARKER => String::new(),
        _ => section.password,
    };

    debug!("Using config section [{}] from {}", name, path.display());

    Ok(ResolvedConfig {
        label: label_for_section(name),
        connection: ConnectionParams {
            host: section.hostname,
            port: section.port.unwrap_or(default_port),
            username: section.username,
            password,
        },
        remote_root: section
            .remote_path
            .unwrap_or_else(|| DEFAULT_REMOTE_ROOT.to_string()),
    })
}

fn interactive(
    default_port: u16,
    credentials: Credentials,
    prompt: &mut dyn Prompt,
) -> Result<ResolvedConfig, MirrorError> {
    let (host, username, password) = match credentials {
        Credentials::Prompt => {
            let host = prompt.ask("Hostname")?;
            if host.is_empty() {
                return Err(MirrorError::Config("hostname must not be empty".to_string()));
            }
            let username = prompt.ask("Username")?;
            let password = prompt.ask_secret("Password")?;
            (host, username, password)
        }
        Credentials::Skip => (String::new(), String::new(), String::new()),
    };

    Ok(ResolvedConfig {
        label: LOCAL_NAMESPACE.to_string(),
        connection: ConnectionParams {
            host,
            port: default_port,
            username,
            password,
        },
        remote_root: DEFAULT_REMOTE_ROOT.to_string(),
    })
}
