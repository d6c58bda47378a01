//! Remote file service: the listing/fetch capability and its SFTP transport.

use crate::download::download_to_file;
use crate::error::MirrorError;
use crate::types::{ConnectionParams, RemoteEntry};
use ssh2::{Session, Sftp};
use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Read access to a remote tree.
///
/// Paths are forward-slash separated regardless of the local platform.
pub trait RemoteFs {
    /// Lists the entries of `path` in server order.
    fn list_entries(&mut self, path: &str) -> io::Result<Vec<RemoteEntry>>;

    /// Downloads `remote_path` into `local_path`, calling `on_chunk` with
    /// `(transferred, total)` bytes after every chunk.
    fn fetch_file(
        &mut self,
        remote_path: &str,
        local_path: &Path,
        on_chunk: &mut dyn FnMut(u64, u64),
    ) -> io::Result<()>;
}

/// Something that can verify connectivity and hand out sessions.
pub trait RemoteService {
    type Session: RemoteFs;

    /// Opens a session, authenticates and closes it again.
    fn probe(&self) -> Result<(), MirrorError>;

    /// Opens a session that stays alive until dropped.
    fn open(&self) -> Result<Self::Session, MirrorError>;
}

/// SFTP over ssh2 with password authentication.
#[derive(Debug, Clone)]
pub struct SftpService {
    params: ConnectionParams,
}

impl SftpService {
    pub fn new(params: ConnectionParams) -> Self {
        Self { params }
    }

    fn connect(&self) -> Result<Session, MirrorError> {
        let target = self.params.target();
        authenticated_session(&self.params).map_err(|source| MirrorError::Connection {
            target,
            source,
        })
    }
}

impl RemoteService for SftpService {
    type Session = SftpSession;

    fn probe(&self) -> Result<(), MirrorError> {
        info!("Checking connection to {}", self.params.target());
        let session = self.connect()?;
        if let Err(e) = session.disconnect(None, "connection check", None) {
            debug!("Disconnect after probe failed: {}", e);
        }
        info!("Connection to {} succeeded", self.params.target());
        Ok(())
    }

    fn open(&self) -> Result<SftpSession, MirrorError> {
        let session = self.connect()?;
        let sftp = session.sftp().map_err(|e| MirrorError::Connection {
            target: self.params.target(),
            source: e.into(),
        })?;
        debug!("SFTP channel open on {}", self.params.target());
        Ok(SftpSession {
            sftp: Some(sftp),
            session,
        })
    }
}

fn authenticated_session(params: &ConnectionParams) -> io::Result<Session> {
    let addr = (params.host.as_str(), params.port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no address found for {}", params.host),
            )
        })?;
    let tcp = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)?;

    let mut session = Session::new()?;
    session.set_tcp_stream(tcp);
    session.handshake()?;
    session.userauth_password(&params.username, &params.password)?;

    if !session.authenticated() {
        return Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "not authenticated after password attempt",
        ));
    }
    Ok(session)
}

/// A live SFTP session. Disconnects when dropped.
pub struct SftpSession {
    sftp: Option<Sftp>,
    session: Session,
}

impl SftpSession {
    fn sftp(&self) -> io::Result<&Sftp> {
        self.sftp
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "sftp channel closed"))
    }
}

impl RemoteFs for SftpSession {
    fn list_entries(&mut self, path: &str) -> io::Result<Vec<RemoteEntry>> {
        let raw = self.sftp()?.readdir(Path::new(path))?;
        Ok(raw
            .into_iter()
            .filter_map(|(entry_path, stat)| {
                let name = entry_path.file_name()?.to_string_lossy().into_owned();
                if name == "." || name == ".." {
                    return None;
                }
                Some(RemoteEntry {
                    name,
                    is_dir: stat.is_dir(),
                    size: stat.size.unwrap_or(0),
                })
            })
            .collect())
    }

    fn fetch_file(
        &mut self,
        remote_path: &str,
        local_path: &Path,
        on_chunk: &mut dyn FnMut(u64, u64),
    ) -> io::Result<()> {
        let mut remote = self.sftp()?.open(Path::new(remote_path))?;
        let total = remote.stat()?.size.unwrap_or(0);
        download_to_file(&mut remote, local_path, total, on_chunk)?;
        Ok(())
    }
}

impl Drop for SftpSession {
    fn drop(&mut self) {
        // The channel has to go before the transport is torn down.
        drop(self.sftp.take());
        if let Err(e) = self.session.disconnect(None, "mirror finished", None) {
            warn!("Failed to close SFTP session cleanly: {}", e);
        }
    }
}
