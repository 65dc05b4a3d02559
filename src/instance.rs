//! Single-instance arbitration.
//!
//! The first process to take the instance lock becomes primary and listens
//! for forwarded launches. Every later process hands its raw arguments to
//! the primary and exits without building a window.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::launch::{resolve_launch_args, DocumentReference};
use crate::{log_debug, log_info, log_warn};

const ENABLE_LOGS: bool = true;

const CONNECT_ATTEMPTS: u32 = 20;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(100);
const READ_TIMEOUT: Duration = Duration::from_secs(2);
const MAX_MESSAGE_BYTES: u64 = 64 * 1024;

/// What a secondary process sends to the primary: its untouched argument
/// list and the directory relative paths in it are relative to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardedLaunch {
    pub args: Vec<String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

impl ForwardedLaunch {
    pub fn current() -> Self {
        Self {
            args: std::env::args().collect(),
            cwd: std::env::current_dir().ok(),
        }
    }

    /// Re-runs launch argument resolution against the sender's directory.
    pub fn document(&self) -> Option<DocumentReference> {
        let cwd = self
            .cwd
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_default();
        resolve_launch_args(&self.args, &cwd)
    }
}

/// Where the instance lock and the forwarding channel live.
#[derive(Debug, Clone)]
pub struct InstanceEndpoint {
    #[cfg(unix)]
    lock_path: PathBuf,
    #[cfg(unix)]
    socket_path: PathBuf,
    #[cfg(windows)]
    pipe_name: String,
}

impl InstanceEndpoint {
    pub fn in_dir(dir: &Path) -> Self {
        #[cfg(unix)]
        {
            Self {
                lock_path: dir.join("instance.lock"),
                socket_path: dir.join("instance.sock"),
            }
        }
        #[cfg(windows)]
        {
            let _ = dir;
            Self {
                pipe_name: format!(r"\\.\pipe\{}-instance", crate::config::APP_IDENTIFIER),
            }
        }
    }
}

pub enum InstanceRole {
    Primary(PrimaryInstance),
    Secondary,
}

/// Holds the instance lock for as long as it (or its listener) lives.
pub struct PrimaryInstance {
    inner: platform::Primary,
}

impl PrimaryInstance {
    /// Serves forwarded launches until `cancel` fires. The lock is released
    /// when the returned task ends.
    pub fn listen<F>(self, on_launch: F, cancel: CancellationToken) -> JoinHandle<()>
    where
        F: Fn(ForwardedLaunch) + Send + Sync + 'static,
    {
        tokio::spawn(platform::serve(self.inner, on_launch, cancel))
    }
}

/// Claims the primary role, or forwards `launch` to the existing primary.
pub async fn acquire(endpoint: &InstanceEndpoint, launch: &ForwardedLaunch) -> Result<InstanceRole> {
    match platform::try_claim(endpoint)? {
        Some(primary) => {
            log_info!("Acquired single-instance lock");
            Ok(InstanceRole::Primary(PrimaryInstance { inner: primary }))
        }
        None => {
            log_info!("Another instance is running; forwarding launch arguments");
            let mut payload = serde_json::to_vec(launch)?;
            payload.push(b'\n');
            if let Err(err) = platform::forward(endpoint, &payload).await {
                log_warn!("Could not reach the running instance: {err:#}");
            }
            Ok(InstanceRole::Secondary)
        }
    }
}

async fn read_launch<R: AsyncRead + Unpin>(stream: R) -> Result<ForwardedLaunch> {
    let mut reader = BufReader::new(tokio::io::AsyncReadExt::take(stream, MAX_MESSAGE_BYTES));
    let mut line = String::new();
    tokio::time::timeout(READ_TIMEOUT, reader.read_line(&mut line))
        .await
        .context("timed out reading forwarded launch")??;
    serde_json::from_str(line.trim()).context("malformed forwarded launch")
}

fn deliver<F: Fn(ForwardedLaunch)>(on_launch: &F, received: Result<ForwardedLaunch>) {
    match received {
        Ok(launch) => {
            log_debug!("Forwarded launch: {:?}", launch.args);
            on_launch(launch);
        }
        Err(err) => log_warn!("Ignoring forwarded launch: {err:#}"),
    }
}

#[cfg(unix)]
mod platform {
    use super::*;
    use nix::{
        errno::Errno,
        fcntl::{Flock, FlockArg},
    };
    use std::fs::{self, File, OpenOptions};
    use tokio::net::{UnixListener, UnixStream};

    pub struct Primary {
        _lock: Flock<File>,
        listener: UnixListener,
        socket_path: PathBuf,
    }

    pub fn try_claim(endpoint: &InstanceEndpoint) -> Result<Option<Primary>> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&endpoint.lock_path)
            .with_context(|| format!("failed to open {}", endpoint.lock_path.display()))?;

        let lock = match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(lock) => lock,
            Err((_, errno)) if errno == Errno::EWOULDBLOCK => return Ok(None),
            Err((_, errno)) => {
                return Err(errno).context("failed to take the instance lock");
            }
        };

        // Whoever held the lock before us is gone; its socket is stale.
        if endpoint.socket_path.exists() {
            fs::remove_file(&endpoint.socket_path).with_context(|| {
                format!("failed to remove stale {}", endpoint.socket_path.display())
            })?;
        }
        let listener = UnixListener::bind(&endpoint.socket_path).with_context(|| {
            format!("failed to bind {}", endpoint.socket_path.display())
        })?;

        Ok(Some(Primary {
            _lock: lock,
            listener,
            socket_path: endpoint.socket_path.clone(),
        }))
    }

    pub async fn serve<F>(primary: Primary, on_launch: F, cancel: CancellationToken)
    where
        F: Fn(ForwardedLaunch) + Send + Sync + 'static,
    {
        loop {
            tokio::select! {
                accepted = primary.listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        let received = read_launch(stream).await;
                        deliver(&on_launch, received);
                    }
                    Err(err) => log_warn!("Instance listener accept failed: {err}"),
                },
                _ = cancel.cancelled() => break,
            }
        }

        let _ = fs::remove_file(&primary.socket_path);
        log_info!("Instance listener shutting down");
    }

    pub async fn forward(endpoint: &InstanceEndpoint, payload: &[u8]) -> Result<()> {
        let mut last_err = None;
        for _ in 0..CONNECT_ATTEMPTS {
            match UnixStream::connect(&endpoint.socket_path).await {
                Ok(mut stream) => {
                    stream.write_all(payload).await?;
                    stream.shutdown().await?;
                    return Ok(());
                }
                Err(err) => {
                    // The primary may still be binding its socket.
                    last_err = Some(err);
                    tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                }
            }
        }
        Err(anyhow::anyhow!(
            "no listener at {}: {:?}",
            endpoint.socket_path.display(),
            last_err
        ))
    }
}

#[cfg(windows)]
mod platform {
    use super::*;
    use std::io;
    use tokio::net::windows::named_pipe::{ClientOptions, NamedPipeServer, ServerOptions};

    const ERROR_PIPE_BUSY: i32 = 231;

    pub struct Primary {
        server: NamedPipeServer,
        pipe_name: String,
    }

    pub fn try_claim(endpoint: &InstanceEndpoint) -> Result<Option<Primary>> {
        match ServerOptions::new()
            .first_pipe_instance(true)
            .create(&endpoint.pipe_name)
        {
            Ok(server) => Ok(Some(Primary {
                server,
                pipe_name: endpoint.pipe_name.clone(),
            })),
            Err(err) if err.kind() == io::ErrorKind::PermissionDenied => Ok(None),
            Err(err) => Err(err).context("failed to create instance pipe"),
        }
    }

    pub async fn serve<F>(primary: Primary, on_launch: F, cancel: CancellationToken)
    where
        F: Fn(ForwardedLaunch) + Send + Sync + 'static,
    {
        let Primary {
            mut server,
            pipe_name,
        } = primary;
        loop {
            tokio::select! {
                connected = server.connect() => {
                    if let Err(err) = connected {
                        log_warn!("Instance pipe connect failed: {err}");
                        continue;
                    }
                    let next = match ServerOptions::new().create(&pipe_name) {
                        Ok(next) => next,
                        Err(err) => {
                            log_warn!("Instance pipe could not be recreated: {err}");
                            break;
                        }
                    };
                    let client = std::mem::replace(&mut server, next);
                    let received = read_launch(client).await;
                    deliver(&on_launch, received);
                }
                _ = cancel.cancelled() => break,
            }
        }
        log_info!("Instance listener shutting down");
    }

    pub async fn forward(endpoint: &InstanceEndpoint, payload: &[u8]) -> Result<()> {
        let mut last_err = None;
        for _ in 0..CONNECT_ATTEMPTS {
            match ClientOptions::new().open(&endpoint.pipe_name) {
                Ok(mut client) => {
                    client.write_all(payload).await?;
                    client.shutdown().await?;
                    return Ok(());
                }
                Err(err) => {
                    if err.raw_os_error() != Some(ERROR_PIPE_BUSY) {
                        last_err = Some(err);
                    }
                    tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                }
            }
        }
        Err(anyhow::anyhow!(
            "no listener at {}: {:?}",
            endpoint.pipe_name,
            last_err
        ))
    }
}
