//! SSH transport implementation using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, trace, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::{
    HashAlg, PrivateKey, PrivateKeyWithHashAlg, PublicKey, decode_secret_key, load_secret_key,
};
use russh::{Channel, ChannelMsg, Disconnect};
use secrecy::ExposeSecret;
use tokio::time::Instant;

use super::config::{AuthMethod, DeviceEndpoint, HostKeyVerification};
use super::{Connection, Transport};
use crate::error::TransportError;

/// Interval between SSH keepalives on pooled connections.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Opens russh connections for a [`SessionPool`](crate::pool::SessionPool).
#[derive(Debug, Clone, Copy, Default)]
pub struct SshTransport;

impl Transport for SshTransport {
    type Connection = SshConnection;

    async fn connect(&self, endpoint: &DeviceEndpoint) -> Result<SshConnection, TransportError> {
        SshConnection::connect(endpoint).await
    }
}

/// One authenticated russh session plus an optional interactive shell.
pub struct SshConnection {
    /// The russh session handle.
    session: Handle<SshHandler>,

    /// The PTY shell channel, once opened.
    shell: Option<Channel<Msg>>,

    terminal_size: (u32, u32),

    closed: bool,
}

impl SshConnection {
    /// Connect to the SSH server and authenticate.
    pub async fn connect(endpoint: &DeviceEndpoint) -> Result<Self, TransportError> {
        let ssh_config = Arc::new(client::Config {
            keepalive_interval: Some(KEEPALIVE_INTERVAL),
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: endpoint.host().to_string(),
            port: endpoint.port(),
            host_key_verification: endpoint.host_key().clone(),
            known_hosts_path: endpoint.known_hosts_path().map(PathBuf::from),
            host_key_error: host_key_error.clone(),
        };

        let timeout = endpoint.connect_timeout();
        let deadline = Instant::now() + timeout;

        let mut session = tokio::time::timeout_at(
            deadline,
            client::connect(ssh_config, (endpoint.host(), endpoint.port()), handler),
        )
        .await
        .map_err(|_| TransportError::Timeout(timeout))?
        .map_err(|e| {
            // Prefer the detailed host-key outcome over russh's generic error
            host_key_error
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .unwrap_or(TransportError::Ssh(e))
        })?;

        tokio::time::timeout_at(deadline, Self::authenticate(&mut session, endpoint))
            .await
            .map_err(|_| TransportError::Timeout(timeout))??;

        debug!("ssh: authenticated to {}", endpoint.socket_addr());

        Ok(Self {
            session,
            shell: None,
            terminal_size: endpoint.terminal_size(),
            closed: false,
        })
    }

    /// Authenticate with the server.
    async fn authenticate(
        session: &mut Handle<SshHandler>,
        endpoint: &DeviceEndpoint,
    ) -> Result<(), TransportError> {
        let username = endpoint.username();
        let success = match endpoint.auth() {
            AuthMethod::None => session.authenticate_none(username).await?.success(),
            AuthMethod::Password(password) => session
                .authenticate_password(username, password.expose_secret())
                .await?
                .success(),
            AuthMethod::PrivateKey { path, passphrase } => {
                let key = load_secret_key(path, passphrase.as_ref().map(|p| p.expose_secret()))
                    .map_err(|e| TransportError::Key(e.to_string()))?;
                Self::authenticate_key(session, username, key).await?
            }
            AuthMethod::PrivateKeyData { pem, passphrase } => {
                let key = decode_secret_key(
                    pem.expose_secret(),
                    passphrase.as_ref().map(|p| p.expose_secret()),
                )
                .map_err(|e| TransportError::Key(e.to_string()))?;
                Self::authenticate_key(session, username, key).await?
            }
        };

        if !success {
            return Err(TransportError::AuthenticationFailed {
                user: username.to_string(),
            });
        }

        Ok(())
    }

    async fn authenticate_key(
        session: &mut Handle<SshHandler>,
        username: &str,
        key: PrivateKey,
    ) -> Result<bool, TransportError> {
        // Get the best RSA hash algorithm supported by the server
        let hash_alg = session.best_supported_rsa_hash().await?.flatten();

        Ok(session
            .authenticate_publickey(username, PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg))
            .await?
            .success())
    }

    fn shell_mut(&mut self) -> Result<&mut Channel<Msg>, TransportError> {
        self.shell
            .as_mut()
            .ok_or_else(|| TransportError::Other("shell channel not open".to_string()))
    }
}

impl Connection for SshConnection {
    async fn exec(&mut self, command: &str, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let run = async {
            let mut channel = self.session.channel_open_session().await?;
            channel.exec(true, command).await?;

            let mut output = Vec::new();
            while let Some(msg) = channel.wait().await {
                match msg {
                    ChannelMsg::Data { ref data } => output.extend_from_slice(data),
                    ChannelMsg::ExtendedData { ref data, .. } => output.extend_from_slice(data),
                    ChannelMsg::ExitStatus { exit_status } => {
                        trace!("ssh: '{}' exited with {}", command, exit_status);
                    }
                    ChannelMsg::Eof | ChannelMsg::Close => break,
                    _ => {}
                }
            }
            Ok::<_, TransportError>(output)
        };

        tokio::time::timeout(timeout, run)
            .await
            .map_err(|_| TransportError::Timeout(timeout))?
    }

    async fn open_shell(&mut self) -> Result<(), TransportError> {
        if self.shell.is_some() {
            return Ok(());
        }

        let channel = self.session.channel_open_session().await?;

        let (width, height) = self.terminal_size;
        channel
            .request_pty(true, "xterm", width, height, 0, 0, &[])
            .await?;
        channel.request_shell(true).await?;

        self.shell = Some(channel);
        Ok(())
    }

    async fn send(&mut self, input: &str) -> Result<(), TransportError> {
        let line = format!("{input}\n");
        self.shell_mut()?.data(line.as_bytes()).await?;
        Ok(())
    }

    async fn receive(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            let channel = self.shell_mut()?;
            let msg = tokio::time::timeout_at(deadline, channel.wait())
                .await
                .map_err(|_| TransportError::Timeout(timeout))?;

            match msg {
                Some(ChannelMsg::Data { ref data }) => return Ok(Some(data.to_vec())),
                Some(ChannelMsg::ExtendedData { ref data, .. }) => return Ok(Some(data.to_vec())),
                Some(ChannelMsg::Eof | ChannelMsg::Close) | None => {
                    self.shell = None;
                    return Ok(None);
                }
                Some(_) => continue,
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Some(channel) = self.shell.take() {
            if let Err(e) = channel.close().await {
                warn!("ssh: error closing shell channel: {}", e);
            }
        }
        self.session
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }

    fn is_alive(&self) -> bool {
        !self.closed && !self.session.is_closed()
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Stores a detailed host-key error so connect() can surface it
    /// instead of the generic russh::Error::UnknownKey.
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    /// Check the host key against known_hosts.
    ///
    /// Returns `Ok(true)` if matched, `Ok(false)` if host not found,
    /// `Err(TransportError::HostKeyChanged)` if key changed.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> Result<bool, TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::check_known_hosts(&self.host, self.port, pubkey)
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    /// Save a new host key to known_hosts.
    fn learn_host_key(&self, pubkey: &PublicKey) -> Result<(), TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey)
        };

        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    fn reject(&self, err: TransportError) -> bool {
        *self
            .host_key_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(err);
        false
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(&mut self, server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        match self.host_key_verification {
            HostKeyVerification::Disabled => Ok(true),

            HostKeyVerification::Pinned(ref expected) => {
                let actual = server_public_key.fingerprint(HashAlg::Sha256).to_string();
                if actual == *expected {
                    Ok(true)
                } else {
                    Ok(self.reject(TransportError::HostKeyMismatch {
                        host: self.host.clone(),
                        port: self.port,
                        expected: expected.clone(),
                        actual,
                    }))
                }
            }

            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => {
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("Failed to save host key for {}: {}", self.host, e);
                    }
                    Ok(true)
                }
                Err(e) => Ok(self.reject(e)),
            },

            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => Ok(self.reject(TransportError::HostKeyUnknown {
                    host: self.host.clone(),
                    port: self.port,
                })),
                Err(e) => Ok(self.reject(e)),
            },
        }
    }
}
