//! Device endpoint configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HostKeyVerification {
    /// Accept only a server key whose SHA-256 fingerprint equals this pin
    /// (OpenSSH `SHA256:<base64>` form).
    Pinned(String),

    /// Reject unknown and changed keys. Connection fails if the host
    /// is not already in known_hosts.
    Strict,

    /// Accept and auto-learn unknown keys, but reject changed keys.
    #[default]
    AcceptNew,

    /// Accept all keys without checking. For testing and lab use only.
    Disabled,
}

/// Authentication method for device sessions.
#[derive(Clone)]
pub enum AuthMethod {
    /// No authentication (for testing only).
    None,

    /// Password authentication.
    Password(SecretString),

    /// Private key read from a file.
    PrivateKey {
        /// Path to the private key file.
        path: PathBuf,
        /// Optional passphrase for encrypted keys.
        passphrase: Option<SecretString>,
    },

    /// Private key supplied in memory (OpenSSH or PEM text).
    PrivateKeyData {
        pem: SecretString,
        passphrase: Option<SecretString>,
    },
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::None => f.write_str("None"),
            AuthMethod::Password(_) => f.write_str("Password(<redacted>)"),
            AuthMethod::PrivateKey { path, .. } => {
                f.debug_struct("PrivateKey").field("path", path).finish()
            }
            AuthMethod::PrivateKeyData { .. } => f.write_str("PrivateKeyData(<redacted>)"),
        }
    }
}

/// Network address and credentials identifying one manageable storage system.
///
/// Built with [`DeviceEndpoint::builder`] and immutable afterwards.
#[derive(Debug, Clone)]
pub struct DeviceEndpoint {
    pub(super) host: String,
    pub(super) port: u16,
    pub(super) username: String,
    pub(super) auth: AuthMethod,
    pub(super) host_key: HostKeyVerification,
    pub(super) known_hosts_path: Option<PathBuf>,
    pub(super) connect_timeout: Duration,
    pub(super) max_pool_size: usize,
    pub(super) terminal_width: u32,
    pub(super) terminal_height: u32,
}

impl DeviceEndpoint {
    /// Target host (hostname or IP address).
    pub fn host(&self) -> &str {
        &self.host
    }

    /// SSH port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Username for authentication.
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn auth(&self) -> &AuthMethod {
        &self.auth
    }

    pub fn host_key(&self) -> &HostKeyVerification {
        &self.host_key
    }

    pub fn known_hosts_path(&self) -> Option<&Path> {
        self.known_hosts_path.as_deref()
    }

    /// Deadline for handshake plus authentication.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Upper bound on concurrent sessions to this device.
    pub fn max_pool_size(&self) -> usize {
        self.max_pool_size
    }

    /// Terminal dimensions requested for interactive shells.
    pub fn terminal_size(&self) -> (u32, u32) {
        (self.terminal_width, self.terminal_height)
    }

    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
