//! Builder for device endpoints.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use super::config::{AuthMethod, DeviceEndpoint, HostKeyVerification};
use crate::error::{Error, Result};

/// Builder for constructing a [`DeviceEndpoint`].
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use storssh::transport::DeviceEndpoint;
///
/// # fn example() -> Result<(), storssh::Error> {
/// let endpoint = DeviceEndpoint::builder("10.0.0.5")
///     .username("monitor")
///     .password("secret")
///     .connect_timeout(Duration::from_secs(10))
///     .max_pool_size(3)
///     .build()?;
/// assert_eq!(endpoint.socket_addr(), "10.0.0.5:22");
/// # Ok(())
/// # }
/// ```
pub struct EndpointBuilder {
    host: String,
    port: u16,
    username: Option<String>,
    auth: AuthMethod,
    host_key: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    connect_timeout: Duration,
    max_pool_size: usize,
    terminal_width: u32,
    terminal_height: u32,
}

impl DeviceEndpoint {
    /// Start building an endpoint for the specified host.
    pub fn builder(host: impl Into<String>) -> EndpointBuilder {
        EndpointBuilder::new(host)
    }
}

impl EndpointBuilder {
    /// Create a new endpoint builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: None,
            auth: AuthMethod::None,
            host_key: HostKeyVerification::default(),
            known_hosts_path: None,
            connect_timeout: Duration::from_secs(30),
            max_pool_size: 3,
            terminal_width: 511,
            terminal_height: 24,
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the username for authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set password authentication.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.auth = AuthMethod::Password(SecretString::from(password.into()));
        self
    }

    /// Set private key authentication from a key file.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: None,
        };
        self
    }

    /// Set private key authentication with passphrase.
    pub fn private_key_with_passphrase(
        mut self,
        key_path: impl Into<PathBuf>,
        passphrase: impl Into<String>,
    ) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: Some(SecretString::from(passphrase.into())),
        };
        self
    }

    /// Set private key authentication from in-memory key text.
    pub fn private_key_data(
        mut self,
        pem: impl Into<String>,
        passphrase: Option<String>,
    ) -> Self {
        self.auth = AuthMethod::PrivateKeyData {
            pem: SecretString::from(pem.into()),
            passphrase: passphrase.map(SecretString::from),
        };
        self
    }

    /// Pin the server's host key to a `SHA256:` fingerprint.
    pub fn host_key_pin(mut self, fingerprint: impl Into<String>) -> Self {
        self.host_key = HostKeyVerification::Pinned(fingerprint.into());
        self
    }

    /// Set the host key verification mode.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key = mode;
        self
    }

    /// Use a specific known_hosts file instead of `~/.ssh/known_hosts`.
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the maximum number of concurrent sessions (default: 3).
    pub fn max_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = size;
        self
    }

    /// Set terminal dimensions.
    pub fn terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    /// Validate and build the endpoint.
    pub fn build(self) -> Result<DeviceEndpoint> {
        let username = self.username.ok_or_else(|| Error::InvalidConfig {
            message: "Username is required".to_string(),
        })?;

        if self.host.is_empty() {
            return Err(Error::InvalidConfig {
                message: "Host must not be empty".to_string(),
            });
        }

        if self.max_pool_size == 0 {
            return Err(Error::InvalidConfig {
                message: "max_pool_size must be at least 1".to_string(),
            });
        }

        if let HostKeyVerification::Pinned(ref pin) = self.host_key {
            ssh_key::Fingerprint::from_str(pin)
                .map_err(|e| Error::InvalidKey(format!("host key pin '{pin}': {e}")))?;
        }

        Ok(DeviceEndpoint {
            host: self.host,
            port: self.port,
            username,
            auth: self.auth,
            host_key: self.host_key,
            known_hosts_path: self.known_hosts_path,
            connect_timeout: self.connect_timeout,
            max_pool_size: self.max_pool_size,
            terminal_width: self.terminal_width,
            terminal_height: self.terminal_height,
        })
    }
}
